pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod list;
pub mod models;
pub mod profile;
pub mod state;
pub mod store;
