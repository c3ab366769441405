pub mod controller;
pub mod render;
pub mod view;

pub use controller::{Confirm, ListController, RenameOutcome};
pub use render::render_rows;
pub use view::{ItemRow, ListView, RowBuffer, ViewRow};
