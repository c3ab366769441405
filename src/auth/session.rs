//! Session flag kept in the local cache.

use serde::Serialize;

/// Cache key holding the logged-in user's id.
pub const CURRENT_USER_KEY: &str = "currentUser";
/// Cache key holding the logged-in user's display name.
pub const USERNAME_KEY: &str = "username";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: String,
    pub username: String,
}
