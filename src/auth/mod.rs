pub mod password;
pub mod session;

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::cache::LocalCache;
use crate::error::AppError;
use crate::list::Confirm;
use crate::models::{SignupRequest, UserRecord, decode_users, users_path};
use crate::store::{RemoteStore, StoreError};

pub use password::{check_new_password, hash_password, verify_password, verify_user};
pub use session::{CURRENT_USER_KEY, Session, USERNAME_KEY};

const LOGOUT_PROMPT: &str = "Are you sure you want to logout?";

/// Login, signup and the locally stored session flag.
///
/// There is no server-side session: a user id in the local cache means
/// "logged in" until logout removes it.
pub struct AuthService {
    store: Arc<dyn RemoteStore>,
    cache: Arc<dyn LocalCache>,
}

impl AuthService {
    pub fn new(store: Arc<dyn RemoteStore>, cache: Arc<dyn LocalCache>) -> Self {
        Self { store, cache }
    }

    /// `identifier` is a username or an email, compared ignoring case.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<Session, AppError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(AppError::Validation("Please fill in all fields".to_string()));
        }

        let snapshot = self
            .store
            .read(&users_path())
            .await
            .map_err(|e| AppError::remote("Login failed due to a database error.", e))?;
        let Some(snapshot) = snapshot else {
            warn!("login attempted with no users in the store");
            return Err(AppError::Unauthorized(
                "No users found. Please sign up first.".to_string(),
            ));
        };

        let users = decode_users(Some(&snapshot));
        let matched = users.iter().find(|(_, user)| {
            (user.username_matches(identifier) || user.email_matches(identifier))
                && verify_user(user, password)
        });
        let Some((user_id, user)) = matched else {
            warn!("login failed: no matching user");
            return Err(AppError::Unauthorized(
                "Invalid username/email or password".to_string(),
            ));
        };

        if user.password_hash.is_none() {
            self.upgrade_legacy_password(user_id, password).await;
        }

        let session = Session {
            user_id: user_id.clone(),
            username: user.username.clone(),
        };
        self.store_session(&session).await?;
        info!("user {} logged in", session.user_id);
        Ok(session)
    }

    pub async fn signup(&self, req: &SignupRequest) -> Result<Session, AppError> {
        let username = req.username.trim();
        let email = req.email.trim();
        if username.is_empty() || req.password.is_empty() || req.confirm_password.is_empty() {
            return Err(AppError::Validation(
                "Please fill in all required fields".to_string(),
            ));
        }
        check_new_password(&req.password, &req.confirm_password)?;

        let snapshot = self
            .store
            .read(&users_path())
            .await
            .map_err(|e| AppError::remote("Signup failed. Please try again.", e))?;
        for user in decode_users(snapshot.as_ref()).values() {
            if user.username_matches(username) {
                return Err(AppError::Conflict("Username already exists".to_string()));
            }
            if !email.is_empty() && user.email_matches(email) {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }

        let path = self.store.create_child_path(&users_path())?;
        let record = UserRecord {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: Some(hash_password(&req.password)?),
            password: None,
            profile_picture: String::new(),
            created_at: Utc::now().timestamp_millis(),
        };
        let value = serde_json::to_value(&record).map_err(StoreError::from)?;
        self.store
            .write(&path, value)
            .await
            .map_err(|e| AppError::remote("Signup failed. Please try again.", e))?;

        let session = Session {
            user_id: path.key().unwrap_or_default().to_string(),
            username: record.username,
        };
        self.store_session(&session).await?;
        info!("user {} signed up", session.user_id);
        Ok(session)
    }

    pub async fn current_session(&self) -> Result<Option<Session>, AppError> {
        let Some(user_id) = self.cache.get(CURRENT_USER_KEY).await? else {
            return Ok(None);
        };
        let username = self.cache.get(USERNAME_KEY).await?.unwrap_or_default();
        Ok(Some(Session { user_id, username }))
    }

    pub async fn require_session(&self) -> Result<Session, AppError> {
        self.current_session()
            .await?
            .ok_or_else(|| AppError::Unauthorized("Please log in first".to_string()))
    }

    /// Returns whether the session was cleared; a declined prompt keeps it.
    pub async fn logout(&self, confirm: impl Confirm) -> Result<bool, AppError> {
        if !confirm.confirm(LOGOUT_PROMPT) {
            return Ok(false);
        }
        self.cache.delete(CURRENT_USER_KEY).await?;
        self.cache.delete(USERNAME_KEY).await?;
        info!("logged out");
        Ok(true)
    }

    pub(crate) async fn remember_username(&self, username: &str) -> Result<(), AppError> {
        self.cache.set(USERNAME_KEY, username).await
    }

    async fn store_session(&self, session: &Session) -> Result<(), AppError> {
        self.cache.set(CURRENT_USER_KEY, &session.user_id).await?;
        self.cache.set(USERNAME_KEY, &session.username).await
    }

    /// Replace a plaintext credential with its hash. Best-effort: the login
    /// that triggered it succeeds either way.
    async fn upgrade_legacy_password(&self, user_id: &str, password: &str) {
        let result = async {
            let hash = hash_password(password)?;
            let user = users_path().child(user_id)?;
            self.store.write(&user.child("passwordHash")?, json!(hash)).await?;
            self.store.delete(&user.child("password")?).await?;
            Ok::<_, AppError>(())
        }
        .await;
        match result {
            Ok(()) => info!("upgraded stored password of user {}", user_id),
            Err(e) => warn!("could not upgrade stored password of user {}: {}", user_id, e),
        }
    }
}
