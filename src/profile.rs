use std::collections::BTreeMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tracing::info;

use crate::auth::{AuthService, Session, check_new_password, hash_password, verify_user};
use crate::error::AppError;
use crate::list::Confirm;
use crate::models::{PasswordChangeRequest, Profile, UserRecord, decode_users, users_path};
use crate::store::{RemoteStore, StoreError, StorePath};

/// Largest accepted profile picture, in bytes.
pub const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024;

const REMOVE_PICTURE_PROMPT: &str = "Are you sure you want to remove your profile picture?";

pub struct ProfileService {
    store: Arc<dyn RemoteStore>,
    auth: Arc<AuthService>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn RemoteStore>, auth: Arc<AuthService>) -> Self {
        Self { store, auth }
    }

    pub async fn load(&self, session: &Session) -> Result<Profile, AppError> {
        let record = self.read_user(session).await?;
        Ok(Profile::from_record(&session.user_id, &record))
    }

    pub async fn change_username(&self, session: &Session, input: &str) -> Result<String, AppError> {
        let username = input.trim();
        if username.is_empty() {
            return Err(AppError::Validation("Please enter a new username".to_string()));
        }

        let failed = "Failed to update username. Please try again.";
        let users = self.read_all(failed).await?;
        let taken = users
            .iter()
            .any(|(id, user)| id != &session.user_id && user.username_matches(username));
        if taken {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        self.write_field(session, "username", json!(username), failed).await?;
        self.auth.remember_username(username).await?;
        info!("user {} changed username", session.user_id);
        Ok(username.to_string())
    }

    pub async fn change_email(&self, session: &Session, input: &str) -> Result<String, AppError> {
        let email = input.trim();
        if email.is_empty() {
            return Err(AppError::Validation("Please enter a new email".to_string()));
        }

        let failed = "Failed to update email. Please try again.";
        let users = self.read_all(failed).await?;
        let taken = users
            .iter()
            .any(|(id, user)| id != &session.user_id && user.email_matches(email));
        if taken {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        self.write_field(session, "email", json!(email), failed).await?;
        info!("user {} changed email", session.user_id);
        Ok(email.to_string())
    }

    pub async fn change_password(
        &self,
        session: &Session,
        req: &PasswordChangeRequest,
    ) -> Result<(), AppError> {
        if req.current_password.is_empty()
            || req.new_password.is_empty()
            || req.confirm_password.is_empty()
        {
            return Err(AppError::Validation("Please fill all password fields".to_string()));
        }
        check_new_password(&req.new_password, &req.confirm_password)?;

        let record = self.read_user(session).await?;
        if !verify_user(&record, &req.current_password) {
            return Err(AppError::Unauthorized("Current password is incorrect".to_string()));
        }

        let failed = "Failed to update password. Please try again.";
        let hash = hash_password(&req.new_password)?;
        self.write_field(session, "passwordHash", json!(hash), failed).await?;
        if record.password.is_some() {
            let legacy = self.user_path(session)?.child("password")?;
            self.store
                .delete(&legacy)
                .await
                .map_err(|e| AppError::remote(failed, e))?;
        }
        info!("user {} changed password", session.user_id);
        Ok(())
    }

    /// Store the image as a data URL on the user record.
    pub async fn upload_picture(
        &self,
        session: &Session,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, AppError> {
        if bytes.is_empty() {
            return Err(AppError::Validation("Please select an image first".to_string()));
        }
        if !content_type.starts_with("image/") {
            return Err(AppError::Validation("Please select an image file".to_string()));
        }
        if bytes.len() > MAX_PICTURE_BYTES {
            return Err(AppError::Validation("File size must be less than 5MB".to_string()));
        }

        let data_url = to_data_url(content_type, bytes);
        let failed = "Failed to upload picture. Please try again.";
        self.write_field(session, "profilePicture", json!(data_url), failed)
            .await?;
        info!("user {} uploaded a profile picture", session.user_id);
        Ok(data_url)
    }

    pub async fn remove_picture(
        &self,
        session: &Session,
        confirm: impl Confirm,
    ) -> Result<bool, AppError> {
        if !confirm.confirm(REMOVE_PICTURE_PROMPT) {
            return Ok(false);
        }
        let failed = "Failed to remove picture. Please try again.";
        self.write_field(session, "profilePicture", json!(""), failed)
            .await?;
        Ok(true)
    }

    async fn read_user(&self, session: &Session) -> Result<UserRecord, AppError> {
        let path = self.user_path(session)?;
        let value = self
            .store
            .read(&path)
            .await
            .map_err(|e| AppError::remote("Failed to load profile.", e))?
            .ok_or(AppError::NotFound)?;
        Ok(serde_json::from_value(value).map_err(StoreError::from)?)
    }

    async fn read_all(
        &self,
        failed: &str,
    ) -> Result<BTreeMap<String, UserRecord>, AppError> {
        let snapshot = self
            .store
            .read(&users_path())
            .await
            .map_err(|e| AppError::remote(failed, e))?;
        Ok(decode_users(snapshot.as_ref()))
    }

    async fn write_field(
        &self,
        session: &Session,
        field: &str,
        value: Value,
        failed: &str,
    ) -> Result<(), AppError> {
        let path = self.user_path(session)?.child(field)?;
        self.store
            .write(&path, value)
            .await
            .map_err(|e| AppError::remote(failed, e))
    }

    fn user_path(&self, session: &Session) -> Result<StorePath, AppError> {
        Ok(users_path().child(&session.user_id)?)
    }
}

pub fn to_data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_embeds_mime_and_base64() {
        assert_eq!(to_data_url("image/png", b"abc"), "data:image/png;base64,YWJj");
    }
}
