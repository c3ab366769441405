use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::store::StorePath;

pub fn users_path() -> StorePath {
    StorePath::root().child("users").unwrap_or_default()
}

/// User as stored under `users/<id>`.
///
/// Older records carry a plaintext `password`; newer ones only an argon2
/// `passwordHash`. Login upgrades the former to the latter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub profile_picture: String,
    #[serde(default)]
    pub created_at: i64,
}

impl UserRecord {
    pub fn username_matches(&self, candidate: &str) -> bool {
        self.username.to_lowercase() == candidate.to_lowercase()
    }

    pub fn email_matches(&self, candidate: &str) -> bool {
        !self.email.is_empty() && self.email.to_lowercase() == candidate.to_lowercase()
    }
}

/// Decode the whole `users` collection; unreadable entries are skipped.
pub fn decode_users(snapshot: Option<&Value>) -> BTreeMap<String, UserRecord> {
    let Some(entries) = snapshot.and_then(Value::as_object) else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|(id, raw)| match serde_json::from_value::<UserRecord>(raw.clone()) {
            Ok(user) => Some((id.clone(), user)),
            Err(e) => {
                warn!("skipping malformed user {}: {}", id, e);
                None
            }
        })
        .collect()
}

/// What the profile page shows. Never includes credentials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub profile_picture: Option<String>,
}

impl Profile {
    pub fn from_record(id: &str, record: &UserRecord) -> Self {
        Self {
            id: id.to_string(),
            username: record.username.clone(),
            email: record.email.clone(),
            profile_picture: if record.profile_picture.is_empty() {
                None
            } else {
                Some(record.profile_picture.clone())
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsernameRequest {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_records_decode() {
        let users = decode_users(Some(&json!({
            "u1": {"username": "Lujain", "email": "l@example.com", "password": "123456"},
            "u2": {"username": "sam", "passwordHash": "$argon2id$..."}
        })));
        assert_eq!(users["u1"].password.as_deref(), Some("123456"));
        assert_eq!(users["u2"].email, "");
        assert!(users["u2"].password.is_none());
    }

    #[test]
    fn matching_is_case_insensitive_and_ignores_blank_email() {
        let user = UserRecord {
            username: "Lujain".to_string(),
            email: String::new(),
            ..Default::default()
        };
        assert!(user.username_matches("lujain"));
        assert!(!user.email_matches(""));
    }

    #[test]
    fn serialized_record_omits_missing_credentials() {
        let record = UserRecord {
            username: "sam".to_string(),
            password_hash: Some("hash".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["passwordHash"], "hash");
        assert!(value.get("password").is_none());
        assert_eq!(value["profilePicture"], "");
    }
}
