use std::sync::Arc;

use goalboard::auth::{AuthService, CURRENT_USER_KEY, USERNAME_KEY, verify_password};
use goalboard::cache::{LocalCache, SqliteCache};
use goalboard::error::AppError;
use goalboard::models::{PasswordChangeRequest, SignupRequest};
use goalboard::profile::ProfileService;
use goalboard::store::{MemoryStore, RemoteStore, StorePath};
use serde_json::json;

struct Setup {
    store: Arc<MemoryStore>,
    cache: Arc<SqliteCache>,
    auth: Arc<AuthService>,
}

async fn setup(store: MemoryStore) -> Setup {
    let store = Arc::new(store);
    let cache = Arc::new(
        SqliteCache::connect("sqlite::memory:")
            .await
            .expect("Failed to create cache"),
    );
    let auth = Arc::new(AuthService::new(
        store.clone() as Arc<dyn RemoteStore>,
        cache.clone() as Arc<dyn LocalCache>,
    ));
    Setup { store, cache, auth }
}

fn signup_request(username: &str, email: &str, password: &str) -> SignupRequest {
    SignupRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        confirm_password: password.to_string(),
    }
}

#[tokio::test]
async fn test_signup_then_login_by_username_or_email() {
    let s = setup(MemoryStore::new()).await;

    let session = s
        .auth
        .signup(&signup_request("Alice", "alice@example.com", "correct horse"))
        .await
        .expect("signup failed");
    assert_eq!(session.username, "Alice");
    assert_eq!(
        s.cache.get(CURRENT_USER_KEY).await.unwrap(),
        Some(session.user_id.clone())
    );

    let path = StorePath::parse(&format!("users/{}", session.user_id)).unwrap();
    let stored = s.store.read(&path).await.unwrap().expect("user not stored");
    assert!(stored.get("password").is_none());
    let hash = stored["passwordHash"].as_str().unwrap();
    assert!(verify_password("correct horse", hash));

    assert!(s.auth.logout(|_: &str| true).await.unwrap());
    assert_eq!(s.auth.current_session().await.unwrap(), None);

    let by_name = s.auth.login("ALICE", "correct horse").await.unwrap();
    assert_eq!(by_name.user_id, session.user_id);
    let by_email = s.auth.login("Alice@Example.com", "correct horse").await.unwrap();
    assert_eq!(by_email.user_id, session.user_id);

    let err = s.auth.login("alice", "Correct Horse").await.unwrap_err();
    assert_eq!(err.user_message(), "Invalid username/email or password");
}

#[tokio::test]
async fn test_login_without_users() {
    let s = setup(MemoryStore::new()).await;

    let err = s.auth.login("bob", "whatever1").await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    assert_eq!(err.user_message(), "No users found. Please sign up first.");

    let err = s.auth.login("", "whatever1").await.unwrap_err();
    assert_eq!(err.user_message(), "Please fill in all fields");
}

#[tokio::test]
async fn test_login_read_failure() {
    let store = MemoryStore::new();
    store.set_offline(true);
    let s = setup(store).await;

    let err = s.auth.login("bob", "whatever1").await.unwrap_err();
    assert_eq!(err.user_message(), "Login failed due to a database error.");
}

#[tokio::test]
async fn test_signup_rejects_duplicates_ignoring_case() {
    let s = setup(MemoryStore::new()).await;
    s.auth
        .signup(&signup_request("Alice", "alice@example.com", "password1"))
        .await
        .unwrap();

    let err = s
        .auth
        .signup(&signup_request("alice", "other@example.com", "password1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(err.user_message(), "Username already exists");

    let err = s
        .auth
        .signup(&signup_request("Carol", "ALICE@example.com", "password1"))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Email already registered");

    // a blank email never collides
    s.auth.signup(&signup_request("Dan", "", "password1")).await.unwrap();
    s.auth.signup(&signup_request("Eve", "", "password1")).await.unwrap();
}

#[tokio::test]
async fn test_signup_password_policy() {
    let s = setup(MemoryStore::new()).await;

    let err = s.auth.signup(&signup_request("Al", "", "short")).await.unwrap_err();
    assert_eq!(err.user_message(), "Password must be at least 8 characters");

    let mut req = signup_request("Al", "", "password1");
    req.confirm_password = "password2".to_string();
    let err = s.auth.signup(&req).await.unwrap_err();
    assert_eq!(err.user_message(), "Passwords do not match");

    let err = s.auth.signup(&signup_request("  ", "", "password1")).await.unwrap_err();
    assert_eq!(err.user_message(), "Please fill in all required fields");
}

#[tokio::test]
async fn test_legacy_password_is_upgraded_on_login() {
    let store = MemoryStore::with_data(json!({
        "users": {
            "u1": { "username": "bob", "email": "bob@example.com", "password": "hunter22", "createdAt": 1 }
        }
    }));
    let s = setup(store).await;

    let session = s.auth.login("bob@example.com", "hunter22").await.unwrap();
    assert_eq!(session.user_id, "u1");

    let stored = s
        .store
        .read(&StorePath::parse("users/u1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(stored.get("password").is_none());
    assert!(verify_password("hunter22", stored["passwordHash"].as_str().unwrap()));

    // still works against the new hash
    s.auth.login("bob", "hunter22").await.unwrap();
}

#[tokio::test]
async fn test_logout_declined_keeps_session() {
    let s = setup(MemoryStore::new()).await;
    s.auth
        .signup(&signup_request("Alice", "", "password1"))
        .await
        .unwrap();

    assert!(!s.auth.logout(|_: &str| false).await.unwrap());
    assert!(s.auth.current_session().await.unwrap().is_some());
    assert!(s.auth.logout(|_: &str| true).await.unwrap());
    assert_eq!(s.cache.get(USERNAME_KEY).await.unwrap(), None);

    let err = s.auth.require_session().await.unwrap_err();
    assert_eq!(err.user_message(), "Please log in first");
}

#[tokio::test]
async fn test_profile_edits() {
    let s = setup(MemoryStore::new()).await;
    let profiles = ProfileService::new(s.store.clone() as Arc<dyn RemoteStore>, s.auth.clone());
    s.auth
        .signup(&signup_request("Bob", "bob@example.com", "password1"))
        .await
        .unwrap();
    let alice = s
        .auth
        .signup(&signup_request("Alice", "alice@example.com", "password1"))
        .await
        .unwrap();

    let err = profiles.change_username(&alice, "BOB").await.unwrap_err();
    assert_eq!(err.user_message(), "Username already taken");
    // changing only the case of your own name is allowed
    profiles.change_username(&alice, "ALICE").await.unwrap();
    assert_eq!(
        s.cache.get(USERNAME_KEY).await.unwrap().as_deref(),
        Some("ALICE")
    );

    let err = profiles.change_email(&alice, "Bob@example.com").await.unwrap_err();
    assert_eq!(err.user_message(), "Email already registered");
    profiles.change_email(&alice, "a@example.com").await.unwrap();

    let profile = profiles.load(&alice).await.unwrap();
    assert_eq!(profile.username, "ALICE");
    assert_eq!(profile.email, "a@example.com");
    assert_eq!(profile.profile_picture, None);

    let err = profiles
        .change_password(
            &alice,
            &PasswordChangeRequest {
                current_password: "wrong-one".to_string(),
                new_password: "password2".to_string(),
                confirm_password: "password2".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Current password is incorrect");

    profiles
        .change_password(
            &alice,
            &PasswordChangeRequest {
                current_password: "password1".to_string(),
                new_password: "password2".to_string(),
                confirm_password: "password2".to_string(),
            },
        )
        .await
        .unwrap();
    assert!(s.auth.login("alice", "password1").await.is_err());
    s.auth.login("alice", "password2").await.unwrap();
}

#[tokio::test]
async fn test_profile_picture() {
    let s = setup(MemoryStore::new()).await;
    let profiles = ProfileService::new(s.store.clone() as Arc<dyn RemoteStore>, s.auth.clone());
    let session = s
        .auth
        .signup(&signup_request("Alice", "", "password1"))
        .await
        .unwrap();

    let err = profiles.upload_picture(&session, b"", "image/png").await.unwrap_err();
    assert_eq!(err.user_message(), "Please select an image first");
    let err = profiles
        .upload_picture(&session, b"text", "text/plain")
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Please select an image file");
    let too_big = vec![0u8; 5 * 1024 * 1024 + 1];
    let err = profiles
        .upload_picture(&session, &too_big, "image/png")
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "File size must be less than 5MB");

    let url = profiles
        .upload_picture(&session, b"abc", "image/png")
        .await
        .unwrap();
    assert_eq!(url, "data:image/png;base64,YWJj");
    assert_eq!(profiles.load(&session).await.unwrap().profile_picture, Some(url));

    assert!(!profiles.remove_picture(&session, |_: &str| false).await.unwrap());
    assert!(profiles.remove_picture(&session, |_: &str| true).await.unwrap());
    assert_eq!(profiles.load(&session).await.unwrap().profile_picture, None);
}
