use axum::Json;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query};
use axum::http::{HeaderMap, header};
use axum::routing::{delete, patch, post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::error::AppError;
use crate::list::{RenameOutcome, ViewRow};
use crate::models::*;
use crate::profile::MAX_PICTURE_BYTES;
use crate::state::AppState;

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

/// Stands in for the browser's confirm dialog.
#[derive(Deserialize)]
struct ConfirmParams {
    #[serde(default)]
    confirm: bool,
}

#[derive(Serialize)]
struct Created {
    id: String,
}

#[derive(Serialize)]
struct StatusChanged {
    status: ItemStatus,
    icon: &'static str,
}

#[derive(Serialize)]
struct NoteVisibility {
    visible: bool,
}

#[derive(Serialize)]
struct Applied {
    applied: bool,
}

#[derive(Serialize)]
struct Picture {
    profile_picture: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session))
        .route("/profile", get(profile))
        .route("/profile/username", put(change_username))
        .route("/profile/email", put(change_email))
        .route("/profile/password", put(change_password))
        .route(
            "/profile/picture",
            put(upload_picture).delete(remove_picture),
        )
        .route("/lists/{collection}", get(list_items).post(create_item))
        .route("/lists/{collection}/{id}", delete(delete_item))
        .route("/lists/{collection}/{id}/name", patch(rename_item))
        .route("/lists/{collection}/{id}/toggle", post(toggle_item))
        .route("/lists/{collection}/{id}/note", put(save_note))
        .route(
            "/lists/{collection}/{id}/note/visibility",
            post(toggle_note_visibility),
        )
        .layer(DefaultBodyLimit::max(MAX_PICTURE_BYTES * 2))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.cache.get(Collection::Goals.key()).await?;
    Ok(StatusCode::OK)
}

async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<Session>), AppError> {
    let session = state.auth.signup(&req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Session>, AppError> {
    let session = state.auth.login(&req.identifier, &req.password).await?;
    Ok(Json(session))
}

async fn logout(
    State(state): State<AppState>,
    Query(params): Query<ConfirmParams>,
) -> Result<Json<Applied>, AppError> {
    let applied = state.auth.logout(|_: &str| params.confirm).await?;
    Ok(Json(Applied { applied }))
}

async fn session(State(state): State<AppState>) -> Result<Json<Session>, AppError> {
    Ok(Json(state.auth.require_session().await?))
}

async fn profile(State(state): State<AppState>) -> Result<Json<Profile>, AppError> {
    let session = state.auth.require_session().await?;
    Ok(Json(state.profile.load(&session).await?))
}

async fn change_username(
    State(state): State<AppState>,
    Json(req): Json<UsernameRequest>,
) -> Result<Json<Profile>, AppError> {
    let session = state.auth.require_session().await?;
    state.profile.change_username(&session, &req.username).await?;
    Ok(Json(state.profile.load(&session).await?))
}

async fn change_email(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<Profile>, AppError> {
    let session = state.auth.require_session().await?;
    state.profile.change_email(&session, &req.email).await?;
    Ok(Json(state.profile.load(&session).await?))
}

async fn change_password(
    State(state): State<AppState>,
    Json(req): Json<PasswordChangeRequest>,
) -> Result<StatusCode, AppError> {
    let session = state.auth.require_session().await?;
    state.profile.change_password(&session, &req).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_picture(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Picture>, AppError> {
    let session = state.auth.require_session().await?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let profile_picture = state
        .profile
        .upload_picture(&session, &body, content_type)
        .await?;
    Ok(Json(Picture { profile_picture }))
}

async fn remove_picture(
    State(state): State<AppState>,
    Query(params): Query<ConfirmParams>,
) -> Result<Json<Applied>, AppError> {
    let session = state.auth.require_session().await?;
    let applied = state
        .profile
        .remove_picture(&session, |_: &str| params.confirm)
        .await?;
    Ok(Json(Applied { applied }))
}

/// `q` becomes the list's active search, so later snapshots keep rendering
/// filtered until another request replaces it.
async fn list_items(
    State(state): State<AppState>,
    Path(collection): Path<Collection>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ViewRow>>, AppError> {
    state.auth.require_session().await?;
    let list = state.list(collection);
    list.controller.search(&params.q);
    Ok(Json(list.view.rows()))
}

async fn create_item(
    State(state): State<AppState>,
    Path(collection): Path<Collection>,
    Json(req): Json<NewItemRequest>,
) -> Result<(StatusCode, Json<Created>), AppError> {
    state.auth.require_session().await?;
    let id = state.list(collection).controller.create(&req.name).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

async fn rename_item(
    State(state): State<AppState>,
    Path((collection, id)): Path<(Collection, String)>,
    Json(req): Json<RenameItemRequest>,
) -> Result<Json<RenameOutcome>, AppError> {
    state.auth.require_session().await?;
    let outcome = state
        .list(collection)
        .controller
        .rename(&id, &req.name)
        .await?;
    Ok(Json(outcome))
}

async fn toggle_item(
    State(state): State<AppState>,
    Path((collection, id)): Path<(Collection, String)>,
) -> Result<Json<StatusChanged>, AppError> {
    state.auth.require_session().await?;
    let status = state.list(collection).controller.toggle_done(&id).await?;
    Ok(Json(StatusChanged {
        status,
        icon: collection.status_icon(status),
    }))
}

async fn save_note(
    State(state): State<AppState>,
    Path((collection, id)): Path<(Collection, String)>,
    Json(req): Json<NoteRequest>,
) -> Result<StatusCode, AppError> {
    state.auth.require_session().await?;
    state
        .list(collection)
        .controller
        .save_note(&id, &req.note)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_note_visibility(
    State(state): State<AppState>,
    Path((collection, id)): Path<(Collection, String)>,
) -> Result<Json<NoteVisibility>, AppError> {
    state.auth.require_session().await?;
    let visible = state
        .list(collection)
        .controller
        .toggle_note_visibility(&id)?;
    Ok(Json(NoteVisibility { visible }))
}

async fn delete_item(
    State(state): State<AppState>,
    Path((collection, id)): Path<(Collection, String)>,
    Query(params): Query<ConfirmParams>,
) -> Result<Json<Applied>, AppError> {
    state.auth.require_session().await?;
    let applied = state
        .list(collection)
        .controller
        .delete(&id, |_: &str| params.confirm)
        .await?;
    Ok(Json(Applied { applied }))
}
