//! # Profile and User Handlers

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{CurrentUser, UserHeader};
use crate::error::ApiError;
use crate::forms::{NewUserForm, ProfileForm};
use crate::handlers::types::{FormOutcome, Notice, UserView};
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserView>,
}

/// The caller's profile
#[utoipa::path(
    get,
    path = "/profile/",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 200, description = "Profile of the acting user", body = UserView)
    ),
    tag = "users"
)]
pub async fn profile(CurrentUser(user): CurrentUser) -> Json<UserView> {
    Json(UserView::from(&user))
}

/// Update the caller's profile
#[utoipa::path(
    post,
    path = "/profile/",
    security(("bearer_auth" = [])),
    params(UserHeader),
    request_body = ProfileForm,
    responses(
        (status = 302, description = "Profile updated", body = Notice),
        (status = 200, description = "Form errors", body = crate::handlers::types::InvalidFormResponse)
    ),
    tag = "users"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<ProfileForm>, JsonRejection>,
) -> Result<FormOutcome, ApiError> {
    let Json(form) = payload?;
    let now = Utc::now();
    match state.users().update_profile(&user, form, now).await {
        Ok(updated) => Ok(FormOutcome::redirect(
            "/profile/",
            Notice::success("Profile updated.", Some(updated.id)),
        )),
        Err(err) => FormOutcome::recover(err),
    }
}

/// All users ordered by username
#[utoipa::path(
    get,
    path = "/users/",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 200, description = "Users", body = UserListResponse),
        (status = 403, description = "Caller is not privileged", body = ApiError)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = state.users().list_users(&user).await?;
    Ok(Json(UserListResponse {
        users: users.iter().map(UserView::from).collect(),
    }))
}

/// Register a user
#[utoipa::path(
    post,
    path = "/users/",
    security(("bearer_auth" = [])),
    params(UserHeader),
    request_body = NewUserForm,
    responses(
        (status = 302, description = "User created; redirects to the user list", body = Notice),
        (status = 200, description = "Form errors", body = crate::handlers::types::InvalidFormResponse),
        (status = 403, description = "Caller is not privileged", body = ApiError)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<NewUserForm>, JsonRejection>,
) -> Result<FormOutcome, ApiError> {
    let Json(form) = payload?;
    let now = Utc::now();
    match state.users().create_user(&user, form, now).await {
        Ok(created) => Ok(FormOutcome::redirect(
            "/users/",
            Notice::success("User created.", Some(created.id)),
        )),
        Err(err) => FormOutcome::recover(err),
    }
}

/// Delete a user
///
/// Their tasks and created events are kept without an owner; their
/// invitations and meeting participations are removed.
#[utoipa::path(
    post,
    path = "/users/{id}/delete/",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User identifier"), UserHeader),
    responses(
        (status = 302, description = "User deleted; redirects to the user list", body = Notice),
        (status = 403, description = "Caller is not privileged or is deleting themselves", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<FormOutcome, ApiError> {
    state.users().delete_user(&user, id).await?;
    Ok(FormOutcome::redirect(
        "/users/",
        Notice::success("User deleted.", Some(id)),
    ))
}
