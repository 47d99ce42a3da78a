//! # Authentication
//!
//! Requests reach the service through a trusted gateway that presents an
//! operator bearer token and names the acting user in `X-User-Id`. The
//! middleware verifies both and stores the loaded user for handlers.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, unauthorized};
use crate::models::user::Model as UserModel;
use crate::repositories::UserRepository;
use crate::server::AppState;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// The authenticated, active user making the request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserModel);

/// Authentication middleware that validates the bearer token and resolves the
/// acting user.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = {
        let headers = request.headers();
        let token = extract_bearer_token(headers)?;
        validate_token(&state.config, token)?;
        extract_user_id(headers)?
    };

    let user = UserRepository::new(&state.db)
        .find_active(user_id)
        .await?
        .ok_or_else(|| {
            tracing::info!(user_id = %user_id, "Unknown or inactive user");
            unauthorized(Some("Unknown or inactive user"))
        })?;

    tracing::debug!(user_id = %user.id, username = %user.username, "Authenticated request");
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

fn validate_token(config: &AppConfig, token: &str) -> Result<(), ApiError> {
    let is_valid = config
        .operator_tokens
        .iter()
        .any(|configured| ConstantTimeEq::ct_eq(token.as_bytes(), configured.as_bytes()).into());

    if is_valid {
        Ok(())
    } else {
        Err(unauthorized(Some("Invalid bearer token")))
    }
}

fn extract_user_id(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| unauthorized(Some("Missing X-User-Id header")))?
        .to_str()
        .ok()
        .and_then(|value| value.trim().parse::<Uuid>().ok())
        .ok_or_else(|| unauthorized(Some("X-User-Id must be a valid UUID")))
}

/// OpenAPI header parameter for X-User-Id
#[derive(Debug, Serialize, Deserialize, IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Header)]
pub struct UserHeader {
    /// Identifier of the acting user, asserted by the gateway
    #[serde(rename = "X-User-Id")]
    #[param(rename = "X-User-Id", value_type = String)]
    pub user_id: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("Authentication required")))
    }
}
