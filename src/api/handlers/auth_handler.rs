//! Authentication handlers.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::filters::CurrentUser;
use crate::api::AppState;
use crate::config::{MAX_USER_NAME_LENGTH, MIN_PASSWORD_LENGTH};
use crate::domain::{Credentials, IssuedToken, UserResponse};
use crate::errors::AppResult;

/// User registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        required(message = "User name is required"),
        length(min = 1, max = MAX_USER_NAME_LENGTH, message = "User name must be 1-64 characters")
    )]
    pub user_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(
        required(message = "Password is required"),
        length(min = MIN_PASSWORD_LENGTH, message = "Password must be at least 3 characters")
    )]
    pub password: Option<String>,
}

/// User login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(required(message = "User name is required"))]
    pub user_name: Option<String>,
    #[validate(required(message = "Password is required"))]
    pub password: Option<String>,
}

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .user_service
        .register(
            payload.user_name.unwrap_or_default(),
            payload.email,
            payload.password.unwrap_or_default(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<IssuedToken>> {
    let token = state
        .token_service
        .authenticate(Credentials {
            user_name: payload.user_name.unwrap_or_default(),
            password: payload.password.unwrap_or_default(),
        })
        .await?;

    Ok(Json(token))
}

/// Revoke the token this request was authenticated with
pub async fn logout(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> StatusCode {
    state.token_service.logout(&current_user.token);
    StatusCode::NO_CONTENT
}
