//! Authentication handlers

use axum::{extract::State, Json};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::auth::{AuthTokens, CreateUserInput, LoginInput, RefreshInput};
use crate::services::AuthService;
use crate::AppState;
use shared::models::{Action, Resource, User};

/// Log in with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<AuthTokens>> {
    let service = AuthService::new(state.db, &state.config);
    let tokens = service.login(input).await?;
    Ok(Json(tokens))
}

/// Exchange a refresh token for a new token pair
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshInput>,
) -> AppResult<Json<AuthTokens>> {
    let service = AuthService::new(state.db, &state.config);
    let tokens = service.refresh(input).await?;
    Ok(Json(tokens))
}

/// Create the first admin account on an empty installation
pub async fn bootstrap(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> AppResult<Json<User>> {
    let service = AuthService::new(state.db, &state.config);
    let user = service.bootstrap_admin(input).await?;
    Ok(Json(user))
}

/// Current user's account record
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<User>> {
    let service = AuthService::new(state.db, &state.config);
    let record = service.me(user.user_id).await?;
    Ok(Json(record))
}

/// Create a staff account
pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<Json<User>> {
    if !user.has_permission(Resource::User, Action::Create) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = AuthService::new(state.db, &state.config);
    let record = service.create_user(input).await?;
    Ok(Json(record))
}

/// List staff accounts
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    if !user.has_permission(Resource::User, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = AuthService::new(state.db, &state.config);
    let users = service.list_users().await?;
    Ok(Json(users))
}
