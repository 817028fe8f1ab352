//! Client and contract registry handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::client::{
    CreateClientInput, CreateContractInput, UpdateClientInput,
};
use crate::services::ClientService;
use crate::AppState;
use shared::models::{Action, Client, Contract, Resource};

/// Query flags for client listings
#[derive(Debug, Default, Deserialize)]
pub struct ClientListQuery {
    pub include_archived: Option<bool>,
}

/// Register a client company
pub async fn create_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateClientInput>,
) -> AppResult<Json<Client>> {
    if !user.has_permission(Resource::Client, Action::Create) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = ClientService::new(state.db);
    let client = service.create_client(user.user_id, input).await?;
    Ok(Json(client))
}

/// List clients
pub async fn list_clients(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ClientListQuery>,
) -> AppResult<Json<Vec<Client>>> {
    if !user.has_permission(Resource::Client, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = ClientService::new(state.db);
    let clients = service
        .list_clients(query.include_archived.unwrap_or(false))
        .await?;
    Ok(Json(clients))
}

/// Get a client by ID
pub async fn get_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Client>> {
    if !user.has_permission(Resource::Client, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = ClientService::new(state.db);
    let client = service.get_client(client_id).await?;
    Ok(Json(client))
}

/// Update a client
pub async fn update_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(client_id): Path<Uuid>,
    Json(input): Json<UpdateClientInput>,
) -> AppResult<Json<Client>> {
    if !user.has_permission(Resource::Client, Action::Edit) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = ClientService::new(state.db);
    let client = service.update_client(user.user_id, client_id, input).await?;
    Ok(Json(client))
}

/// Archive a client
pub async fn archive_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Client>> {
    if !user.has_permission(Resource::Client, Action::Archive) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = ClientService::new(state.db);
    let client = service.archive_client(user.user_id, client_id).await?;
    Ok(Json(client))
}

/// Create a contract under a client
pub async fn create_contract(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(client_id): Path<Uuid>,
    Json(input): Json<CreateContractInput>,
) -> AppResult<Json<Contract>> {
    if !user.has_permission(Resource::Contract, Action::Create) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = ClientService::new(state.db);
    let contract = service.create_contract(user.user_id, client_id, input).await?;
    Ok(Json(contract))
}

/// List a client's contracts
pub async fn list_contracts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Vec<Contract>>> {
    if !user.has_permission(Resource::Contract, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = ClientService::new(state.db);
    let contracts = service.list_contracts(client_id).await?;
    Ok(Json(contracts))
}
