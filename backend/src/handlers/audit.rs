//! Audit log handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::AuditService;
use crate::AppState;
use shared::models::{Action, AuditLog, Resource};

/// Query parameters for the audit listing
#[derive(Debug, Default, Deserialize)]
pub struct AuditListQuery {
    pub limit: Option<i64>,
}

/// List recent audit entries
pub async fn list_audit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AuditListQuery>,
) -> AppResult<Json<Vec<AuditLog>>> {
    if !user.has_permission(Resource::Audit, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = AuditService::new(state.db);
    let entries = service.list(query.limit.unwrap_or(100)).await?;
    Ok(Json(entries))
}

/// Audit trail for one entity
pub async fn entity_audit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((entity_type, entity_id)): Path<(String, Uuid)>,
) -> AppResult<Json<Vec<AuditLog>>> {
    if !user.has_permission(Resource::Audit, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = AuditService::new(state.db);
    let entries = service.list_for_entity(&entity_type, entity_id).await?;
    Ok(Json(entries))
}
