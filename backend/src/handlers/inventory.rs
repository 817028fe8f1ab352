//! Inventory ledger handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::inventory::{RecordReceiptInput, StockReconciliation};
use crate::services::InventoryService;
use crate::AppState;
use shared::models::{Action, InventoryMovement, Product, Resource};

/// Record a manual goods receipt (IN posting)
pub async fn record_receipt(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<RecordReceiptInput>,
) -> AppResult<Json<InventoryMovement>> {
    if !user.has_permission(Resource::Inventory, Action::Create) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = InventoryService::new(state.db);
    let movement = service.record_receipt(user.user_id, input).await?;
    Ok(Json(movement))
}

/// List all movements
pub async fn list_movements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<InventoryMovement>>> {
    if !user.has_permission(Resource::Inventory, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = InventoryService::new(state.db);
    let movements = service.list_movements().await?;
    Ok(Json(movements))
}

/// List movements for a product in ledger order
pub async fn get_product_movements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryMovement>>> {
    if !user.has_permission(Resource::Inventory, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = InventoryService::new(state.db);
    let movements = service.movements_for_product(product_id).await?;
    Ok(Json(movements))
}

/// Replay a product's ledger against its cached stock
pub async fn reconcile_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<StockReconciliation>> {
    if !user.has_permission(Resource::Inventory, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = InventoryService::new(state.db);
    let report = service.reconcile(product_id).await?;
    Ok(Json(report))
}

/// Products below their restocking threshold
pub async fn low_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Product>>> {
    if !user.has_permission(Resource::Inventory, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = InventoryService::new(state.db);
    let products = service.low_stock().await?;
    Ok(Json(products))
}
