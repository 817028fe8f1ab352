//! Deal workflow handlers
//!
//! Thin wrappers over the workflow engine. View access is checked here;
//! transition-specific permissions are enforced by the engine's guarded
//! dispatch, so a wrong-role caller gets the same rejection wherever the
//! request comes in.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::deal::{
    AddItemInput, CancelInput, CreateDealInput, DealListQuery, DealWithItems, PricingInput,
    ReasonInput, RecordShipmentInput, StockResponseInput,
};
use crate::services::DealService;
use crate::AppState;
use shared::models::{Action, Deal, DealItem, Resource, Shipment};
use shared::types::PaginatedResponse;

/// Create a deal
pub async fn create_deal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateDealInput>,
) -> AppResult<Json<Deal>> {
    if !user.has_permission(Resource::Deal, Action::Create) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = DealService::new(state.db);
    let deal = service.create_deal(&user, input).await?;
    Ok(Json(deal))
}

/// List deals with optional filters
pub async fn list_deals(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DealListQuery>,
) -> AppResult<Json<PaginatedResponse<Deal>>> {
    if !user.has_permission(Resource::Deal, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = DealService::new(state.db);
    let deals = service.list_deals(query).await?;
    Ok(Json(deals))
}

/// Deals waiting for the caller's role
pub async fn deal_queue(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Deal>>> {
    if !user.has_permission(Resource::Deal, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = DealService::new(state.db);
    let deals = service.list_queue(&user).await?;
    Ok(Json(deals))
}

/// Get a deal with its items
pub async fn get_deal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> AppResult<Json<DealWithItems>> {
    if !user.has_permission(Resource::Deal, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = DealService::new(state.db);
    let deal = service.get_deal(deal_id).await?;
    Ok(Json(deal))
}

/// Add a line item
pub async fn add_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
    Json(input): Json<AddItemInput>,
) -> AppResult<Json<DealItem>> {
    if !user.has_permission(Resource::Deal, Action::Edit) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = DealService::new(state.db);
    let item = service.add_item(&user, deal_id, input).await?;
    Ok(Json(item))
}

/// Remove a line item
pub async fn remove_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((deal_id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<()>> {
    if !user.has_permission(Resource::Deal, Action::Edit) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = DealService::new(state.db);
    service.remove_item(&user, deal_id, item_id).await?;
    Ok(Json(()))
}

/// Manager starts work on a deal
pub async fn start_work(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> AppResult<Json<Deal>> {
    let service = DealService::new(state.db);
    let deal = service.start_work(&user, deal_id).await?;
    Ok(Json(deal))
}

/// Manager sends the deal to the warehouse for a stock check
pub async fn request_stock_check(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> AppResult<Json<Deal>> {
    let service = DealService::new(state.db);
    let deal = service.request_stock_check(&user, deal_id).await?;
    Ok(Json(deal))
}

/// Warehouse replies per item
pub async fn submit_stock_response(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
    Json(input): Json<StockResponseInput>,
) -> AppResult<Json<DealWithItems>> {
    let service = DealService::new(state.db);
    let deal = service.submit_stock_response(&user, deal_id, input).await?;
    Ok(Json(deal))
}

/// Manager prices the confirmed items and sets payment terms
pub async fn set_pricing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
    Json(input): Json<PricingInput>,
) -> AppResult<Json<DealWithItems>> {
    let service = DealService::new(state.db);
    let deal = service.set_pricing(&user, deal_id, input).await?;
    Ok(Json(deal))
}

/// Accountant approves the priced deal
pub async fn finance_approve(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> AppResult<Json<Deal>> {
    let service = DealService::new(state.db);
    let deal = service.finance_approve(&user, deal_id).await?;
    Ok(Json(deal))
}

/// Accountant rejects with a reason
pub async fn finance_reject(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
    Json(input): Json<ReasonInput>,
) -> AppResult<Json<Deal>> {
    let service = DealService::new(state.db);
    let deal = service.finance_reject(&user, deal_id, input).await?;
    Ok(Json(deal))
}

/// Admin approves
pub async fn admin_approve(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> AppResult<Json<Deal>> {
    let service = DealService::new(state.db);
    let deal = service.admin_approve(&user, deal_id).await?;
    Ok(Json(deal))
}

/// Admin schedules shipment
pub async fn mark_ready(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> AppResult<Json<Deal>> {
    let service = DealService::new(state.db);
    let deal = service.mark_ready(&user, deal_id).await?;
    Ok(Json(deal))
}

/// Warehouse records the dispatch; triggers the stock write-off
pub async fn ship_deal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
    Json(input): Json<RecordShipmentInput>,
) -> AppResult<Json<Shipment>> {
    let service = DealService::new(state.db);
    let shipment = service.ship(&user, deal_id, input).await?;
    Ok(Json(shipment))
}

/// Warehouse holds the shipment
pub async fn hold_shipment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
    Json(input): Json<ReasonInput>,
) -> AppResult<Json<Deal>> {
    let service = DealService::new(state.db);
    let deal = service.hold_shipment(&user, deal_id, input).await?;
    Ok(Json(deal))
}

/// Release a held shipment
pub async fn release_shipment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> AppResult<Json<Deal>> {
    let service = DealService::new(state.db);
    let deal = service.release_shipment(&user, deal_id).await?;
    Ok(Json(deal))
}

/// Admin closes a shipped deal
pub async fn close_deal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> AppResult<Json<Deal>> {
    let service = DealService::new(state.db);
    let deal = service.close_deal(&user, deal_id).await?;
    Ok(Json(deal))
}

/// Manager reworks a rejected deal
pub async fn rework_deal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> AppResult<Json<Deal>> {
    let service = DealService::new(state.db);
    let deal = service.rework(&user, deal_id).await?;
    Ok(Json(deal))
}

/// Cancel a deal
pub async fn cancel_deal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
    Json(input): Json<CancelInput>,
) -> AppResult<Json<Deal>> {
    let service = DealService::new(state.db);
    let deal = service.cancel(&user, deal_id, input).await?;
    Ok(Json(deal))
}

/// Shipment record for a shipped deal
pub async fn get_shipment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> AppResult<Json<Shipment>> {
    if !user.has_permission(Resource::Shipment, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = DealService::new(state.db);
    let shipment = service.get_shipment(deal_id).await?;
    Ok(Json(shipment))
}
