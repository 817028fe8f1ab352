//! Payment ledger handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::payment::RecordPaymentInput;
use crate::services::PaymentService;
use crate::AppState;
use shared::models::{Action, Payment, Resource};

/// Record a payment against a deal
pub async fn record_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
    Json(input): Json<RecordPaymentInput>,
) -> AppResult<Json<Payment>> {
    if !user.has_permission(Resource::Payment, Action::Create) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = PaymentService::new(state.db);
    let payment = service.record_payment(user.user_id, deal_id, input).await?;
    Ok(Json(payment))
}

/// List a deal's payments
pub async fn list_payments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> AppResult<Json<Vec<Payment>>> {
    if !user.has_permission(Resource::Payment, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = PaymentService::new(state.db);
    let payments = service.list_payments(deal_id).await?;
    Ok(Json(payments))
}
