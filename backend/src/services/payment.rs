//! Payment ledger service
//!
//! Payments are append-only; the deal's `paid_amount` and `payment_status`
//! are denormalized roll-ups maintained in the same transaction as the
//! ledger insert. Corrections are offsetting entries with a negated amount.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditService;
use shared::models::{derive_payment_status, AuditAction, Payment, PaymentMethod};
use shared::validation::validate_payment_amount;

/// Payment ledger service
#[derive(Clone)]
pub struct PaymentService {
    db: PgPool,
}

/// Input for recording a payment against a deal
#[derive(Debug, Deserialize)]
pub struct RecordPaymentInput {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub paid_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

/// Row for payment queries
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    deal_id: Uuid,
    amount: Decimal,
    paid_at: DateTime<Utc>,
    method: String,
    note: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> AppResult<Payment> {
        let method = PaymentMethod::from_str(&self.method)
            .ok_or_else(|| AppError::Internal(format!("Unknown payment method: {}", self.method)))?;
        Ok(Payment {
            id: self.id,
            deal_id: self.deal_id,
            amount: self.amount,
            paid_at: self.paid_at,
            method,
            note: self.note,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

impl PaymentService {
    /// Create a new PaymentService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a payment and roll it into the deal's paid total
    pub async fn record_payment(
        &self,
        user_id: Uuid,
        deal_id: Uuid,
        input: RecordPaymentInput,
    ) -> AppResult<Payment> {
        validate_payment_amount(input.amount)
            .map_err(|msg| AppError::validation("amount", msg))?;

        let mut tx = self.db.begin().await?;

        // Lock the deal row so concurrent payments serialize on the roll-up
        let deal = sqlx::query_as::<_, (Decimal, Decimal, Decimal, String)>(
            "SELECT amount, discount, paid_amount, payment_status FROM deals WHERE id = $1 FOR UPDATE",
        )
        .bind(deal_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Deal".to_string()))?;

        let (amount, discount, paid_before, status_before) = deal;

        let paid_at = input.paid_at.unwrap_or_else(Utc::now);

        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            INSERT INTO payments (deal_id, amount, paid_at, method, note, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, deal_id, amount, paid_at, method, note, created_by, created_at
            "#,
        )
        .bind(deal_id)
        .bind(input.amount)
        .bind(paid_at)
        .bind(input.method.as_str())
        .bind(&input.note)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let payment = row.into_payment()?;

        let paid_after = paid_before + input.amount;
        let status_after = derive_payment_status(paid_after, amount, discount);

        sqlx::query(
            "UPDATE deals SET paid_amount = $1, payment_status = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(paid_after)
        .bind(status_after.as_str())
        .bind(deal_id)
        .execute(&mut *tx)
        .await?;

        AuditService::record(
            &mut tx,
            user_id,
            AuditAction::PaymentRecorded,
            "deal",
            deal_id,
            Some(serde_json::json!({
                "paid_amount": paid_before,
                "payment_status": status_before,
            })),
            Some(serde_json::json!({
                "payment_id": payment.id,
                "amount": payment.amount,
                "paid_amount": paid_after,
                "payment_status": status_after.as_str(),
            })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            deal_id = %deal_id,
            payment_id = %payment.id,
            amount = %payment.amount,
            "Payment recorded"
        );

        Ok(payment)
    }

    /// List payments for a deal in posting order
    pub async fn list_payments(&self, deal_id: Uuid) -> AppResult<Vec<Payment>> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM deals WHERE id = $1)")
            .bind(deal_id)
            .fetch_one(&self.db)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Deal".to_string()));
        }

        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, deal_id, amount, paid_at, method, note, created_by, created_at
            FROM payments
            WHERE deal_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(deal_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(PaymentRow::into_payment).collect()
    }
}
