//! Deal workflow service
//!
//! Owns a deal's status, line items and the legal transitions between
//! statuses. Every status change funnels through `transition_tx`, which
//! checks edge legality against the shared transition table, checks the
//! caller's permission, persists the new status and writes the audit entry
//! inside the caller's transaction. Shipment side effects (OUT movements,
//! stock decrement, shipment record) share that same transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::audit::AuditService;
use crate::services::inventory::InventoryService;
use shared::models::{
    cap_out_quantity, deal_amount, derive_payment_status, items_fully_priced,
    items_stock_confirmed, Action, AuditAction, Deal, DealItem, DealStatus, MovementType,
    PaymentType, Resource, Role, Shipment,
};
use shared::types::{PaginatedResponse, Pagination, PaginationMeta};
use shared::validation::{validate_discount, validate_price, validate_quantity, validate_required};

/// Deal workflow service
#[derive(Clone)]
pub struct DealService {
    db: PgPool,
}

/// Input for creating a deal
#[derive(Debug, Deserialize)]
pub struct CreateDealInput {
    pub title: String,
    pub client_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub payment_type: Option<PaymentType>,
    pub due_date: Option<NaiveDate>,
}

/// Input for adding a line item
#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub product_id: Uuid,
    pub request_comment: String,
}

/// Warehouse reply for one item
#[derive(Debug, Deserialize)]
pub struct StockResponseItem {
    pub item_id: Uuid,
    pub warehouse_comment: String,
}

/// Warehouse response; may cover a subset of items, the deal only moves to
/// stock_confirmed once every item carries a reply
#[derive(Debug, Deserialize)]
pub struct StockResponseInput {
    pub items: Vec<StockResponseItem>,
}

/// Quantity and price for one item
#[derive(Debug, Deserialize)]
pub struct PricingItem {
    pub item_id: Uuid,
    pub requested_qty: i32,
    pub price: Decimal,
}

/// Pricing step at stock_confirmed: per-item quantities and prices plus
/// deal-level terms
#[derive(Debug, Deserialize)]
pub struct PricingInput {
    pub items: Vec<PricingItem>,
    pub discount: Option<Decimal>,
    pub payment_type: Option<PaymentType>,
    pub due_date: Option<NaiveDate>,
}

/// Input with a mandatory reason (finance reject, shipment hold)
#[derive(Debug, Deserialize)]
pub struct ReasonInput {
    pub reason: String,
}

/// Optional cancellation reason
#[derive(Debug, Deserialize, Default)]
pub struct CancelInput {
    pub reason: Option<String>,
}

/// Shipment details recorded by the warehouse
#[derive(Debug, Deserialize)]
pub struct RecordShipmentInput {
    pub vehicle_type: String,
    pub vehicle_number: String,
    pub driver_name: String,
    pub departure_time: DateTime<Utc>,
    pub delivery_note_number: String,
}

/// Deal with its line items
#[derive(Debug, Serialize)]
pub struct DealWithItems {
    #[serde(flatten)]
    pub deal: Deal,
    pub items: Vec<DealItem>,
}

/// Query filters for deal listings
#[derive(Debug, Default, Deserialize)]
pub struct DealListQuery {
    pub status: Option<String>,
    pub client_id: Option<Uuid>,
    pub include_archived: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Row for deal queries
#[derive(Debug, sqlx::FromRow)]
struct DealRow {
    id: Uuid,
    title: String,
    status: String,
    amount: Decimal,
    discount: Decimal,
    client_id: Uuid,
    manager_id: Uuid,
    contract_id: Option<Uuid>,
    payment_type: String,
    paid_amount: Decimal,
    payment_status: String,
    due_date: Option<NaiveDate>,
    is_archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DealRow {
    fn into_deal(self) -> AppResult<Deal> {
        let status = DealStatus::from_str(&self.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown deal status: {}", self.status)))?;
        let payment_type = PaymentType::from_str(&self.payment_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown payment type: {}", self.payment_type))
        })?;
        let payment_status = shared::models::PaymentStatus::from_str(&self.payment_status)
            .ok_or_else(|| {
                AppError::Internal(format!("Unknown payment status: {}", self.payment_status))
            })?;
        Ok(Deal {
            id: self.id,
            title: self.title,
            status,
            amount: self.amount,
            discount: self.discount,
            client_id: self.client_id,
            manager_id: self.manager_id,
            contract_id: self.contract_id,
            payment_type,
            paid_amount: self.paid_amount,
            payment_status,
            due_date: self.due_date,
            is_archived: self.is_archived,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row for deal item queries
#[derive(Debug, sqlx::FromRow)]
struct DealItemRow {
    id: Uuid,
    deal_id: Uuid,
    product_id: Uuid,
    request_comment: String,
    warehouse_comment: Option<String>,
    requested_qty: Option<i32>,
    price: Option<Decimal>,
    confirmed_by: Option<Uuid>,
    confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl DealItemRow {
    fn into_item(self) -> DealItem {
        DealItem {
            id: self.id,
            deal_id: self.deal_id,
            product_id: self.product_id,
            request_comment: self.request_comment,
            warehouse_comment: self.warehouse_comment,
            requested_qty: self.requested_qty,
            price: self.price,
            confirmed_by: self.confirmed_by,
            confirmed_at: self.confirmed_at,
            created_at: self.created_at,
        }
    }
}

/// Row for shipment queries
#[derive(Debug, sqlx::FromRow)]
struct ShipmentRow {
    id: Uuid,
    deal_id: Uuid,
    vehicle_type: String,
    vehicle_number: String,
    driver_name: String,
    departure_time: DateTime<Utc>,
    delivery_note_number: String,
    shipped_by: Uuid,
    shipped_at: DateTime<Utc>,
}

impl ShipmentRow {
    fn into_shipment(self) -> Shipment {
        Shipment {
            id: self.id,
            deal_id: self.deal_id,
            vehicle_type: self.vehicle_type,
            vehicle_number: self.vehicle_number,
            driver_name: self.driver_name,
            departure_time: self.departure_time,
            delivery_note_number: self.delivery_note_number,
            shipped_by: self.shipped_by,
            shipped_at: self.shipped_at,
        }
    }
}

const DEAL_COLUMNS: &str = "id, title, status, amount, discount, client_id, manager_id, contract_id, payment_type, paid_amount, payment_status, due_date, is_archived, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, deal_id, product_id, request_comment, warehouse_comment, requested_qty, price, confirmed_by, confirmed_at, created_at";

impl DealService {
    /// Create a new DealService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Creation and listing
    // ========================================================================

    /// Create a deal in the `new` status for a client of the current manager
    pub async fn create_deal(&self, user: &AuthUser, input: CreateDealInput) -> AppResult<Deal> {
        validate_required(&input.title).map_err(|msg| AppError::validation("title", msg))?;

        let client = sqlx::query_as::<_, (Uuid, bool)>(
            "SELECT id, is_archived FROM clients WHERE id = $1",
        )
        .bind(input.client_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Client".to_string()))?;

        if client.1 {
            return Err(AppError::Conflict {
                resource: "client".to_string(),
                message: "Cannot open a deal for an archived client".to_string(),
            });
        }

        if let Some(contract_id) = input.contract_id {
            let contract_client = sqlx::query_scalar::<_, Uuid>(
                "SELECT client_id FROM contracts WHERE id = $1",
            )
            .bind(contract_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Contract".to_string()))?;

            if contract_client != input.client_id {
                return Err(AppError::validation(
                    "contract_id",
                    "Contract belongs to a different client",
                ));
            }
        }

        let payment_type = input.payment_type.unwrap_or(PaymentType::Full);

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, DealRow>(&format!(
            r#"
            INSERT INTO deals (title, status, client_id, manager_id, contract_id, payment_type, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {DEAL_COLUMNS}
            "#
        ))
        .bind(&input.title)
        .bind(DealStatus::New.as_str())
        .bind(input.client_id)
        .bind(user.user_id)
        .bind(input.contract_id)
        .bind(payment_type.as_str())
        .bind(input.due_date)
        .fetch_one(&mut *tx)
        .await?;

        let deal = row.into_deal()?;

        AuditService::record(
            &mut tx,
            user.user_id,
            AuditAction::Create,
            "deal",
            deal.id,
            None,
            Some(serde_json::json!({ "title": deal.title, "client_id": deal.client_id })),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(deal_id = %deal.id, "Deal created");

        Ok(deal)
    }

    /// Get a deal with its items
    pub async fn get_deal(&self, deal_id: Uuid) -> AppResult<DealWithItems> {
        let row = sqlx::query_as::<_, DealRow>(&format!(
            "SELECT {DEAL_COLUMNS} FROM deals WHERE id = $1"
        ))
        .bind(deal_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Deal".to_string()))?;

        let deal = row.into_deal()?;
        let items = Self::load_items(&self.db, deal_id).await?;

        Ok(DealWithItems { deal, items })
    }

    /// List deals with optional filters, newest first
    pub async fn list_deals(&self, query: DealListQuery) -> AppResult<PaginatedResponse<Deal>> {
        let status = match &query.status {
            Some(raw) => Some(
                DealStatus::from_str(raw)
                    .ok_or_else(|| AppError::validation("status", "Unknown status"))?,
            ),
            None => None,
        };
        let include_archived = query.include_archived.unwrap_or(false);
        let pagination = Pagination {
            page: query.page.unwrap_or(1),
            per_page: query.per_page.unwrap_or(20),
        }
        .clamped();

        let total_items = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM deals
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR client_id = $2)
              AND ($3 OR is_archived = FALSE)
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(query.client_id)
        .bind(include_archived)
        .fetch_one(&self.db)
        .await? as u64;

        let rows = sqlx::query_as::<_, DealRow>(&format!(
            r#"
            SELECT {DEAL_COLUMNS}
            FROM deals
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR client_id = $2)
              AND ($3 OR is_archived = FALSE)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(query.client_id)
        .bind(include_archived)
        .bind(i64::from(pagination.per_page))
        .bind(pagination.offset() as i64)
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(DealRow::into_deal)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(&pagination, total_items),
        })
    }

    /// Deals waiting for the caller's role: current status is gated on a
    /// permission the caller holds. Managers only see their own deals.
    pub async fn list_queue(&self, user: &AuthUser) -> AppResult<Vec<Deal>> {
        let statuses: Vec<String> = DealStatus::ALL
            .iter()
            .filter(|status| {
                status
                    .gate_permission()
                    .map_or(false, |(resource, action)| {
                        user.has_permission(resource, action)
                    })
            })
            .map(|status| status.as_str().to_string())
            .collect();

        if statuses.is_empty() {
            return Ok(vec![]);
        }

        let rows = sqlx::query_as::<_, DealRow>(&format!(
            r#"
            SELECT {DEAL_COLUMNS}
            FROM deals
            WHERE status = ANY($1)
              AND is_archived = FALSE
              AND ($2::uuid IS NULL OR manager_id = $2)
            ORDER BY updated_at ASC
            "#
        ))
        .bind(&statuses)
        .bind((user.role == Role::Manager).then_some(user.user_id))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(DealRow::into_deal).collect()
    }

    // ========================================================================
    // Line items
    // ========================================================================

    /// Add a line item while the deal is still being drafted
    pub async fn add_item(
        &self,
        user: &AuthUser,
        deal_id: Uuid,
        input: AddItemInput,
    ) -> AppResult<DealItem> {
        validate_required(&input.request_comment)
            .map_err(|msg| AppError::validation("request_comment", msg))?;

        let mut tx = self.db.begin().await?;

        let deal = Self::load_deal_for_update(&mut tx, deal_id).await?;
        Self::ensure_owner(user, &deal)?;
        Self::ensure_items_editable(&deal)?;

        let product_active = sqlx::query_scalar::<_, bool>(
            "SELECT is_active FROM products WHERE id = $1",
        )
        .bind(input.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        if !product_active {
            return Err(AppError::Conflict {
                resource: "product".to_string(),
                message: "Product is no longer active".to_string(),
            });
        }

        let row = sqlx::query_as::<_, DealItemRow>(&format!(
            r#"
            INSERT INTO deal_items (deal_id, product_id, request_comment)
            VALUES ($1, $2, $3)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(deal_id)
        .bind(input.product_id)
        .bind(&input.request_comment)
        .fetch_one(&mut *tx)
        .await?;

        let item = row.into_item();

        AuditService::record(
            &mut tx,
            user.user_id,
            AuditAction::ItemAdded,
            "deal",
            deal_id,
            None,
            Some(serde_json::json!({ "item_id": item.id, "product_id": item.product_id })),
        )
        .await?;

        tx.commit().await?;

        Ok(item)
    }

    /// Remove a line item while the deal is still being drafted
    pub async fn remove_item(&self, user: &AuthUser, deal_id: Uuid, item_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let deal = Self::load_deal_for_update(&mut tx, deal_id).await?;
        Self::ensure_owner(user, &deal)?;
        Self::ensure_items_editable(&deal)?;

        let removed = sqlx::query("DELETE FROM deal_items WHERE id = $1 AND deal_id = $2")
            .bind(item_id)
            .bind(deal_id)
            .execute(&mut *tx)
            .await?;

        if removed.rows_affected() == 0 {
            return Err(AppError::NotFound("Deal item".to_string()));
        }

        AuditService::record(
            &mut tx,
            user.user_id,
            AuditAction::ItemRemoved,
            "deal",
            deal_id,
            Some(serde_json::json!({ "item_id": item_id })),
            None,
        )
        .await?;

        tx.commit().await?;

        Ok(())
    }

    // ========================================================================
    // Workflow transitions
    // ========================================================================

    /// Manager starts work: new -> in_progress
    pub async fn start_work(&self, user: &AuthUser, deal_id: Uuid) -> AppResult<Deal> {
        self.simple_transition(user, deal_id, DealStatus::InProgress, true, None)
            .await
    }

    /// Manager sends the deal to the warehouse:
    /// in_progress -> waiting_stock_confirmation
    pub async fn request_stock_check(&self, user: &AuthUser, deal_id: Uuid) -> AppResult<Deal> {
        let mut tx = self.db.begin().await?;

        let deal = Self::load_deal_for_update(&mut tx, deal_id).await?;
        Self::ensure_owner(user, &deal)?;

        let items = Self::load_items(&mut *tx, deal_id).await?;
        if items.is_empty() {
            return Err(AppError::validation(
                "items",
                "Deal needs at least one item before a stock check",
            ));
        }

        Self::transition_tx(&mut tx, user, &deal, DealStatus::WaitingStockConfirmation, None)
            .await?;
        tx.commit().await?;

        self.get_deal(deal_id).await.map(|d| d.deal)
    }

    /// Warehouse replies per item; once every item has a reply the deal
    /// moves waiting_stock_confirmation -> stock_confirmed
    pub async fn submit_stock_response(
        &self,
        user: &AuthUser,
        deal_id: Uuid,
        input: StockResponseInput,
    ) -> AppResult<DealWithItems> {
        if !user.has_permission(Resource::Deal, Action::StockConfirm) {
            return Err(AppError::InsufficientPermissions);
        }
        if input.items.is_empty() {
            return Err(AppError::validation("items", "No item replies supplied"));
        }
        for reply in &input.items {
            validate_required(&reply.warehouse_comment)
                .map_err(|msg| AppError::validation("warehouse_comment", msg))?;
        }

        let mut tx = self.db.begin().await?;

        let deal = Self::load_deal_for_update(&mut tx, deal_id).await?;
        if deal.status != DealStatus::WaitingStockConfirmation {
            return Err(AppError::InvalidStateTransition(format!(
                "Deal is {}, not waiting for stock confirmation",
                deal.status
            )));
        }

        for reply in &input.items {
            let updated = sqlx::query(
                r#"
                UPDATE deal_items
                SET warehouse_comment = $1, confirmed_by = $2, confirmed_at = NOW()
                WHERE id = $3 AND deal_id = $4
                "#,
            )
            .bind(&reply.warehouse_comment)
            .bind(user.user_id)
            .bind(reply.item_id)
            .bind(deal_id)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(AppError::NotFound("Deal item".to_string()));
            }
        }

        let items = Self::load_items(&mut *tx, deal_id).await?;
        if items_stock_confirmed(&items) {
            Self::transition_tx(&mut tx, user, &deal, DealStatus::StockConfirmed, None).await?;
        }

        tx.commit().await?;

        self.get_deal(deal_id).await
    }

    /// Manager prices the confirmed items and sets the payment terms.
    /// Recomputes `amount = Σ(requested_qty × price)` and re-derives the
    /// payment status. No status change.
    pub async fn set_pricing(
        &self,
        user: &AuthUser,
        deal_id: Uuid,
        input: PricingInput,
    ) -> AppResult<DealWithItems> {
        if !user.has_permission(Resource::Deal, Action::Edit) {
            return Err(AppError::InsufficientPermissions);
        }

        for line in &input.items {
            validate_quantity(line.requested_qty)
                .map_err(|msg| AppError::validation("requested_qty", msg))?;
            validate_price(line.price).map_err(|msg| AppError::validation("price", msg))?;
        }

        let mut tx = self.db.begin().await?;

        let deal = Self::load_deal_for_update(&mut tx, deal_id).await?;
        Self::ensure_owner(user, &deal)?;
        if deal.status != DealStatus::StockConfirmed {
            return Err(AppError::InvalidStateTransition(format!(
                "Items can only be priced while the deal is stock_confirmed, current status is {}",
                deal.status
            )));
        }

        for line in &input.items {
            let updated = sqlx::query(
                "UPDATE deal_items SET requested_qty = $1, price = $2 WHERE id = $3 AND deal_id = $4",
            )
            .bind(line.requested_qty)
            .bind(line.price)
            .bind(line.item_id)
            .bind(deal_id)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(AppError::NotFound("Deal item".to_string()));
            }
        }

        let items = Self::load_items(&mut *tx, deal_id).await?;
        let amount = deal_amount(&items);
        let discount = input.discount.unwrap_or(deal.discount);
        validate_discount(discount, amount).map_err(|msg| AppError::validation("discount", msg))?;

        let payment_type = input.payment_type.unwrap_or(deal.payment_type);
        let payment_status = derive_payment_status(deal.paid_amount, amount, discount);

        sqlx::query(
            r#"
            UPDATE deals
            SET amount = $1, discount = $2, payment_type = $3, payment_status = $4,
                due_date = COALESCE($5, due_date), updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(amount)
        .bind(discount)
        .bind(payment_type.as_str())
        .bind(payment_status.as_str())
        .bind(input.due_date)
        .bind(deal_id)
        .execute(&mut *tx)
        .await?;

        AuditService::record(
            &mut tx,
            user.user_id,
            AuditAction::ItemsPriced,
            "deal",
            deal_id,
            Some(serde_json::json!({ "amount": deal.amount, "discount": deal.discount })),
            Some(serde_json::json!({ "amount": amount, "discount": discount })),
        )
        .await?;

        tx.commit().await?;

        self.get_deal(deal_id).await
    }

    /// Accountant approves: stock_confirmed -> finance_approved.
    /// Blocked until every item carries a quantity and price.
    pub async fn finance_approve(&self, user: &AuthUser, deal_id: Uuid) -> AppResult<Deal> {
        let mut tx = self.db.begin().await?;

        let deal = Self::load_deal_for_update(&mut tx, deal_id).await?;
        let items = Self::load_items(&mut *tx, deal_id).await?;

        if deal.status == DealStatus::StockConfirmed
            && (items.is_empty() || !items_fully_priced(&items))
        {
            return Err(AppError::validation(
                "items",
                "Every item needs a quantity and price before finance approval",
            ));
        }

        Self::transition_tx(&mut tx, user, &deal, DealStatus::FinanceApproved, None).await?;
        tx.commit().await?;

        self.get_deal(deal_id).await.map(|d| d.deal)
    }

    /// Accountant rejects with a reason: stock_confirmed -> rejected
    pub async fn finance_reject(
        &self,
        user: &AuthUser,
        deal_id: Uuid,
        input: ReasonInput,
    ) -> AppResult<Deal> {
        validate_required(&input.reason).map_err(|msg| AppError::validation("reason", msg))?;
        self.simple_transition(user, deal_id, DealStatus::Rejected, false, Some(&input.reason))
            .await
    }

    /// Admin approves: finance_approved -> admin_approved
    pub async fn admin_approve(&self, user: &AuthUser, deal_id: Uuid) -> AppResult<Deal> {
        self.simple_transition(user, deal_id, DealStatus::AdminApproved, false, None)
            .await
    }

    /// Admin schedules shipment: admin_approved -> ready_for_shipment
    pub async fn mark_ready(&self, user: &AuthUser, deal_id: Uuid) -> AppResult<Deal> {
        self.simple_transition(user, deal_id, DealStatus::ReadyForShipment, false, None)
            .await
    }

    /// Warehouse records the dispatch: ready_for_shipment -> shipped.
    ///
    /// In one transaction: status change, shipment record, and for every
    /// item an OUT movement capped at available stock. Shortfall ships
    /// short rather than blocking; a fully out-of-stock item posts no
    /// movement.
    pub async fn ship(
        &self,
        user: &AuthUser,
        deal_id: Uuid,
        input: RecordShipmentInput,
    ) -> AppResult<Shipment> {
        validate_required(&input.vehicle_type)
            .map_err(|msg| AppError::validation("vehicle_type", msg))?;
        validate_required(&input.vehicle_number)
            .map_err(|msg| AppError::validation("vehicle_number", msg))?;
        validate_required(&input.driver_name)
            .map_err(|msg| AppError::validation("driver_name", msg))?;
        validate_required(&input.delivery_note_number)
            .map_err(|msg| AppError::validation("delivery_note_number", msg))?;

        let mut tx = self.db.begin().await?;

        let deal = Self::load_deal_for_update(&mut tx, deal_id).await?;
        Self::transition_tx(&mut tx, user, &deal, DealStatus::Shipped, None).await?;

        let row = sqlx::query_as::<_, ShipmentRow>(
            r#"
            INSERT INTO shipments (deal_id, vehicle_type, vehicle_number, driver_name,
                                   departure_time, delivery_note_number, shipped_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, deal_id, vehicle_type, vehicle_number, driver_name,
                      departure_time, delivery_note_number, shipped_by, shipped_at
            "#,
        )
        .bind(deal_id)
        .bind(&input.vehicle_type)
        .bind(&input.vehicle_number)
        .bind(&input.driver_name)
        .bind(input.departure_time)
        .bind(&input.delivery_note_number)
        .bind(user.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let shipment = row.into_shipment();

        let items = Self::load_items(&mut *tx, deal_id).await?;
        for item in &items {
            let requested = item.requested_qty.ok_or_else(|| {
                AppError::Internal(format!(
                    "Deal {} reached shipment with an unpriced item",
                    deal_id
                ))
            })?;

            let stock = sqlx::query_scalar::<_, i32>(
                "SELECT stock FROM products WHERE id = $1 FOR UPDATE",
            )
            .bind(item.product_id)
            .fetch_one(&mut *tx)
            .await?;

            let quantity = cap_out_quantity(requested, stock);
            if quantity < requested {
                tracing::warn!(
                    deal_id = %deal_id,
                    product_id = %item.product_id,
                    requested,
                    available = stock,
                    "Shipping short: OUT movement capped at available stock"
                );
            }
            if quantity == 0 {
                continue;
            }

            InventoryService::post_movement(
                &mut tx,
                user.user_id,
                item.product_id,
                MovementType::Out,
                quantity,
                Some(deal_id),
                Some(&format!("Delivery note {}", input.delivery_note_number)),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(deal_id = %deal_id, shipment_id = %shipment.id, "Deal shipped");

        Ok(shipment)
    }

    /// Warehouse holds the shipment with a reason:
    /// ready_for_shipment -> shipment_on_hold
    pub async fn hold_shipment(
        &self,
        user: &AuthUser,
        deal_id: Uuid,
        input: ReasonInput,
    ) -> AppResult<Deal> {
        validate_required(&input.reason).map_err(|msg| AppError::validation("reason", msg))?;
        self.simple_transition(
            user,
            deal_id,
            DealStatus::ShipmentOnHold,
            false,
            Some(&input.reason),
        )
        .await
    }

    /// Release a held shipment: shipment_on_hold -> ready_for_shipment
    pub async fn release_shipment(&self, user: &AuthUser, deal_id: Uuid) -> AppResult<Deal> {
        self.simple_transition(user, deal_id, DealStatus::ReadyForShipment, false, None)
            .await
    }

    /// Admin closes a shipped deal: shipped -> closed
    pub async fn close_deal(&self, user: &AuthUser, deal_id: Uuid) -> AppResult<Deal> {
        self.simple_transition(user, deal_id, DealStatus::Closed, false, None)
            .await
    }

    /// Manager reworks a rejected deal: rejected -> in_progress
    pub async fn rework(&self, user: &AuthUser, deal_id: Uuid) -> AppResult<Deal> {
        self.simple_transition(user, deal_id, DealStatus::InProgress, true, None)
            .await
    }

    /// Cancel from any eligible status
    pub async fn cancel(
        &self,
        user: &AuthUser,
        deal_id: Uuid,
        input: CancelInput,
    ) -> AppResult<Deal> {
        self.simple_transition(
            user,
            deal_id,
            DealStatus::Canceled,
            true,
            input.reason.as_deref(),
        )
        .await
    }

    /// Shipment record for a shipped deal
    pub async fn get_shipment(&self, deal_id: Uuid) -> AppResult<Shipment> {
        let row = sqlx::query_as::<_, ShipmentRow>(
            r#"
            SELECT id, deal_id, vehicle_type, vehicle_number, driver_name,
                   departure_time, delivery_note_number, shipped_by, shipped_at
            FROM shipments
            WHERE deal_id = $1
            "#,
        )
        .bind(deal_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Shipment".to_string()))?;

        Ok(row.into_shipment())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Transition with no extra side effects beyond the audit entry
    async fn simple_transition(
        &self,
        user: &AuthUser,
        deal_id: Uuid,
        target: DealStatus,
        owner_gated: bool,
        note: Option<&str>,
    ) -> AppResult<Deal> {
        let mut tx = self.db.begin().await?;

        let deal = Self::load_deal_for_update(&mut tx, deal_id).await?;
        if owner_gated {
            Self::ensure_owner(user, &deal)?;
        }
        Self::transition_tx(&mut tx, user, &deal, target, note).await?;
        tx.commit().await?;

        self.get_deal(deal_id).await.map(|d| d.deal)
    }

    /// The single guarded dispatch for status changes: edge legality,
    /// caller permission, persisted update and audit entry, all inside the
    /// caller's transaction.
    async fn transition_tx(
        conn: &mut PgConnection,
        user: &AuthUser,
        deal: &Deal,
        target: DealStatus,
        note: Option<&str>,
    ) -> AppResult<()> {
        if !deal.status.can_transition_to(target) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot move deal from {} to {}",
                deal.status, target
            )));
        }

        let (resource, action) = deal
            .status
            .transition_permission(target)
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "No permission mapped for {} -> {}",
                    deal.status, target
                ))
            })?;
        if !user.has_permission(resource, action) {
            return Err(AppError::InsufficientPermissions);
        }

        sqlx::query("UPDATE deals SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(target.as_str())
            .bind(deal.id)
            .execute(&mut *conn)
            .await?;

        let mut after = serde_json::json!({ "status": target.as_str() });
        if let Some(note) = note {
            after["note"] = serde_json::Value::String(note.to_string());
        }

        AuditService::record(
            conn,
            user.user_id,
            AuditAction::StatusChange,
            "deal",
            deal.id,
            Some(serde_json::json!({ "status": deal.status.as_str() })),
            Some(after),
        )
        .await?;

        tracing::info!(
            deal_id = %deal.id,
            from = %deal.status,
            to = %target,
            "Deal status changed"
        );

        Ok(())
    }

    /// Load a deal and hold its row lock for the rest of the transaction,
    /// so racing transitions serialize and the loser sees the new status
    async fn load_deal_for_update(conn: &mut PgConnection, deal_id: Uuid) -> AppResult<Deal> {
        let row = sqlx::query_as::<_, DealRow>(&format!(
            "SELECT {DEAL_COLUMNS} FROM deals WHERE id = $1 FOR UPDATE"
        ))
        .bind(deal_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Deal".to_string()))?;

        row.into_deal()
    }

    async fn load_items<'e, E>(executor: E, deal_id: Uuid) -> AppResult<Vec<DealItem>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let rows = sqlx::query_as::<_, DealItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM deal_items WHERE deal_id = $1 ORDER BY created_at ASC"
        ))
        .bind(deal_id)
        .fetch_all(executor)
        .await?;

        Ok(rows.into_iter().map(DealItemRow::into_item).collect())
    }

    /// Managers only act on their own deals; other roles are scoped by
    /// permission alone
    fn ensure_owner(user: &AuthUser, deal: &Deal) -> AppResult<()> {
        if user.role == Role::Manager && deal.manager_id != user.user_id {
            return Err(AppError::InsufficientPermissions);
        }
        Ok(())
    }

    /// Items can only be added or removed while the deal is being drafted
    fn ensure_items_editable(deal: &Deal) -> AppResult<()> {
        match deal.status {
            DealStatus::New | DealStatus::InProgress => Ok(()),
            status => Err(AppError::Conflict {
                resource: "deal".to_string(),
                message: format!("Items cannot be changed while the deal is {}", status),
            }),
        }
    }
}
