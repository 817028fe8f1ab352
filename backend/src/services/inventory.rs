//! Inventory ledger service
//!
//! The movement ledger is the source of truth for stock; the `stock` column
//! on products is a cached aggregate maintained transactionally alongside
//! every ledger insert. All stock mutations go through `post_movement`;
//! nothing else writes `products.stock`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditService;
use crate::services::product::ProductRow;
use shared::models::{replay_stock, AuditAction, InventoryMovement, MovementType, Product};

/// Inventory service for the movement ledger and stock views
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Input for a manual goods receipt (IN posting)
#[derive(Debug, Deserialize)]
pub struct RecordReceiptInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub note: Option<String>,
}

/// Ledger/cache consistency report for one product
#[derive(Debug, Serialize)]
pub struct StockReconciliation {
    pub product_id: Uuid,
    pub sku: String,
    pub cached_stock: i32,
    pub replayed_stock: i32,
    pub consistent: bool,
}

/// Row for movement queries
#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: Uuid,
    product_id: Uuid,
    movement_type: String,
    quantity: i32,
    deal_id: Option<Uuid>,
    note: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl MovementRow {
    fn into_movement(self) -> AppResult<InventoryMovement> {
        let movement_type = MovementType::from_str(&self.movement_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown movement type: {}", self.movement_type))
        })?;
        Ok(InventoryMovement {
            id: self.id,
            product_id: self.product_id,
            movement_type,
            quantity: self.quantity,
            deal_id: self.deal_id,
            note: self.note,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a manual goods receipt (restocking)
    pub async fn record_receipt(
        &self,
        user_id: Uuid,
        input: RecordReceiptInput,
    ) -> AppResult<InventoryMovement> {
        if input.quantity <= 0 {
            return Err(AppError::validation("quantity", "Quantity must be positive"));
        }

        let mut tx = self.db.begin().await?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)",
        )
        .bind(input.product_id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let movement = Self::post_movement(
            &mut tx,
            user_id,
            input.product_id,
            MovementType::In,
            input.quantity,
            None,
            input.note.as_deref(),
        )
        .await?;

        AuditService::record(
            &mut tx,
            user_id,
            AuditAction::MovementRecorded,
            "inventory_movement",
            movement.id,
            None,
            Some(serde_json::json!({
                "product_id": movement.product_id,
                "movement_type": movement.movement_type,
                "quantity": movement.quantity,
            })),
        )
        .await?;

        tx.commit().await?;

        Ok(movement)
    }

    /// Append one ledger entry and update the cached stock in the same
    /// transaction. The single writer for `products.stock`.
    ///
    /// Callers posting OUT movements must cap the quantity at current stock
    /// first (holding a row lock); a movement that would drive stock
    /// negative is a caller bug and is rejected here.
    pub async fn post_movement(
        conn: &mut PgConnection,
        user_id: Uuid,
        product_id: Uuid,
        movement_type: MovementType,
        quantity: i32,
        deal_id: Option<Uuid>,
        note: Option<&str>,
    ) -> AppResult<InventoryMovement> {
        if quantity <= 0 {
            return Err(AppError::validation("quantity", "Quantity must be positive"));
        }

        let delta = match movement_type {
            MovementType::In => quantity,
            MovementType::Out => -quantity,
        };

        let new_stock = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE products
            SET stock = stock + $1, updated_at = NOW()
            WHERE id = $2
            RETURNING stock
            "#,
        )
        .bind(delta)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        if new_stock < 0 {
            return Err(AppError::Internal(format!(
                "Stock for product {} would go negative",
                product_id
            )));
        }

        let row = sqlx::query_as::<_, MovementRow>(
            r#"
            INSERT INTO inventory_movements (product_id, movement_type, quantity, deal_id, note, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, product_id, movement_type, quantity, deal_id, note, created_by, created_at
            "#,
        )
        .bind(product_id)
        .bind(movement_type.as_str())
        .bind(quantity)
        .bind(deal_id)
        .bind(note)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

        row.into_movement()
    }

    /// List all movements, newest first
    pub async fn list_movements(&self) -> AppResult<Vec<InventoryMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, product_id, movement_type, quantity, deal_id, note, created_by, created_at
            FROM inventory_movements
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(MovementRow::into_movement).collect()
    }

    /// List movements for a product in creation order
    pub async fn movements_for_product(
        &self,
        product_id: Uuid,
    ) -> AppResult<Vec<InventoryMovement>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)",
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, product_id, movement_type, quantity, deal_id, note, created_by, created_at
            FROM inventory_movements
            WHERE product_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(MovementRow::into_movement).collect()
    }

    /// Replay a product's ledger and compare against the cached stock
    pub async fn reconcile(&self, product_id: Uuid) -> AppResult<StockReconciliation> {
        let product = sqlx::query_as::<_, (String, i32)>(
            "SELECT sku, stock FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let movements = self.movements_for_product(product_id).await?;
        let replayed = replay_stock(&movements);

        Ok(StockReconciliation {
            product_id,
            sku: product.0,
            cached_stock: product.1,
            replayed_stock: replayed,
            consistent: product.1 == replayed,
        })
    }

    /// Products below their restocking threshold
    pub async fn low_stock(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, sku, name, unit, stock, min_stock, purchase_price, sale_price,
                   is_active, created_at, updated_at
            FROM products
            WHERE is_active = TRUE AND stock < min_stock
            ORDER BY sku ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(ProductRow::into_product).collect())
    }
}
