//! Product catalog service
//!
//! Stock is owned by the inventory ledger; catalog updates never touch it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditService;
use shared::models::{AuditAction, Product};
use shared::validation::{validate_price, validate_required, validate_sku};

/// Product catalog service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
    pub unit: String,
    pub min_stock: Option<i32>,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
}

/// Input for updating a product. Stock is absent on purpose.
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub min_stock: Option<i32>,
    pub purchase_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// Row for product queries
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub unit: String,
    pub stock: i32,
    pub min_stock: i32,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    pub(crate) fn into_product(self) -> Product {
        Product {
            id: self.id,
            sku: self.sku,
            name: self.name,
            unit: self.unit,
            stock: self.stock,
            min_stock: self.min_stock,
            purchase_price: self.purchase_price,
            sale_price: self.sale_price,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, sku, name, unit, stock, min_stock, purchase_price, sale_price, is_active, created_at, updated_at";

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a catalog item. Stock starts at zero and only the ledger
    /// moves it.
    pub async fn create_product(
        &self,
        user_id: Uuid,
        input: CreateProductInput,
    ) -> AppResult<Product> {
        validate_sku(&input.sku).map_err(|msg| AppError::validation("sku", msg))?;
        validate_required(&input.name).map_err(|msg| AppError::validation("name", msg))?;
        validate_required(&input.unit).map_err(|msg| AppError::validation("unit", msg))?;
        validate_price(input.purchase_price)
            .map_err(|msg| AppError::validation("purchase_price", msg))?;
        validate_price(input.sale_price).map_err(|msg| AppError::validation("sale_price", msg))?;

        let min_stock = input.min_stock.unwrap_or(0);
        if min_stock < 0 {
            return Err(AppError::validation("min_stock", "Threshold cannot be negative"));
        }

        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1)",
        )
        .bind(&input.sku)
        .fetch_one(&self.db)
        .await?;
        if duplicate {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (sku, name, unit, min_stock, purchase_price, sale_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&input.sku)
        .bind(&input.name)
        .bind(&input.unit)
        .bind(min_stock)
        .bind(input.purchase_price)
        .bind(input.sale_price)
        .fetch_one(&mut *tx)
        .await?;

        let product = row.into_product();

        AuditService::record(
            &mut tx,
            user_id,
            AuditAction::Create,
            "product",
            product.id,
            None,
            Some(serde_json::json!({ "sku": product.sku, "name": product.name })),
        )
        .await?;

        tx.commit().await?;

        Ok(product)
    }

    /// Update catalog fields. The `stock` column is deliberately
    /// unreachable from here.
    pub async fn update_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        if let Some(name) = &input.name {
            validate_required(name).map_err(|msg| AppError::validation("name", msg))?;
        }
        if let Some(unit) = &input.unit {
            validate_required(unit).map_err(|msg| AppError::validation("unit", msg))?;
        }
        if let Some(price) = input.purchase_price {
            validate_price(price).map_err(|msg| AppError::validation("purchase_price", msg))?;
        }
        if let Some(price) = input.sale_price {
            validate_price(price).map_err(|msg| AppError::validation("sale_price", msg))?;
        }
        if let Some(min_stock) = input.min_stock {
            if min_stock < 0 {
                return Err(AppError::validation("min_stock", "Threshold cannot be negative"));
            }
        }

        let mut tx = self.db.begin().await?;

        let before = self.get_product(product_id).await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET name = COALESCE($1, name),
                unit = COALESCE($2, unit),
                min_stock = COALESCE($3, min_stock),
                purchase_price = COALESCE($4, purchase_price),
                sale_price = COALESCE($5, sale_price),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $7
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.unit)
        .bind(input.min_stock)
        .bind(input.purchase_price)
        .bind(input.sale_price)
        .bind(input.is_active)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let product = row.into_product();

        AuditService::record(
            &mut tx,
            user_id,
            AuditAction::Update,
            "product",
            product.id,
            Some(serde_json::to_value(&before).unwrap_or_default()),
            Some(serde_json::to_value(&product).unwrap_or_default()),
        )
        .await?;

        tx.commit().await?;

        Ok(product)
    }

    /// Get a product by ID
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(row.into_product())
    }

    /// List products, optionally including deactivated ones
    pub async fn list_products(&self, include_inactive: bool) -> AppResult<Vec<Product>> {
        let rows = if include_inactive {
            sqlx::query_as::<_, ProductRow>(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY sku ASC"
            ))
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as::<_, ProductRow>(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = TRUE ORDER BY sku ASC"
            ))
            .fetch_all(&self.db)
            .await?
        };

        Ok(rows.into_iter().map(ProductRow::into_product).collect())
    }
}
