//! Product catalog handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::product::{CreateProductInput, UpdateProductInput};
use crate::services::ProductService;
use crate::AppState;
use shared::models::{Action, Product, Resource};

/// Query flags for product listings
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub include_inactive: Option<bool>,
}

/// Create a catalog item
pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<Product>> {
    if !user.has_permission(Resource::Product, Action::Create) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = ProductService::new(state.db);
    let product = service.create_product(user.user_id, input).await?;
    Ok(Json(product))
}

/// List products
pub async fn list_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ProductListQuery>,
) -> AppResult<Json<Vec<Product>>> {
    if !user.has_permission(Resource::Product, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = ProductService::new(state.db);
    let products = service
        .list_products(query.include_inactive.unwrap_or(false))
        .await?;
    Ok(Json(products))
}

/// Get a product by ID
pub async fn get_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    if !user.has_permission(Resource::Product, Action::View) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = ProductService::new(state.db);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Update catalog fields; stock is owned by the inventory ledger
pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    if !user.has_permission(Resource::Product, Action::Edit) {
        return Err(AppError::InsufficientPermissions);
    }

    let service = ProductService::new(state.db);
    let product = service.update_product(user.user_id, product_id, input).await?;
    Ok(Json(product))
}
