//! Route definitions for the Print Supply CRM

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public + protected)
        .nest("/auth", auth_routes())
        // Protected routes - staff accounts
        .nest("/users", user_routes())
        // Protected routes - client registry
        .nest("/clients", client_routes())
        // Protected routes - product catalog
        .nest("/products", product_routes())
        // Protected routes - inventory ledger
        .nest("/inventory", inventory_routes())
        // Protected routes - deal workflow
        .nest("/deals", deal_routes())
        // Protected routes - audit log
        .nest("/audit", audit_routes())
}

/// Authentication routes
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/bootstrap", post(handlers::bootstrap))
        .route(
            "/me",
            get(handlers::me).route_layer(middleware::from_fn(auth_middleware)),
        )
}

/// Staff account routes (protected)
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Client registry routes (protected)
fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_clients).post(handlers::create_client))
        .route(
            "/:client_id",
            get(handlers::get_client).put(handlers::update_client),
        )
        .route("/:client_id/archive", post(handlers::archive_client))
        .route(
            "/:client_id/contracts",
            get(handlers::list_contracts).post(handlers::create_contract),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Product catalog routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product).put(handlers::update_product),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Inventory ledger routes (protected)
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/movements",
            get(handlers::list_movements).post(handlers::record_receipt),
        )
        .route(
            "/products/:product_id/movements",
            get(handlers::get_product_movements),
        )
        .route(
            "/products/:product_id/reconcile",
            get(handlers::reconcile_product),
        )
        .route("/low-stock", get(handlers::low_stock))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Deal workflow routes (protected)
fn deal_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_deals).post(handlers::create_deal))
        .route("/queue", get(handlers::deal_queue))
        .route("/:deal_id", get(handlers::get_deal))
        // Line items
        .route("/:deal_id/items", post(handlers::add_item))
        .route("/:deal_id/items/:item_id", delete(handlers::remove_item))
        // Workflow transitions
        .route("/:deal_id/start", post(handlers::start_work))
        .route("/:deal_id/request-stock-check", post(handlers::request_stock_check))
        .route("/:deal_id/stock-response", post(handlers::submit_stock_response))
        .route("/:deal_id/pricing", put(handlers::set_pricing))
        .route("/:deal_id/finance-approve", post(handlers::finance_approve))
        .route("/:deal_id/finance-reject", post(handlers::finance_reject))
        .route("/:deal_id/admin-approve", post(handlers::admin_approve))
        .route("/:deal_id/mark-ready", post(handlers::mark_ready))
        .route("/:deal_id/ship", post(handlers::ship_deal))
        .route("/:deal_id/hold", post(handlers::hold_shipment))
        .route("/:deal_id/release", post(handlers::release_shipment))
        .route("/:deal_id/close", post(handlers::close_deal))
        .route("/:deal_id/rework", post(handlers::rework_deal))
        .route("/:deal_id/cancel", post(handlers::cancel_deal))
        // Shipment and payments
        .route("/:deal_id/shipment", get(handlers::get_shipment))
        .route(
            "/:deal_id/payments",
            get(handlers::list_payments).post(handlers::record_payment),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Audit log routes (protected)
fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_audit))
        .route("/:entity_type/:entity_id", get(handlers::entity_audit))
        .route_layer(middleware::from_fn(auth_middleware))
}
