//! Business logic services for the Print Supply CRM

pub mod audit;
pub mod auth;
pub mod client;
pub mod deal;
pub mod inventory;
pub mod payment;
pub mod product;

pub use audit::AuditService;
pub use auth::AuthService;
pub use client::ClientService;
pub use deal::DealService;
pub use inventory::InventoryService;
pub use payment::PaymentService;
pub use product::ProductService;
