//! HTTP handlers for the Print Supply CRM

mod audit;
mod auth;
mod client;
mod deal;
mod health;
mod inventory;
mod payment;
mod product;

pub use audit::*;
pub use auth::*;
pub use client::*;
pub use deal::*;
pub use health::*;
pub use inventory::*;
pub use payment::*;
pub use product::*;
