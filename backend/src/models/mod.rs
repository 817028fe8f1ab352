//! Database models for the Print Supply CRM backend
//!
//! Re-exports models from the shared crate

pub use shared::models::*;
