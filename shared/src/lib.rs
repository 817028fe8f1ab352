//! Shared types and models for the Print Supply CRM
//!
//! This crate contains the domain model: the deal workflow state machine,
//! the inventory and payment ledger records, and the registry entities the
//! backend persists. It is kept free of I/O so the workflow rules can be
//! tested in isolation.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
