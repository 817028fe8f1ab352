//! Middleware for the Print Supply CRM backend

mod auth;

pub use auth::{auth_middleware, AuthUser, CurrentUser};
