//! Audit log models
//!
//! Every status transition and mutating action lands here, with before/after
//! snapshots. Append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Archive,
    StatusChange,
    ItemAdded,
    ItemRemoved,
    ItemsPriced,
    PaymentRecorded,
    MovementRecorded,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Archive => "archive",
            AuditAction::StatusChange => "status_change",
            AuditAction::ItemAdded => "item_added",
            AuditAction::ItemRemoved => "item_removed",
            AuditAction::ItemsPriced => "items_priced",
            AuditAction::PaymentRecorded => "payment_recorded",
            AuditAction::MovementRecorded => "movement_recorded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "create" => Some(AuditAction::Create),
            "update" => Some(AuditAction::Update),
            "archive" => Some(AuditAction::Archive),
            "status_change" => Some(AuditAction::StatusChange),
            "item_added" => Some(AuditAction::ItemAdded),
            "item_removed" => Some(AuditAction::ItemRemoved),
            "items_priced" => Some(AuditAction::ItemsPriced),
            "payment_recorded" => Some(AuditAction::PaymentRecorded),
            "movement_recorded" => Some(AuditAction::MovementRecorded),
            _ => None,
        }
    }
}

/// One audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
