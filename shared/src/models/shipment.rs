//! Shipment record models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physical dispatch record, one-to-one with a shipped deal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub vehicle_type: String,
    pub vehicle_number: String,
    pub driver_name: String,
    pub departure_time: DateTime<Utc>,
    pub delivery_note_number: String,
    pub shipped_by: Uuid,
    pub shipped_at: DateTime<Utc>,
}
