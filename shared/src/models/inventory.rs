//! Inventory ledger models
//!
//! Stock levels are a cached aggregate; the source of truth is the ordered
//! sequence of movements for a product. Movements are append-only and are
//! never updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    In,
    Out,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in" => Some(MovementType::In),
            "out" => Some(MovementType::Out),
            _ => None,
        }
    }
}

/// One append-only ledger entry for a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub movement_type: MovementType,
    /// Strictly positive; the direction carries the sign
    pub quantity: i32,
    /// Set on automatic OUT postings triggered by a shipment
    pub deal_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Replay a product's movements in creation order and return the stock
/// level they reconstruct. Must equal the cached `Product::stock`.
pub fn replay_stock(movements: &[InventoryMovement]) -> i32 {
    movements.iter().fold(0, |stock, m| match m.movement_type {
        MovementType::In => stock + m.quantity,
        MovementType::Out => stock - m.quantity,
    })
}

/// Cap an OUT posting at available stock. Shipments are never blocked by
/// shortfall; the shortfall is absorbed by shipping less.
pub fn cap_out_quantity(requested: i32, stock: i32) -> i32 {
    requested.min(stock).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(movement_type: MovementType, quantity: i32) -> InventoryMovement {
        InventoryMovement {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            movement_type,
            quantity,
            deal_id: None,
            note: None,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn replay_folds_in_and_out() {
        let movements = vec![
            movement(MovementType::In, 50),
            movement(MovementType::In, 30),
            movement(MovementType::Out, 20),
            movement(MovementType::In, 10),
            movement(MovementType::Out, 15),
        ];
        assert_eq!(replay_stock(&movements), 55);
    }

    #[test]
    fn replay_of_empty_ledger_is_zero() {
        assert_eq!(replay_stock(&[]), 0);
    }

    #[test]
    fn out_postings_are_capped_at_stock() {
        assert_eq!(cap_out_quantity(8, 5), 5);
        assert_eq!(cap_out_quantity(5, 8), 5);
        assert_eq!(cap_out_quantity(3, 0), 0);
        assert_eq!(cap_out_quantity(0, 7), 0);
    }
}
