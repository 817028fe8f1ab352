//! Inventory ledger tests
//!
//! Tests for stock bookkeeping including:
//! - Ledger replay reconstructs the cached stock
//! - OUT capping keeps stock non-negative without blocking shipments

use proptest::prelude::*;
use uuid::Uuid;

use shared::models::{cap_out_quantity, replay_stock, InventoryMovement, MovementType};

fn movement(movement_type: MovementType, quantity: i32) -> InventoryMovement {
    InventoryMovement {
        id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        movement_type,
        quantity,
        deal_id: None,
        note: None,
        created_by: Uuid::new_v4(),
        created_at: chrono::Utc::now(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Replay folds IN as + and OUT as -
    #[test]
    fn test_replay_reconstructs_stock() {
        let ledger = vec![
            movement(MovementType::In, 100),
            movement(MovementType::Out, 30),
            movement(MovementType::In, 12),
            movement(MovementType::Out, 7),
        ];
        assert_eq!(replay_stock(&ledger), 75);
    }

    /// Scenario: stock 5, deal requests 8; the OUT movement posts 5 and
    /// stock lands on 0, not -3
    #[test]
    fn test_shipment_shortfall_is_capped() {
        let stock = 5;
        let requested = 8;

        let shipped = cap_out_quantity(requested, stock);
        assert_eq!(shipped, 5);

        let ledger = vec![
            movement(MovementType::In, stock),
            movement(MovementType::Out, shipped),
        ];
        assert_eq!(replay_stock(&ledger), 0);
    }

    /// A fully stocked item ships in full
    #[test]
    fn test_sufficient_stock_ships_in_full() {
        assert_eq!(cap_out_quantity(8, 20), 8);
    }

    /// A zero-stock item posts nothing (movement quantity must be > 0)
    #[test]
    fn test_zero_stock_posts_no_movement() {
        assert_eq!(cap_out_quantity(8, 0), 0);
    }
}

// ============================================================================
// Property: ledger/cache consistency under capped writes
// ============================================================================
// Applying a mixed sequence of IN postings and capped OUT postings never
// takes the replayed stock negative, and the running cache always equals
// the replay of everything posted so far.

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn property_capped_ledger_never_goes_negative(
        ops in proptest::collection::vec((any::<bool>(), 1i32..500), 0..40),
    ) {
        let mut ledger: Vec<InventoryMovement> = Vec::new();
        let mut cached = 0i32;

        for (is_in, qty) in ops {
            if is_in {
                ledger.push(movement(MovementType::In, qty));
                cached += qty;
            } else {
                // the shipment path: cap at current stock, skip zero posts
                let capped = cap_out_quantity(qty, cached);
                if capped > 0 {
                    ledger.push(movement(MovementType::Out, capped));
                    cached -= capped;
                }
            }

            let replayed = replay_stock(&ledger);
            prop_assert!(replayed >= 0, "stock went negative: {}", replayed);
            prop_assert_eq!(replayed, cached, "cache diverged from ledger");
        }
    }

    #[test]
    fn property_cap_is_min_bounded_at_zero(
        requested in 0i32..10_000,
        stock in 0i32..10_000,
    ) {
        let capped = cap_out_quantity(requested, stock);
        prop_assert!(capped <= requested);
        prop_assert!(capped <= stock);
        prop_assert!(capped >= 0);
        // when stock suffices the request ships whole
        if stock >= requested {
            prop_assert_eq!(capped, requested);
        }
    }
}
