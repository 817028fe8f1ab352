//! Deal workflow tests
//!
//! Tests for the status machine including:
//! - Transition legality (only the enumerated edges are reachable)
//! - Permission gating per transition
//! - Finance approval blocked until every item is priced

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{
    deal_amount, items_fully_priced, permission_key, Action, DealItem, DealStatus, Resource, Role,
};

/// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn item(qty: Option<i32>, price: Option<Decimal>) -> DealItem {
    DealItem {
        id: Uuid::new_v4(),
        deal_id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        request_comment: "stock check please".to_string(),
        warehouse_comment: Some("available".to_string()),
        requested_qty: qty,
        price,
        confirmed_by: None,
        confirmed_at: None,
        created_at: chrono::Utc::now(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// The full happy path, edge by edge
    #[test]
    fn test_happy_path_edges() {
        let path = [
            DealStatus::New,
            DealStatus::InProgress,
            DealStatus::WaitingStockConfirmation,
            DealStatus::StockConfirmed,
            DealStatus::FinanceApproved,
            DealStatus::AdminApproved,
            DealStatus::ReadyForShipment,
            DealStatus::Shipped,
            DealStatus::Closed,
        ];

        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]));
        }
    }

    /// Exactly the enumerated edges exist, nothing else
    #[test]
    fn test_transition_table_is_exhaustive() {
        let expected: &[(DealStatus, DealStatus)] = &[
            (DealStatus::New, DealStatus::InProgress),
            (DealStatus::New, DealStatus::Canceled),
            (DealStatus::InProgress, DealStatus::WaitingStockConfirmation),
            (DealStatus::InProgress, DealStatus::Canceled),
            (DealStatus::WaitingStockConfirmation, DealStatus::StockConfirmed),
            (DealStatus::WaitingStockConfirmation, DealStatus::Canceled),
            (DealStatus::StockConfirmed, DealStatus::FinanceApproved),
            (DealStatus::StockConfirmed, DealStatus::Rejected),
            (DealStatus::StockConfirmed, DealStatus::Canceled),
            (DealStatus::FinanceApproved, DealStatus::AdminApproved),
            (DealStatus::FinanceApproved, DealStatus::Canceled),
            (DealStatus::AdminApproved, DealStatus::ReadyForShipment),
            (DealStatus::AdminApproved, DealStatus::Canceled),
            (DealStatus::ReadyForShipment, DealStatus::Shipped),
            (DealStatus::ReadyForShipment, DealStatus::ShipmentOnHold),
            (DealStatus::ReadyForShipment, DealStatus::Canceled),
            (DealStatus::ShipmentOnHold, DealStatus::ReadyForShipment),
            (DealStatus::ShipmentOnHold, DealStatus::Canceled),
            (DealStatus::Shipped, DealStatus::Closed),
            (DealStatus::Rejected, DealStatus::InProgress),
        ];

        for from in DealStatus::ALL {
            for to in DealStatus::ALL {
                let legal = expected.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    legal,
                    "edge {} -> {} expected legal={}",
                    from,
                    to,
                    legal
                );
            }
        }
    }

    /// Terminal statuses have no exits at all
    #[test]
    fn test_terminal_statuses() {
        assert!(DealStatus::Closed.is_terminal());
        assert!(DealStatus::Canceled.is_terminal());
        for status in DealStatus::ALL {
            if !status.is_terminal() {
                assert!(!status.allowed_targets().is_empty());
            }
        }
    }

    /// Cancellation excludes rejected, shipped and terminal deals
    #[test]
    fn test_cancel_eligibility() {
        for status in DealStatus::ALL {
            let eligible = !matches!(
                status,
                DealStatus::Rejected
                    | DealStatus::Shipped
                    | DealStatus::Closed
                    | DealStatus::Canceled
            );
            assert_eq!(status.can_cancel(), eligible, "cancel from {}", status);
        }
    }

    /// The warehouse gate is held by the warehouse role only
    #[test]
    fn test_stock_confirmation_gated_by_warehouse() {
        let (resource, action) = DealStatus::WaitingStockConfirmation
            .transition_permission(DealStatus::StockConfirmed)
            .unwrap();
        let key = permission_key(resource, action);
        assert_eq!(key, "deal:stock_confirm");
        assert!(Role::Warehouse.permissions().contains(&key));
        assert!(!Role::Manager.permissions().contains(&key));
        assert!(!Role::Accountant.permissions().contains(&key));
    }

    /// Approve and reject at finance share the accountant's permission
    #[test]
    fn test_finance_gate() {
        let approve = DealStatus::StockConfirmed
            .transition_permission(DealStatus::FinanceApproved)
            .unwrap();
        let reject = DealStatus::StockConfirmed
            .transition_permission(DealStatus::Rejected)
            .unwrap();
        assert_eq!(approve, reject);
        assert_eq!(approve, (Resource::Deal, Action::FinanceApprove));
    }

    /// Scenario: two unpriced items block finance approval; pricing them
    /// yields amount 10x1000 + 5x2000 = 20000 and unblocks it
    #[test]
    fn test_finance_approval_blocked_until_priced() {
        let unpriced = vec![item(None, None), item(None, None)];
        assert!(!items_fully_priced(&unpriced));
        assert_eq!(deal_amount(&unpriced), Decimal::ZERO);

        let priced = vec![
            item(Some(10), Some(dec("1000"))),
            item(Some(5), Some(dec("2000"))),
        ];
        assert!(items_fully_priced(&priced));
        assert_eq!(deal_amount(&priced), dec("20000"));

        // half-priced still blocks
        let mixed = vec![item(Some(10), Some(dec("1000"))), item(Some(5), None)];
        assert!(!items_fully_priced(&mixed));
    }

    /// Queue gating: each waiting status maps to the role that can move it
    #[test]
    fn test_queue_gates() {
        let cases = [
            (DealStatus::WaitingStockConfirmation, Role::Warehouse),
            (DealStatus::StockConfirmed, Role::Accountant),
            (DealStatus::FinanceApproved, Role::Admin),
            (DealStatus::ReadyForShipment, Role::Warehouse),
            (DealStatus::Shipped, Role::Admin),
        ];
        for (status, role) in cases {
            let (resource, action) = status.gate_permission().unwrap();
            assert!(
                role.permissions().contains(&permission_key(resource, action)),
                "{} should be able to advance {}",
                role,
                status
            );
        }
    }
}

// ============================================================================
// Property: transition checks are pure and repeatable
// ============================================================================
// Re-asking the same illegal transition gives the same rejection; legality
// never depends on anything but the (from, to) pair.

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// An illegal edge stays illegal no matter how often it is checked
    #[test]
    fn property_illegal_transitions_are_stable(
        from_idx in 0usize..12,
        to_idx in 0usize..12,
    ) {
        let from = DealStatus::ALL[from_idx];
        let to = DealStatus::ALL[to_idx];

        let first = from.can_transition_to(to);
        let second = from.can_transition_to(to);
        prop_assert_eq!(first, second);

        // permission table agrees with the transition table
        prop_assert_eq!(from.transition_permission(to).is_some(), first);
    }

    /// Every legal edge is gated by a permission some role actually holds
    #[test]
    fn property_every_edge_has_an_owner(
        from_idx in 0usize..12,
        to_idx in 0usize..12,
    ) {
        let from = DealStatus::ALL[from_idx];
        let to = DealStatus::ALL[to_idx];

        if let Some((resource, action)) = from.transition_permission(to) {
            let key = permission_key(resource, action);
            let roles = [Role::Admin, Role::Manager, Role::Accountant, Role::Warehouse];
            let holders = roles
                .iter()
                .filter(|role| role.permissions().contains(&key))
                .count();
            prop_assert!(holders >= 1, "no role holds {}", key);
        }
    }

    /// Deal amount is the sum of qty x price over priced items
    #[test]
    fn property_deal_amount_is_linear(
        quantities in proptest::collection::vec(1i32..1000, 1..8),
        prices in proptest::collection::vec(1u32..100_000, 1..8),
    ) {
        let n = quantities.len().min(prices.len());
        let items: Vec<DealItem> = (0..n)
            .map(|i| item(Some(quantities[i]), Some(Decimal::from(prices[i]))))
            .collect();

        let expected: Decimal = (0..n)
            .map(|i| Decimal::from(prices[i]) * Decimal::from(quantities[i]))
            .sum();

        prop_assert_eq!(deal_amount(&items), expected);
    }
}
