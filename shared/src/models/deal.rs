//! Deal workflow models
//!
//! A deal moves through a fixed approval pipeline, each transition gated by
//! a different role. The transition table and the permission table below are
//! the single source of truth; the backend never compares raw status strings.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{Action, Resource};

/// Status of a deal in the approval/fulfillment workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    New,
    InProgress,
    WaitingStockConfirmation,
    StockConfirmed,
    FinanceApproved,
    AdminApproved,
    ReadyForShipment,
    ShipmentOnHold,
    Shipped,
    Closed,
    Canceled,
    Rejected,
}

impl DealStatus {
    /// Every status, in pipeline order
    pub const ALL: [DealStatus; 12] = [
        DealStatus::New,
        DealStatus::InProgress,
        DealStatus::WaitingStockConfirmation,
        DealStatus::StockConfirmed,
        DealStatus::FinanceApproved,
        DealStatus::AdminApproved,
        DealStatus::ReadyForShipment,
        DealStatus::ShipmentOnHold,
        DealStatus::Shipped,
        DealStatus::Closed,
        DealStatus::Canceled,
        DealStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::New => "new",
            DealStatus::InProgress => "in_progress",
            DealStatus::WaitingStockConfirmation => "waiting_stock_confirmation",
            DealStatus::StockConfirmed => "stock_confirmed",
            DealStatus::FinanceApproved => "finance_approved",
            DealStatus::AdminApproved => "admin_approved",
            DealStatus::ReadyForShipment => "ready_for_shipment",
            DealStatus::ShipmentOnHold => "shipment_on_hold",
            DealStatus::Shipped => "shipped",
            DealStatus::Closed => "closed",
            DealStatus::Canceled => "canceled",
            DealStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "new" => Some(DealStatus::New),
            "in_progress" => Some(DealStatus::InProgress),
            "waiting_stock_confirmation" => Some(DealStatus::WaitingStockConfirmation),
            "stock_confirmed" => Some(DealStatus::StockConfirmed),
            "finance_approved" => Some(DealStatus::FinanceApproved),
            "admin_approved" => Some(DealStatus::AdminApproved),
            "ready_for_shipment" => Some(DealStatus::ReadyForShipment),
            "shipment_on_hold" => Some(DealStatus::ShipmentOnHold),
            "shipped" => Some(DealStatus::Shipped),
            "closed" => Some(DealStatus::Closed),
            "canceled" => Some(DealStatus::Canceled),
            "rejected" => Some(DealStatus::Rejected),
            _ => None,
        }
    }

    /// Statuses reachable from this one. The transition table.
    pub fn allowed_targets(&self) -> &'static [DealStatus] {
        match self {
            DealStatus::New => &[DealStatus::InProgress, DealStatus::Canceled],
            DealStatus::InProgress => {
                &[DealStatus::WaitingStockConfirmation, DealStatus::Canceled]
            }
            DealStatus::WaitingStockConfirmation => {
                &[DealStatus::StockConfirmed, DealStatus::Canceled]
            }
            DealStatus::StockConfirmed => &[
                DealStatus::FinanceApproved,
                DealStatus::Rejected,
                DealStatus::Canceled,
            ],
            DealStatus::FinanceApproved => &[DealStatus::AdminApproved, DealStatus::Canceled],
            DealStatus::AdminApproved => &[DealStatus::ReadyForShipment, DealStatus::Canceled],
            DealStatus::ReadyForShipment => &[
                DealStatus::Shipped,
                DealStatus::ShipmentOnHold,
                DealStatus::Canceled,
            ],
            DealStatus::ShipmentOnHold => {
                &[DealStatus::ReadyForShipment, DealStatus::Canceled]
            }
            DealStatus::Shipped => &[DealStatus::Closed],
            DealStatus::Closed => &[],
            DealStatus::Canceled => &[],
            DealStatus::Rejected => &[DealStatus::InProgress],
        }
    }

    pub fn can_transition_to(&self, target: DealStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Terminal statuses have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }

    pub fn can_cancel(&self) -> bool {
        self.can_transition_to(DealStatus::Canceled)
    }

    /// Permission required to take the edge `self -> target`.
    ///
    /// Returns `None` for edges that are not in the transition table at all;
    /// legality and authorization are checked separately so an illegal
    /// transition is reported as such rather than as a permission failure.
    pub fn transition_permission(&self, target: DealStatus) -> Option<(Resource, Action)> {
        if !self.can_transition_to(target) {
            return None;
        }
        let action = match (self, target) {
            (_, DealStatus::Canceled) => Action::Cancel,
            (DealStatus::New, DealStatus::InProgress) => Action::Edit,
            (DealStatus::InProgress, DealStatus::WaitingStockConfirmation) => Action::Edit,
            (DealStatus::WaitingStockConfirmation, DealStatus::StockConfirmed) => {
                Action::StockConfirm
            }
            (DealStatus::StockConfirmed, DealStatus::FinanceApproved) => Action::FinanceApprove,
            (DealStatus::StockConfirmed, DealStatus::Rejected) => Action::FinanceApprove,
            (DealStatus::FinanceApproved, DealStatus::AdminApproved) => Action::AdminApprove,
            (DealStatus::AdminApproved, DealStatus::ReadyForShipment) => Action::AdminApprove,
            (DealStatus::ReadyForShipment, DealStatus::Shipped) => Action::ConfirmShipment,
            (DealStatus::ReadyForShipment, DealStatus::ShipmentOnHold) => Action::ConfirmShipment,
            (DealStatus::ShipmentOnHold, DealStatus::ReadyForShipment) => Action::ConfirmShipment,
            (DealStatus::Shipped, DealStatus::Closed) => Action::Close,
            (DealStatus::Rejected, DealStatus::InProgress) => Action::Edit,
            _ => return None,
        };
        Some((Resource::Deal, action))
    }

    /// Permission that moves a deal forward out of this status.
    ///
    /// Used for role-scoped queue views: a deal is "waiting for" whoever
    /// holds this permission.
    pub fn gate_permission(&self) -> Option<(Resource, Action)> {
        let action = match self {
            DealStatus::New | DealStatus::InProgress | DealStatus::Rejected => Action::Edit,
            DealStatus::WaitingStockConfirmation => Action::StockConfirm,
            DealStatus::StockConfirmed => Action::FinanceApprove,
            DealStatus::FinanceApproved | DealStatus::AdminApproved => Action::AdminApprove,
            DealStatus::ReadyForShipment | DealStatus::ShipmentOnHold => Action::ConfirmShipment,
            DealStatus::Shipped => Action::Close,
            DealStatus::Closed | DealStatus::Canceled => return None,
        };
        Some((Resource::Deal, action))
    }
}

impl std::fmt::Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment terms agreed for a deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Full,
    Partial,
    Debt,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Full => "full",
            PaymentType::Partial => "partial",
            PaymentType::Debt => "debt",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "full" => Some(PaymentType::Full),
            "partial" => Some(PaymentType::Partial),
            "debt" => Some(PaymentType::Debt),
            _ => None,
        }
    }
}

/// Derived settlement state of a deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "partial" => Some(PaymentStatus::Partial),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

/// Derive the settlement state from the running paid total.
///
/// `amount` is the gross line total; the payable target is
/// `amount - discount`. Overpayment still reads as paid.
pub fn derive_payment_status(
    paid_amount: Decimal,
    amount: Decimal,
    discount: Decimal,
) -> PaymentStatus {
    let net = amount - discount;
    if paid_amount >= net && net > Decimal::ZERO {
        PaymentStatus::Paid
    } else if paid_amount > Decimal::ZERO {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Unpaid
    }
}

/// A sales deal moving through the approval/fulfillment workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: Uuid,
    pub title: String,
    pub status: DealStatus,
    /// Gross line total: Σ(requested_qty × price) across items
    pub amount: Decimal,
    pub discount: Decimal,
    pub client_id: Uuid,
    pub manager_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub payment_type: PaymentType,
    pub paid_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub due_date: Option<NaiveDate>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One product line within a deal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealItem {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub product_id: Uuid,
    /// Manager's free-text ask ("need 20 rolls by Friday")
    pub request_comment: String,
    /// Warehouse's free-text availability reply
    pub warehouse_comment: Option<String>,
    /// Null until the pricing step at stock_confirmed
    pub requested_qty: Option<i32>,
    pub price: Option<Decimal>,
    pub confirmed_by: Option<Uuid>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Gross deal amount: sum of `requested_qty × price` over priced items
pub fn deal_amount(items: &[DealItem]) -> Decimal {
    items
        .iter()
        .filter_map(|item| {
            let qty = item.requested_qty?;
            let price = item.price?;
            Some(price * Decimal::from(qty))
        })
        .sum()
}

/// True when every item has been priced (quantity and price set)
pub fn items_fully_priced(items: &[DealItem]) -> bool {
    items
        .iter()
        .all(|item| item.requested_qty.is_some() && item.price.is_some())
}

/// True when every item carries a warehouse reply
pub fn items_stock_confirmed(items: &[DealItem]) -> bool {
    items.iter().all(|item| item.warehouse_comment.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn happy_path_is_legal() {
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
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for target in DealStatus::ALL {
            assert!(!DealStatus::Closed.can_transition_to(target));
            assert!(!DealStatus::Canceled.can_transition_to(target));
        }
        assert!(DealStatus::Closed.is_terminal());
        assert!(DealStatus::Canceled.is_terminal());
    }

    #[test]
    fn skipping_stages_is_illegal() {
        assert!(!DealStatus::New.can_transition_to(DealStatus::StockConfirmed));
        assert!(!DealStatus::InProgress.can_transition_to(DealStatus::FinanceApproved));
        assert!(!DealStatus::StockConfirmed.can_transition_to(DealStatus::AdminApproved));
        assert!(!DealStatus::FinanceApproved.can_transition_to(DealStatus::Shipped));
        // no going backwards on the happy path
        assert!(!DealStatus::FinanceApproved.can_transition_to(DealStatus::StockConfirmed));
        assert!(!DealStatus::Shipped.can_transition_to(DealStatus::ReadyForShipment));
    }

    #[test]
    fn cancel_excludes_rejected_shipped_and_terminals() {
        assert!(DealStatus::New.can_cancel());
        assert!(DealStatus::InProgress.can_cancel());
        assert!(DealStatus::StockConfirmed.can_cancel());
        assert!(DealStatus::ShipmentOnHold.can_cancel());
        assert!(!DealStatus::Rejected.can_cancel());
        assert!(!DealStatus::Shipped.can_cancel());
        assert!(!DealStatus::Closed.can_cancel());
        assert!(!DealStatus::Canceled.can_cancel());
    }

    #[test]
    fn rejected_deals_can_be_reworked() {
        assert!(DealStatus::Rejected.can_transition_to(DealStatus::InProgress));
        assert!(!DealStatus::Rejected.can_transition_to(DealStatus::StockConfirmed));
    }

    #[test]
    fn hold_and_release_round_trip() {
        assert!(DealStatus::ReadyForShipment.can_transition_to(DealStatus::ShipmentOnHold));
        assert!(DealStatus::ShipmentOnHold.can_transition_to(DealStatus::ReadyForShipment));
        assert!(!DealStatus::ShipmentOnHold.can_transition_to(DealStatus::Shipped));
    }

    #[test]
    fn every_legal_edge_names_a_permission() {
        for from in DealStatus::ALL {
            for to in DealStatus::ALL {
                if from.can_transition_to(to) {
                    assert!(
                        from.transition_permission(to).is_some(),
                        "edge {} -> {} has no permission",
                        from,
                        to
                    );
                } else {
                    assert!(from.transition_permission(to).is_none());
                }
            }
        }
    }

    #[test]
    fn gates_match_the_role_that_advances_each_status() {
        assert_eq!(
            DealStatus::WaitingStockConfirmation.gate_permission(),
            Some((Resource::Deal, Action::StockConfirm))
        );
        assert_eq!(
            DealStatus::StockConfirmed.gate_permission(),
            Some((Resource::Deal, Action::FinanceApprove))
        );
        assert_eq!(
            DealStatus::Shipped.gate_permission(),
            Some((Resource::Deal, Action::Close))
        );
        assert_eq!(DealStatus::Closed.gate_permission(), None);
        assert_eq!(DealStatus::Canceled.gate_permission(), None);
    }

    #[test]
    fn status_strings_round_trip() {
        for status in DealStatus::ALL {
            assert_eq!(DealStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(DealStatus::from_str("shipped?"), None);
    }

    #[test]
    fn amount_sums_priced_items_only() {
        let deal_id = Uuid::new_v4();
        let mut items = vec![
            item(deal_id, Some(10), Some(dec("1000"))),
            item(deal_id, Some(5), Some(dec("2000"))),
        ];
        assert_eq!(deal_amount(&items), dec("20000"));
        assert!(items_fully_priced(&items));

        items.push(item(deal_id, None, None));
        assert_eq!(deal_amount(&items), dec("20000"));
        assert!(!items_fully_priced(&items));
    }

    #[test]
    fn stock_confirmation_needs_every_item_answered() {
        let deal_id = Uuid::new_v4();
        let mut items = vec![item(deal_id, None, None), item(deal_id, None, None)];
        assert!(!items_stock_confirmed(&items));

        items[0].warehouse_comment = Some("in stock".to_string());
        assert!(!items_stock_confirmed(&items));

        items[1].warehouse_comment = Some("2 rolls short".to_string());
        assert!(items_stock_confirmed(&items));
    }

    #[test]
    fn payment_status_thresholds() {
        let amount = dec("100000");
        let none = Decimal::ZERO;
        assert_eq!(
            derive_payment_status(Decimal::ZERO, amount, none),
            PaymentStatus::Unpaid
        );
        assert_eq!(
            derive_payment_status(dec("40000"), amount, none),
            PaymentStatus::Partial
        );
        assert_eq!(
            derive_payment_status(dec("100000"), amount, none),
            PaymentStatus::Paid
        );
        // overpayment still reads as paid
        assert_eq!(
            derive_payment_status(dec("120000"), amount, none),
            PaymentStatus::Paid
        );
        // discount lowers the payable target
        assert_eq!(
            derive_payment_status(dec("90000"), amount, dec("10000")),
            PaymentStatus::Paid
        );
    }

    fn item(deal_id: Uuid, qty: Option<i32>, price: Option<Decimal>) -> DealItem {
        DealItem {
            id: Uuid::new_v4(),
            deal_id,
            product_id: Uuid::new_v4(),
            request_comment: "request".to_string(),
            warehouse_comment: None,
            requested_qty: qty,
            price,
            confirmed_by: None,
            confirmed_at: None,
            created_at: Utc::now(),
        }
    }
}
