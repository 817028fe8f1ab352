//! User, role and permission models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A staff account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fixed staff roles. Each workflow transition is gated by a permission
/// held by exactly one of these (admin aside).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Accountant,
    Warehouse,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Accountant => "accountant",
            Role::Warehouse => "warehouse",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "accountant" => Some(Role::Accountant),
            "warehouse" => Some(Role::Warehouse),
            _ => None,
        }
    }

    /// Permission strings granted to this role, in `resource:action` form
    pub fn permissions(&self) -> Vec<String> {
        role_permissions(*self)
            .iter()
            .map(|(resource, action)| permission_key(*resource, *action))
            .collect()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resources that can be accessed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Client,
    Contract,
    Product,
    Inventory,
    Deal,
    Payment,
    Shipment,
    Audit,
    User,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Client => "client",
            Resource::Contract => "contract",
            Resource::Product => "product",
            Resource::Inventory => "inventory",
            Resource::Deal => "deal",
            Resource::Payment => "payment",
            Resource::Shipment => "shipment",
            Resource::Audit => "audit",
            Resource::User => "user",
        }
    }
}

/// Actions that can be performed on resources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Archive,
    Cancel,
    Close,
    StockConfirm,
    FinanceApprove,
    AdminApprove,
    ConfirmShipment,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Archive => "archive",
            Action::Cancel => "cancel",
            Action::Close => "close",
            Action::StockConfirm => "stock_confirm",
            Action::FinanceApprove => "finance_approve",
            Action::AdminApprove => "admin_approve",
            Action::ConfirmShipment => "confirm_shipment",
        }
    }
}

/// Permission string checked by the auth middleware: `deal:finance_approve`
pub fn permission_key(resource: Resource, action: Action) -> String {
    format!("{}:{}", resource.as_str(), action.as_str())
}

/// Role/permission table.
///
/// Each approval step belongs to one role; admin carries the final sign-offs
/// plus registry management, not the other roles' gates.
fn role_permissions(role: Role) -> &'static [(Resource, Action)] {
    use Action::*;
    use Resource::*;
    match role {
        Role::Admin => &[
            (Client, View),
            (Client, Create),
            (Client, Edit),
            (Client, Archive),
            (Contract, View),
            (Contract, Create),
            (Contract, Edit),
            (Product, View),
            (Product, Create),
            (Product, Edit),
            (Inventory, View),
            (Inventory, Create),
            (Deal, View),
            (Deal, Create),
            (Deal, Cancel),
            (Deal, Close),
            (Deal, AdminApprove),
            (Payment, View),
            (Shipment, View),
            (Audit, View),
            (User, View),
            (User, Create),
            (User, Edit),
        ],
        Role::Manager => &[
            (Client, View),
            (Client, Create),
            (Client, Edit),
            (Client, Archive),
            (Contract, View),
            (Contract, Create),
            (Contract, Edit),
            (Product, View),
            (Inventory, View),
            (Deal, View),
            (Deal, Create),
            (Deal, Edit),
            (Deal, Cancel),
            (Payment, View),
            (Shipment, View),
        ],
        Role::Accountant => &[
            (Client, View),
            (Contract, View),
            (Product, View),
            (Deal, View),
            (Deal, FinanceApprove),
            (Payment, View),
            (Payment, Create),
        ],
        Role::Warehouse => &[
            (Product, View),
            (Inventory, View),
            (Inventory, Create),
            (Deal, View),
            (Deal, StockConfirm),
            (Deal, ConfirmShipment),
            (Shipment, View),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_key_format() {
        assert_eq!(
            permission_key(Resource::Deal, Action::FinanceApprove),
            "deal:finance_approve"
        );
        assert_eq!(
            permission_key(Resource::Inventory, Action::Create),
            "inventory:create"
        );
    }

    #[test]
    fn each_workflow_gate_belongs_to_one_role() {
        let gates = [
            (Action::StockConfirm, Role::Warehouse),
            (Action::FinanceApprove, Role::Accountant),
            (Action::AdminApprove, Role::Admin),
            (Action::ConfirmShipment, Role::Warehouse),
            (Action::Close, Role::Admin),
        ];
        for (gate, owner) in gates {
            let key = permission_key(Resource::Deal, gate);
            for role in [Role::Admin, Role::Manager, Role::Accountant, Role::Warehouse] {
                let has = role.permissions().contains(&key);
                assert_eq!(
                    has,
                    role == owner,
                    "{} should be held by {} only",
                    key,
                    owner
                );
            }
        }
    }

    #[test]
    fn manager_and_admin_can_cancel() {
        let key = permission_key(Resource::Deal, Action::Cancel);
        assert!(Role::Manager.permissions().contains(&key));
        assert!(Role::Admin.permissions().contains(&key));
        assert!(!Role::Accountant.permissions().contains(&key));
        assert!(!Role::Warehouse.permissions().contains(&key));
    }

    #[test]
    fn role_strings_round_trip() {
        for role in [Role::Admin, Role::Manager, Role::Accountant, Role::Warehouse] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("driver"), None);
    }
}
