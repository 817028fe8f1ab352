//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog item (paper, ink, plates, spare parts)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    /// Unique stock-keeping unit, e.g. "PPR-A4-80"
    pub sku: String,
    pub name: String,
    /// Sales unit: "pcs", "roll", "ream", "litre"
    pub unit: String,
    /// Cached aggregate of the movement ledger; never mutated directly
    pub stock: i32,
    /// Low-stock threshold for the restocking view
    pub min_stock: i32,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.stock < self.min_stock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_stock_is_strictly_below_threshold() {
        let mut product = Product {
            id: Uuid::new_v4(),
            sku: "PPR-A4-80".to_string(),
            name: "Offset paper A4 80g".to_string(),
            unit: "ream".to_string(),
            stock: 10,
            min_stock: 10,
            purchase_price: Decimal::ZERO,
            sale_price: Decimal::ZERO,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!product.is_low_stock());
        product.stock = 9;
        assert!(product.is_low_stock());
    }
}
