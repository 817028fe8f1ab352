//! Validation utilities for the Print Supply CRM

use rust_decimal::Decimal;

// ============================================================================
// Catalog & deal validations
// ============================================================================

/// Validate SKU format (3-32 chars, uppercase alphanumeric with dashes)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.len() < 3 || sku.len() > 32 {
        return Err("SKU must be 3-32 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("SKU must be uppercase alphanumeric with dashes");
    }
    Ok(())
}

/// Validate a unit quantity (stock movements, deal items)
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a unit price
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    Ok(())
}

/// Validate a deal discount against the gross amount
pub fn validate_discount(discount: Decimal, amount: Decimal) -> Result<(), &'static str> {
    if discount < Decimal::ZERO {
        return Err("Discount cannot be negative");
    }
    if discount > amount {
        return Err("Discount cannot exceed the deal amount");
    }
    Ok(())
}

/// Validate a payment amount; zero is meaningless, negatives are
/// offsetting corrections and allowed
pub fn validate_payment_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount == Decimal::ZERO {
        return Err("Payment amount cannot be zero");
    }
    Ok(())
}

// ============================================================================
// General validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate a non-empty trimmed string field
pub fn validate_required(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        Err("Field cannot be empty")
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn sku_rules() {
        assert!(validate_sku("PPR-A4-80").is_ok());
        assert!(validate_sku("INK9").is_ok());
        assert!(validate_sku("pp").is_err());
        assert!(validate_sku("lowercase-sku").is_err());
        assert!(validate_sku("HAS SPACE").is_err());
    }

    #[test]
    fn quantity_must_be_positive() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
    }

    #[test]
    fn discount_bounded_by_amount() {
        assert!(validate_discount(dec("0"), dec("100")).is_ok());
        assert!(validate_discount(dec("100"), dec("100")).is_ok());
        assert!(validate_discount(dec("101"), dec("100")).is_err());
        assert!(validate_discount(dec("-1"), dec("100")).is_err());
    }

    #[test]
    fn payment_amount_nonzero() {
        assert!(validate_payment_amount(dec("10")).is_ok());
        assert!(validate_payment_amount(dec("-10")).is_ok());
        assert!(validate_payment_amount(Decimal::ZERO).is_err());
    }

    #[test]
    fn email_basic_check() {
        assert!(validate_email("sales@printco.example").is_ok());
        assert!(validate_email("not-an-email").is_err());
    }
}
