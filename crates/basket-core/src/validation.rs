//! # Validation Module
//!
//! Checks applied to catalog records before they are served to the cart.
//!
//! Cart mutations themselves are total and never validated: quantities are
//! normalized by the reducer instead (see [`crate::cart`]).
//!
//! ## Usage
//! ```rust
//! use basket_core::validation::{validate_product_id, validate_price_cents};
//!
//! validate_product_id("apple-1").unwrap();
//! assert!(validate_price_cents(-100).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::CatalogProduct;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_PRODUCT_ID_LEN: usize = 64;
const MAX_PRODUCT_NAME_LEN: usize = 200;

/// Validates a product identifier.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most 64 characters
pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "product id".to_string(),
        });
    }

    if id.len() > MAX_PRODUCT_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "product id".to_string(),
            max: MAX_PRODUCT_ID_LEN,
        });
    }

    Ok(())
}

/// Validates a product name.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > MAX_PRODUCT_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_PRODUCT_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a whole catalog record.
pub fn validate_catalog_product(product: &CatalogProduct) -> ValidationResult<()> {
    validate_product_id(&product.id)?;
    validate_product_name(&product.name)?;
    validate_price_cents(product.price_cents)
}

// =============================================================================
// Unit Tests
// =============================================================================
