//! # Error Types
//!
//! Domain-specific error types for basket-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  basket-core errors (this file)                                        │
//! │  ├── CoreError        - Domain errors (pricing, overflow)              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  basket-store errors (separate crate)                                  │
//! │  ├── StoreError       - Config, runtime and task failures              │
//! │  └── CheckoutFault    - The checkout call itself failed                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cart mutations never fail, so none of these appear on the write path.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A cart line references a product the catalog doesn't know.
    ///
    /// ## When This Occurs
    /// - The catalog hasn't finished loading yet
    /// - A product was withdrawn while it sat in the cart
    ///
    /// Only surfaced under `MissingProductPolicy::Fail`.
    #[error("Product not in catalog: {0}")]
    ProductNotInCatalog(String),

    /// A catalog price is unusable (negative).
    #[error("Invalid price for {product_id}: {cents} cents")]
    InvalidPrice { product_id: String, cents: i64 },

    /// A line or running total no longer fits in `i64` cents.
    #[error("Cart total overflows at product {product_id}")]
    AmountOverflow { product_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g. a price with three decimals).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g. the same product id twice in one catalog load).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
