//! # Derived Queries
//!
//! Values computed from the cart (and the catalog) rather than stored.
//!
//! ## Pure First, Cached Second
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  total_item_count(items)            ◄── pure, O(distinct ids)           │
//! │  total_price(items, catalog, policy) ◄── pure, one lookup per id        │
//! │  line_totals(items, catalog, policy) ◄── pure                           │
//! │                                                                         │
//! │  Memo<K, V>                                                             │
//! │  ──────────                                                             │
//! │  Single-entry cache: remembers the last (key, value). The store keys    │
//! │  it with items_version (+ catalog revision). A cache miss just calls    │
//! │  the pure function, so caching changes cost, never results.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use tracing::warn;
use ts_rs::TS;

use crate::cart::{CartItems, CartState};
use crate::catalog::ProductCatalog;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CheckoutStatus, ProductId, Quantity};

// =============================================================================
// Missing Product Policy
// =============================================================================

/// What pricing does with a cart line whose product isn't in the catalog.
///
/// The default follows the build: debug builds fail loudly so the gap is
/// noticed during development, release builds price the line at zero and
/// log a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingProductPolicy {
    /// Return `CoreError::ProductNotInCatalog`.
    Fail,
    /// Contribute nothing to the total.
    TreatAsZero,
}

impl Default for MissingProductPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            MissingProductPolicy::Fail
        } else {
            MissingProductPolicy::TreatAsZero
        }
    }
}

impl fmt::Display for MissingProductPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingProductPolicy::Fail => write!(f, "fail"),
            MissingProductPolicy::TreatAsZero => write!(f, "treat_as_zero"),
        }
    }
}

impl FromStr for MissingProductPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fail" | "error" | "strict" => Ok(MissingProductPolicy::Fail),
            "treat_as_zero" | "zero" | "lenient" => Ok(MissingProductPolicy::TreatAsZero),
            other => Err(ValidationError::InvalidFormat {
                field: "missing product policy".to_string(),
                reason: format!("unknown policy '{}', expected fail or treat_as_zero", other),
            }),
        }
    }
}

// =============================================================================
// Line Totals
// =============================================================================

/// One priced cart line, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineTotal {
    pub id: ProductId,
    /// `None` when the product is missing and priced at zero.
    pub name: Option<String>,
    pub quantity: Quantity,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

// =============================================================================
// Cart View
// =============================================================================

/// Everything a cart panel renders that doesn't need the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: CartItems,
    pub total_item_count: Quantity,
    pub checkout_status: CheckoutStatus,
    pub error_message: String,
}

/// Builds the read model for `state`.
pub fn cart_view(state: &CartState) -> CartView {
    CartView {
        items: state.items().clone(),
        total_item_count: total_item_count(state.items()),
        checkout_status: state.checkout_status(),
        error_message: state.error_message().to_string(),
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Sum of all quantities. An empty cart counts 0.
///
/// Saturates at `Quantity::MAX` rather than overflowing.
pub fn total_item_count(items: &CartItems) -> Quantity {
    items
        .iter()
        .fold(0, |count: Quantity, (_, qty)| count.saturating_add(qty))
}

/// Sum of `quantity × price` over the cart, formatted with exactly two
/// decimal places (`"7.50"`).
pub fn total_price<C>(
    items: &CartItems,
    catalog: &C,
    policy: MissingProductPolicy,
) -> CoreResult<String>
where
    C: ProductCatalog + ?Sized,
{
    total_amount(items, catalog, policy).map(|total| total.to_decimal_string())
}

/// Like [`total_price`] but returns the unformatted amount.
pub fn total_amount<C>(
    items: &CartItems,
    catalog: &C,
    policy: MissingProductPolicy,
) -> CoreResult<Money>
where
    C: ProductCatalog + ?Sized,
{
    let mut total = Money::zero();
    for (id, qty) in items.iter() {
        let (_, unit_price) = unit_price(id, catalog, policy)?;
        total = line_amount(id, unit_price, qty)?
            .checked_add(total)
            .ok_or_else(|| overflow(id))?;
    }
    Ok(total)
}

/// Per-line breakdown in product id order.
pub fn line_totals<C>(
    items: &CartItems,
    catalog: &C,
    policy: MissingProductPolicy,
) -> CoreResult<Vec<LineTotal>>
where
    C: ProductCatalog + ?Sized,
{
    items
        .iter()
        .map(|(id, qty)| {
            let (name, unit_price) = unit_price(id, catalog, policy)?;
            Ok(LineTotal {
                id: id.to_string(),
                name,
                quantity: qty,
                unit_price_cents: unit_price.cents(),
                line_total_cents: line_amount(id, unit_price, qty)?.cents(),
            })
        })
        .collect()
}

fn line_amount(id: &str, unit_price: Money, qty: Quantity) -> CoreResult<Money> {
    unit_price
        .checked_multiply_quantity(qty)
        .ok_or_else(|| overflow(id))
}

fn overflow(id: &str) -> CoreError {
    CoreError::AmountOverflow {
        product_id: id.to_string(),
    }
}

fn unit_price<C>(
    id: &str,
    catalog: &C,
    policy: MissingProductPolicy,
) -> CoreResult<(Option<String>, Money)>
where
    C: ProductCatalog + ?Sized,
{
    match catalog.get(id) {
        Some(product) if product.price_cents >= 0 => {
            let price = product.price();
            Ok((Some(product.name), price))
        }
        Some(product) => match policy {
            MissingProductPolicy::Fail => Err(CoreError::InvalidPrice {
                product_id: id.to_string(),
                cents: product.price_cents,
            }),
            MissingProductPolicy::TreatAsZero => {
                warn!(
                    product_id = %id,
                    cents = product.price_cents,
                    "Negative catalog price, pricing line at zero"
                );
                Ok((Some(product.name), Money::zero()))
            }
        },
        None => match policy {
            MissingProductPolicy::Fail => Err(CoreError::ProductNotInCatalog(id.to_string())),
            MissingProductPolicy::TreatAsZero => {
                warn!(product_id = %id, "Product missing from catalog, pricing line at zero");
                Ok((None, Money::zero()))
            }
        },
    }
}

// =============================================================================
// Memo
// =============================================================================

/// Single-entry cache keyed by a version value.
#[derive(Debug, Default)]
pub struct Memo<K, V> {
    slot: Mutex<Option<(K, V)>>,
}

impl<K, V> Memo<K, V>
where
    K: PartialEq + Copy,
    V: Clone,
{
    pub fn new() -> Self {
        Memo {
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached value for `key`, or computes and caches it.
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce() -> V) -> V {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_key, value)) = slot.as_ref() {
            if *cached_key == key {
                return value.clone();
            }
        }

        let value = compute();
        *slot = Some((key, value.clone()));
        value
    }

    /// Fallible variant: only successful values are cached, so an error is
    /// recomputed (and re-reported) on the next call.
    pub fn get_or_try_compute<E>(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_key, value)) = slot.as_ref() {
            if *cached_key == key {
                return Ok(value.clone());
            }
        }

        let value = compute()?;
        *slot = Some((key, value.clone()));
        Ok(value)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
