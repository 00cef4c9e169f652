//! # Domain Types
//!
//! Core domain types shared by the cart, the catalog and the store.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │ CatalogProduct  │   │ CheckoutStatus  │   │ ConcurrentCheckout- │   │
//! │  │  ─────────────  │   │  ─────────────  │   │ Policy              │   │
//! │  │  id             │   │  Ready          │   │  ─────────────────  │   │
//! │  │  name           │   │  Pending        │   │  LastResolutionWins │   │
//! │  │  price_cents    │   │  Failed         │   │  LatestInitiation-  │   │
//! │  └─────────────────┘   └─────────────────┘   │  Wins               │   │
//! │                                              └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

/// Product identifier as used by the catalog and the cart.
pub type ProductId = String;

/// Cart quantities are signed so that `set_quantity` can receive the
/// zero/negative values a UI may send; the reducer never stores them.
pub type Quantity = i64;

// =============================================================================
// Catalog Product
// =============================================================================

/// A product record from the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogProduct {
    /// Product identifier (the cart's key).
    pub id: ProductId,

    /// Display name.
    pub name: String,

    /// Unit price in cents.
    pub price_cents: i64,
}

impl CatalogProduct {
    /// Creates a catalog record.
    pub fn new(id: impl Into<String>, name: impl Into<String>, price_cents: i64) -> Self {
        CatalogProduct {
            id: id.into(),
            name: name.into(),
            price_cents,
        }
    }

    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Checkout Status
// =============================================================================

/// Where the cart is in the checkout lifecycle.
///
/// ## State Machine
/// ```text
///                 initiate
///   ┌───────┐ ───────────────► ┌─────────┐
///   │ Ready │                  │ Pending │ ◄──┐ initiate (again)
///   └───────┘ ◄─────────────── └─────────┘ ───┘
///       ▲       success             │
///       │       (snapshot cleared)  │ declined / fault
///       │                           ▼
///       │                      ┌────────┐
///       └───── late success ── │ Failed │
///                              └────────┘
///                                  │ initiate
///                                  └──────────► Pending
/// ```
///
/// A successful checkout is an *outcome*, not a status: it collapses back to
/// `Ready` immediately. `Failed` only reaches `Ready` directly when an older
/// checkout succeeds under `LastResolutionWins`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    /// Idle; the cart can be edited and checked out.
    #[default]
    Ready,
    /// A checkout call is in flight.
    Pending,
    /// The last checkout was declined or faulted.
    Failed,
}

impl fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutStatus::Ready => write!(f, "ready"),
            CheckoutStatus::Pending => write!(f, "pending"),
            CheckoutStatus::Failed => write!(f, "failed"),
        }
    }
}

// =============================================================================
// Concurrent Checkout Policy
// =============================================================================

/// What happens when checkout is initiated again before the previous call
/// resolved.
///
/// ## Policy Comparison
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  initiate #1 ──────────────┐                                            │
/// │       initiate #2 ─────┐   │                                            │
/// │                        ▼   │                                            │
/// │                  #2 resolves (declined)                                 │
/// │                            ▼                                            │
/// │                      #1 resolves (success)                              │
/// │                                                                         │
/// │  LAST_RESOLUTION_WINS (default)   │  LATEST_INITIATION_WINS             │
/// │  ─────────────────────────────    │  ──────────────────────             │
/// │  status ends Ready (#1 was last)  │  status ends Failed (#2 is latest)  │
/// │  #1 snapshot removed from cart    │  #1 snapshot still removed          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrentCheckoutPolicy {
    /// Every resolution is applied in arrival order.
    #[default]
    LastResolutionWins,

    /// Resolutions from superseded initiations never touch the status.
    LatestInitiationWins,
}

impl fmt::Display for ConcurrentCheckoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrentCheckoutPolicy::LastResolutionWins => write!(f, "last_resolution_wins"),
            ConcurrentCheckoutPolicy::LatestInitiationWins => {
                write!(f, "latest_initiation_wins")
            }
        }
    }
}

impl FromStr for ConcurrentCheckoutPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "last_resolution_wins" | "last_write_wins" | "last" => {
                Ok(ConcurrentCheckoutPolicy::LastResolutionWins)
            }
            "latest_initiation_wins" | "latest" | "discard_stale" => {
                Ok(ConcurrentCheckoutPolicy::LatestInitiationWins)
            }
            other => Err(ValidationError::InvalidFormat {
                field: "checkout policy".to_string(),
                reason: format!(
                    "unknown policy '{}', expected last_resolution_wins or latest_initiation_wins",
                    other
                ),
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
