//! # basket-core: Pure Cart Logic for Basket
//!
//! This crate holds the cart's state, its mutation rules and its derived
//! values as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Basket Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Browser UI (external)                        │   │
//! │  │    Product list ──► Cart panel ──► Checkout button              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ CartAction / CartView                  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 basket-store (CartStore)                        │   │
//! │  │    dispatch, initiate_checkout, memoized totals                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ basket-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   cart    │  │ selectors │  │  catalog  │  │   money   │  │   │
//! │  │   │ CartState │  │ totals    │  │ Product   │  │   Money   │  │   │
//! │  │   │ reducer   │  │ Memo      │  │ Catalog   │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO TASKS                                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`cart`] - Cart items, checkout status and the reducer
//! - [`catalog`] - Product catalog contract and an in-memory implementation
//! - [`selectors`] - Derived queries (item count, total price) and `Memo`
//! - [`money`] - Money type with integer arithmetic
//! - [`types`] - Shared domain types
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation for catalog data
//!
//! ## Example Usage
//!
//! ```rust
//! use basket_core::cart::CartState;
//! use basket_core::catalog::InMemoryCatalog;
//! use basket_core::selectors::{total_price, MissingProductPolicy};
//! use basket_core::types::CatalogProduct;
//!
//! let catalog = InMemoryCatalog::from_products(vec![
//!     CatalogProduct::new("A", "Apple", 200),
//!     CatalogProduct::new("B", "Bread", 350),
//! ]);
//!
//! let mut state = CartState::new();
//! state.add_item("A");
//! state.add_item("A");
//! state.add_item("B");
//!
//! let total = total_price(state.items(), &catalog, MissingProductPolicy::Fail).unwrap();
//! assert_eq!(total, "7.50");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod selectors;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{CartAction, CartItems, CartSnapshot, CartState, CheckoutOutcome, Resolution};
pub use catalog::{InMemoryCatalog, ProductCatalog};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use selectors::{CartView, LineTotal, Memo, MissingProductPolicy};
pub use types::*;
