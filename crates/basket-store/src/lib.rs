//! # basket-store: Cart Store & Checkout for Basket
//!
//! Wraps the pure `basket-core` reducer in a shared, thread-safe store and
//! runs the checkout call as a tokio task.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          basket-store                                   │
//! │                                                                         │
//! │   UI ──► CartStore::dispatch / add_item / set_quantity / remove_item   │
//! │            │                                                            │
//! │            ▼                                                            │
//! │   ┌──────────────────┐    emit     ┌──────────────────────┐            │
//! │   │ Mutex<CartState> │ ──────────► │ CartEventEmitter     │──► UI      │
//! │   └────────┬─────────┘             └──────────────────────┘            │
//! │            │ initiate_checkout                                          │
//! │            ▼                                                            │
//! │   ┌──────────────────┐  snapshot   ┌──────────────────────┐            │
//! │   │ checkout task    │ ──────────► │ CheckoutService      │            │
//! │   │ (tokio::spawn)   │ ◄────────── │ (remote / simulated) │            │
//! │   └──────────────────┘  receipt    └──────────────────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use basket_core::{CatalogProduct, InMemoryCatalog};
//! use basket_store::{CartStoreBuilder, StoreConfig};
//!
//! # async fn example() -> basket_store::StoreResult<()> {
//! let config = StoreConfig::load_or_default(None);
//! let catalog = InMemoryCatalog::from_products(vec![CatalogProduct::new("A", "Apple", 200)]);
//!
//! let store = CartStoreBuilder::from_config(&config)
//!     .with_catalog(Arc::new(catalog))
//!     .build()?;
//!
//! store.add_item("A");
//! let outcome = store.initiate_checkout().wait().await?;
//! println!("{:?} -> {}", outcome, store.checkout_status());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod service;
pub mod store;
pub mod telemetry;

pub use config::{
    CheckoutSettings, LoggingSettings, PricingSettings, SimulatorSettings, StoreConfig,
};
pub use error::{CheckoutFault, StoreError, StoreResult};
pub use events::{CartEventEmitter, NoOpEmitter, TracingEmitter};
pub use service::{CheckoutReceipt, CheckoutService, SimulatedCheckoutService, SimulatedOutcome};
pub use store::{CartStore, CartStoreBuilder, CheckoutHandle};
pub use telemetry::init_tracing;
