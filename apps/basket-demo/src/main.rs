//! # Basket Demo
//!
//! A scripted cart session against the simulated checkout endpoint.
//!
//! ## Session
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Load config (basket.toml, BASKET_* overrides)                       │
//! │  2. Init tracing (RUST_LOG or logging.filter)                           │
//! │  3. Build store: sample catalog + simulated checkout                    │
//! │  4. Fill cart, print view and totals                                    │
//! │  5. Check out, add an item while the call is in flight                  │
//! │  6. Await the outcome, print what is left in the cart                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `basket-demo [path/to/basket.toml]`

use std::path::PathBuf;
use std::sync::Arc;

use basket_core::{InMemoryCatalog, Money};
use basket_store::{init_tracing, CartStore, CartStoreBuilder, StoreConfig, TracingEmitter};
use tracing::info;

const SAMPLE_CATALOG: &str = r#"[
    { "id": "A", "name": "Apple", "price_cents": 200 },
    { "id": "B", "name": "Bread", "price_cents": 350 },
    { "id": "C", "name": "Coffee beans", "price_cents": 1299 }
]"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = StoreConfig::load(config_path)?;

    init_tracing(&config.logging.filter)?;

    info!(
        missing_product = %config.pricing.missing_product,
        checkout_policy = %config.checkout.concurrency,
        outcome = %config.simulator.outcome,
        latency_ms = config.simulator.latency_ms,
        "Configuration loaded"
    );

    let catalog = InMemoryCatalog::from_json(SAMPLE_CATALOG)?;
    let store = CartStoreBuilder::from_config(&config)
        .with_catalog(Arc::new(catalog))
        .with_emitter(Arc::new(TracingEmitter))
        .build()?;

    store.add_item("A");
    store.add_item("A");
    store.add_item("B");
    store.set_quantity("C", 1);
    print_cart(&store)?;

    let handle = store.initiate_checkout();
    println!("checkout {} -> {}", handle.ticket(), store.checkout_status());

    // Lands after the snapshot, so it stays in the cart on success
    store.add_item("B");

    let outcome = handle.wait().await?;
    println!("outcome: {:?}", outcome);
    if !store.error_message().is_empty() {
        println!("error: {}", store.error_message());
    }
    print_cart(&store)?;

    Ok(())
}

fn print_cart(store: &CartStore) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&store.view())?);
    for line in store.line_totals()? {
        println!(
            "  {:<14} x{:<3} {:>8}",
            line.name.as_deref().unwrap_or(&line.id),
            line.quantity,
            Money::from_cents(line.line_total_cents).to_string()
        );
    }
    println!("  total: {} ({} items)", store.total_price()?, store.total_item_count());
    Ok(())
}
