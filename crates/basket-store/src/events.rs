//! # Cart Events
//!
//! Change notifications for whatever renders the cart. The store calls the
//! emitter after every state change, outside its lock, so an emitter may
//! read the store back without deadlocking.

use basket_core::{CartItems, CheckoutStatus};
use tracing::trace;

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Receives cart change notifications (implemented by the UI bridge).
///
/// ## Ordering
/// Events are sent after the state lock is released. Two mutations racing
/// on different threads can therefore deliver their events in either order.
/// `items_version` increases by one per change, so a consumer keeps the
/// highest version it has seen and drops any event carrying a lower one.
pub trait CartEventEmitter: Send + Sync {
    /// The set of items changed. `items` is the full set at `items_version`.
    fn emit_items_changed(&self, items: &CartItems, items_version: u64);

    /// The checkout status or error message changed.
    fn emit_checkout_status(&self, status: CheckoutStatus, error_message: &str);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl CartEventEmitter for NoOpEmitter {
    fn emit_items_changed(&self, _items: &CartItems, _items_version: u64) {}
    fn emit_checkout_status(&self, _status: CheckoutStatus, _error_message: &str) {}
}

/// Writes every event to the trace log.
pub struct TracingEmitter;

impl CartEventEmitter for TracingEmitter {
    fn emit_items_changed(&self, items: &CartItems, items_version: u64) {
        trace!(items = items.len(), items_version, "cart items changed");
    }

    fn emit_checkout_status(&self, status: CheckoutStatus, error_message: &str) {
        trace!(%status, error_message, "checkout status changed");
    }
}
