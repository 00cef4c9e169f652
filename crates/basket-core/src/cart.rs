//! # Cart State
//!
//! The cart's contents, its checkout status and the reducer that changes
//! them. Everything here is synchronous and deterministic; the store crate
//! decides *when* a checkout resolves, this module decides *what* that does.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart State Operations                                │
//! │                                                                         │
//! │  UI Intent              CartAction / call          State Change         │
//! │  ─────────              ─────────────────          ────────────         │
//! │                                                                         │
//! │  Click product ───────► AddItem { id } ──────────► items[id] += 1       │
//! │                                                                         │
//! │  Edit quantity ───────► SetQuantity { id, q } ───► items[id] = q        │
//! │                                                    (q <= 0 removes)     │
//! │                                                                         │
//! │  Click remove ────────► RemoveItem { id } ───────► items.remove(id)     │
//! │                                                                         │
//! │  Click checkout ──────► begin_checkout() ────────► Pending + snapshot   │
//! │                                                                         │
//! │  Service answers ─────► resolve_checkout() ──────► Ready / Failed       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Every stored quantity is >= 1; zero or negative quantities are never
//!   retained.
//! - `error_message` is empty unless the status is `Failed`.
//! - `items_version` changes whenever `items` does, and only then.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::types::{CheckoutStatus, ConcurrentCheckoutPolicy, ProductId, Quantity};

// =============================================================================
// Cart Items
// =============================================================================

/// Product id → quantity, ordered by id so iteration (and therefore the
/// payload sent to the checkout service) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(transparent)]
pub struct CartItems(BTreeMap<ProductId, Quantity>);

impl CartItems {
    /// Creates an empty set of items.
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantity recorded for `id`, if any.
    pub fn get(&self, id: &str) -> Option<Quantity> {
        self.0.get(id).copied()
    }

    /// Number of distinct products.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(id, quantity)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Quantity)> + '_ {
        self.0.iter().map(|(id, qty)| (id.as_str(), *qty))
    }

    /// Adds one, saturating at `Quantity::MAX`. Returns whether the
    /// quantity moved.
    fn increment(&mut self, id: &str) -> bool {
        let qty = self.0.entry(id.to_string()).or_insert(0);
        let next = qty.saturating_add(1);
        let changed = next != *qty;
        *qty = next;
        changed
    }

    fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id).is_some()
    }

    /// Stores `quantity`, or removes the entry when it is not positive.
    fn set_clamped(&mut self, id: &str, quantity: Quantity) -> bool {
        if quantity <= 0 {
            return self.remove(id);
        }

        match self.0.insert(id.to_string(), quantity) {
            Some(previous) => previous != quantity,
            None => true,
        }
    }

    /// Takes the quantities in `other` out of `self`, dropping entries that
    /// reach zero. Quantities added on top of `other` survive.
    fn subtract(&mut self, other: &CartItems) -> bool {
        let mut changed = false;

        for (id, taken) in other.iter() {
            if let Some(live) = self.0.get(id).copied() {
                changed = true;
                let remaining = live - taken;
                if remaining <= 0 {
                    self.0.remove(id);
                } else {
                    self.0.insert(id.to_string(), remaining);
                }
            }
        }

        changed
    }
}

impl<I: Into<ProductId>> FromIterator<(I, Quantity)> for CartItems {
    /// Collects pairs, applying the same clamp as `set_quantity`.
    fn from_iter<T: IntoIterator<Item = (I, Quantity)>>(iter: T) -> Self {
        let mut items = CartItems::new();
        for (id, qty) in iter {
            items.set_clamped(&id.into(), qty);
        }
        items
    }
}

// =============================================================================
// Actions
// =============================================================================

/// A cart intent as sent by the UI layer.
///
/// ## Wire Format
/// ```json
/// { "type": "add_item", "id": "A" }
/// { "type": "remove_item", "id": "A" }
/// { "type": "set_quantity", "id": "A", "quantity": 3 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartAction {
    AddItem { id: ProductId },
    RemoveItem { id: ProductId },
    SetQuantity { id: ProductId, quantity: Quantity },
}

// =============================================================================
// Checkout Snapshot & Outcome
// =============================================================================

/// Immutable copy of the items taken when a checkout starts.
///
/// The snapshot is what gets submitted, and on success it is exactly what
/// gets removed from the live cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSnapshot {
    /// Initiation counter value for this checkout.
    pub generation: u64,

    /// Correlates log lines for one checkout.
    pub ticket: Uuid,

    /// Items at initiation time.
    pub items: CartItems,

    /// When the checkout was initiated.
    pub initiated_at: DateTime<Utc>,
}

/// How a checkout call ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// The service accepted the order.
    Succeeded,

    /// The service answered with `success: false`.
    Declined,

    /// The call itself failed; `message` may be empty.
    Faulted { message: String },
}

/// What a resolution did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolution {
    /// The resolution belongs to a superseded initiation.
    pub stale: bool,

    /// Status or error message changed.
    pub status_changed: bool,

    /// Items changed (a success removed its snapshot).
    pub items_changed: bool,
}

// =============================================================================
// Cart State
// =============================================================================

/// The cart: items plus checkout lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    items: CartItems,
    checkout_status: CheckoutStatus,
    error_message: String,
    items_version: u64,
    checkout_generation: u64,
    policy: ConcurrentCheckoutPolicy,
}

impl CartState {
    /// Creates an empty, `Ready` cart with the default checkout policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cart using `policy` for overlapping checkouts.
    pub fn with_policy(policy: ConcurrentCheckoutPolicy) -> Self {
        CartState {
            policy,
            ..Self::default()
        }
    }

    pub fn items(&self) -> &CartItems {
        &self.items
    }

    pub fn checkout_status(&self) -> CheckoutStatus {
        self.checkout_status
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Bumped on every change to `items`.
    pub fn items_version(&self) -> u64 {
        self.items_version
    }

    /// Number of checkouts initiated so far.
    pub fn checkout_generation(&self) -> u64 {
        self.checkout_generation
    }

    pub fn policy(&self) -> ConcurrentCheckoutPolicy {
        self.policy
    }

    // =========================================================================
    // Mutations
    // =========================================================================
    // Each returns whether `items` changed.

    /// Adds one of `id`, starting from 1 if absent. A quantity already at
    /// `Quantity::MAX` stays there.
    pub fn add_item(&mut self, id: &str) -> bool {
        let changed = self.items.increment(id);
        self.touch_items(changed)
    }

    /// Removes `id` entirely. Absent ids are a no-op.
    pub fn remove_item(&mut self, id: &str) -> bool {
        let changed = self.items.remove(id);
        self.touch_items(changed)
    }

    /// Sets the quantity of `id`.
    ///
    /// A quantity of zero or less removes the product instead of storing a
    /// value that would break the positive-quantity invariant.
    pub fn set_quantity(&mut self, id: &str, quantity: Quantity) -> bool {
        let changed = self.items.set_clamped(id, quantity);
        self.touch_items(changed)
    }

    /// Applies a UI action.
    pub fn apply(&mut self, action: &CartAction) -> bool {
        match action {
            CartAction::AddItem { id } => self.add_item(id),
            CartAction::RemoveItem { id } => self.remove_item(id),
            CartAction::SetQuantity { id, quantity } => self.set_quantity(id, *quantity),
        }
    }

    fn touch_items(&mut self, changed: bool) -> bool {
        if changed {
            self.items_version += 1;
        }
        changed
    }

    // =========================================================================
    // Checkout Transitions
    // =========================================================================

    /// Moves to `Pending` and captures the snapshot to submit.
    ///
    /// Legal from every status, including `Pending`: a second initiation
    /// starts another checkout without cancelling the first.
    pub fn begin_checkout(&mut self, ticket: Uuid, initiated_at: DateTime<Utc>) -> CartSnapshot {
        self.checkout_generation += 1;
        self.checkout_status = CheckoutStatus::Pending;
        self.error_message.clear();

        CartSnapshot {
            generation: self.checkout_generation,
            ticket,
            items: self.items.clone(),
            initiated_at,
        }
    }

    /// Applies the outcome of the checkout that produced `snapshot`.
    ///
    /// ## Effects
    /// ```text
    /// Succeeded ──► snapshot removed from items, status Ready, message ""
    /// Declined  ──► status Failed, message ""
    /// Faulted   ──► status Failed, message = fault description
    /// ```
    ///
    /// Under `LatestInitiationWins` a stale resolution leaves status and
    /// message alone; a stale success still removes its snapshot.
    pub fn resolve_checkout(
        &mut self,
        snapshot: &CartSnapshot,
        outcome: &CheckoutOutcome,
    ) -> Resolution {
        let stale = snapshot.generation != self.checkout_generation;

        let items_changed = match outcome {
            CheckoutOutcome::Succeeded => {
                let changed = self.items.subtract(&snapshot.items);
                self.touch_items(changed)
            }
            CheckoutOutcome::Declined | CheckoutOutcome::Faulted { .. } => false,
        };

        let applies_status = !stale || self.policy == ConcurrentCheckoutPolicy::LastResolutionWins;

        let mut status_changed = false;
        if applies_status {
            let (status, message) = match outcome {
                CheckoutOutcome::Succeeded => (CheckoutStatus::Ready, ""),
                CheckoutOutcome::Declined => (CheckoutStatus::Failed, ""),
                CheckoutOutcome::Faulted { message } => (CheckoutStatus::Failed, message.as_str()),
            };

            status_changed = self.checkout_status != status || self.error_message != message;
            self.checkout_status = status;
            self.error_message = message.to_string();
        }

        Resolution {
            stale,
            status_changed,
            items_changed,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors;
    use proptest::prelude::*;

    fn begin(state: &mut CartState) -> CartSnapshot {
        state.begin_checkout(Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn test_add_item_twice_yields_two() {
        let mut state = CartState::new();
        state.add_item("A");
        state.add_item("A");

        assert_eq!(state.items().get("A"), Some(2));
        assert_eq!(state.items().len(), 1);
    }

    #[test]
    fn test_add_item_saturates_at_max() {
        let mut state = CartState::new();
        state.set_quantity("A", Quantity::MAX);
        let version = state.items_version();

        assert!(!state.add_item("A"));
        assert_eq!(state.items().get("A"), Some(Quantity::MAX));
        assert_eq!(state.items_version(), version);
    }

    #[test]
    fn test_remove_absent_item_is_noop() {
        let mut state = CartState::new();
        state.add_item("A");
        let before = state.clone();

        assert!(!state.remove_item("Z"));
        assert_eq!(state, before);
    }

    #[test]
    fn test_remove_item_deletes_whole_line() {
        let mut state = CartState::new();
        state.set_quantity("A", 5);

        assert!(state.remove_item("A"));
        assert!(state.items().is_empty());
    }

    #[test]
    fn test_set_quantity_non_positive_removes() {
        let mut state = CartState::new();
        state.set_quantity("A", 4);
        state.set_quantity("B", 1);

        assert!(state.set_quantity("A", 0));
        assert!(state.set_quantity("B", -3));
        assert!(state.items().is_empty());

        // Nothing to remove, nothing stored
        assert!(!state.set_quantity("C", -1));
        assert_eq!(state.items().get("C"), None);
    }

    #[test]
    fn test_set_quantity_same_value_keeps_version() {
        let mut state = CartState::new();
        state.set_quantity("A", 3);
        let version = state.items_version();

        assert!(!state.set_quantity("A", 3));
        assert_eq!(state.items_version(), version);

        assert!(state.set_quantity("A", 7));
        assert_eq!(state.items_version(), version + 1);
    }

    #[test]
    fn test_quantities_stay_positive_across_mixed_sequences() {
        let mut state = CartState::new();
        let actions = vec![
            CartAction::AddItem { id: "A".into() },
            CartAction::AddItem { id: "B".into() },
            CartAction::SetQuantity {
                id: "A".into(),
                quantity: -2,
            },
            CartAction::AddItem { id: "A".into() },
            CartAction::SetQuantity {
                id: "C".into(),
                quantity: 4,
            },
            CartAction::RemoveItem { id: "B".into() },
            CartAction::AddItem { id: "C".into() },
            CartAction::SetQuantity {
                id: "D".into(),
                quantity: 0,
            },
        ];

        for action in &actions {
            state.apply(action);
        }

        assert!(state.items().iter().all(|(_, qty)| qty >= 1));
        assert_eq!(state.items().get("A"), Some(1));
        assert_eq!(state.items().get("B"), None);
        assert_eq!(state.items().get("C"), Some(5));
        assert_eq!(state.items().get("D"), None);
    }

    fn action_strategy() -> impl Strategy<Value = CartAction> {
        let id = "[A-D]";
        prop_oneof![
            3 => id.prop_map(|id| CartAction::AddItem { id }),
            1 => id.prop_map(|id| CartAction::RemoveItem { id }),
            2 => (id, -3i64..10)
                .prop_map(|(id, quantity)| CartAction::SetQuantity { id, quantity }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn quantities_stay_positive(actions in prop::collection::vec(action_strategy(), 0..64)) {
            let mut state = CartState::new();
            for action in &actions {
                state.apply(action);
                prop_assert!(state.items().iter().all(|(_, qty)| qty >= 1));
            }
        }

        #[test]
        fn item_count_is_sum_of_quantities(
            actions in prop::collection::vec(action_strategy(), 0..64)
        ) {
            let mut state = CartState::new();
            for action in &actions {
                state.apply(action);
            }

            let sum: Quantity = state.items().iter().map(|(_, qty)| qty).sum();
            prop_assert_eq!(selectors::total_item_count(state.items()), sum);
        }

        #[test]
        fn version_moves_only_on_change(
            actions in prop::collection::vec(action_strategy(), 0..64)
        ) {
            let mut state = CartState::new();
            for action in &actions {
                let before = state.items().clone();
                let version = state.items_version();
                let changed = state.apply(action);

                prop_assert_eq!(changed, state.items() != &before);
                prop_assert_eq!(state.items_version(), version + u64::from(changed));
            }
        }
    }

    #[test]
    fn test_action_json_format() {
        let action: CartAction =
            serde_json::from_str(r#"{"type":"set_quantity","id":"A","quantity":3}"#).unwrap();
        assert_eq!(
            action,
            CartAction::SetQuantity {
                id: "A".into(),
                quantity: 3
            }
        );

        let json = serde_json::to_string(&CartAction::AddItem { id: "B".into() }).unwrap();
        assert_eq!(json, r#"{"type":"add_item","id":"B"}"#);
    }

    #[test]
    fn test_items_serialize_as_plain_map() {
        let items: CartItems = vec![("B", 1), ("A", 2)].into_iter().collect();
        assert_eq!(serde_json::to_string(&items).unwrap(), r#"{"A":2,"B":1}"#);
    }

    #[test]
    fn test_begin_checkout_sets_pending_and_clears_message() {
        let mut state = CartState::new();
        state.add_item("A");
        let first = begin(&mut state);
        state.resolve_checkout(
            &first,
            &CheckoutOutcome::Faulted {
                message: "boom".into(),
            },
        );
        assert_eq!(state.error_message(), "boom");

        let snapshot = begin(&mut state);

        assert_eq!(state.checkout_status(), CheckoutStatus::Pending);
        assert_eq!(state.error_message(), "");
        assert_eq!(snapshot.generation, 2);
        assert_eq!(snapshot.items.get("A"), Some(1));
    }

    #[test]
    fn test_success_clears_items_and_returns_to_ready() {
        let mut state = CartState::new();
        state.add_item("A");
        state.add_item("B");
        let snapshot = begin(&mut state);

        let resolution = state.resolve_checkout(&snapshot, &CheckoutOutcome::Succeeded);

        assert!(resolution.items_changed);
        assert!(resolution.status_changed);
        assert!(!resolution.stale);
        assert_eq!(state.checkout_status(), CheckoutStatus::Ready);
        assert!(state.items().is_empty());
    }

    #[test]
    fn test_success_keeps_items_added_mid_flight() {
        let mut state = CartState::new();
        state.set_quantity("A", 2);
        let snapshot = begin(&mut state);

        state.add_item("A");
        state.add_item("B");
        state.resolve_checkout(&snapshot, &CheckoutOutcome::Succeeded);

        assert_eq!(state.items().get("A"), Some(1));
        assert_eq!(state.items().get("B"), Some(1));
    }

    #[test]
    fn test_success_after_mid_flight_reduction_removes_line() {
        let mut state = CartState::new();
        state.set_quantity("A", 3);
        let snapshot = begin(&mut state);

        state.set_quantity("A", 1);
        state.resolve_checkout(&snapshot, &CheckoutOutcome::Succeeded);

        assert_eq!(state.items().get("A"), None);
    }

    #[test]
    fn test_declined_sets_failed_with_empty_message() {
        let mut state = CartState::new();
        state.add_item("A");
        let snapshot = begin(&mut state);

        state.resolve_checkout(&snapshot, &CheckoutOutcome::Declined);

        assert_eq!(state.checkout_status(), CheckoutStatus::Failed);
        assert_eq!(state.error_message(), "");
        assert_eq!(state.items().get("A"), Some(1));
    }

    #[test]
    fn test_fault_records_message() {
        let mut state = CartState::new();
        let snapshot = begin(&mut state);

        state.resolve_checkout(
            &snapshot,
            &CheckoutOutcome::Faulted {
                message: "network down".into(),
            },
        );

        assert_eq!(state.checkout_status(), CheckoutStatus::Failed);
        assert_eq!(state.error_message(), "network down");
    }

    #[test]
    fn test_last_resolution_wins_applies_stale_outcome() {
        let mut state = CartState::with_policy(ConcurrentCheckoutPolicy::LastResolutionWins);
        state.add_item("A");
        let first = begin(&mut state);
        let second = begin(&mut state);

        state.resolve_checkout(&second, &CheckoutOutcome::Declined);
        let resolution = state.resolve_checkout(&first, &CheckoutOutcome::Succeeded);

        assert!(resolution.stale);
        assert_eq!(state.checkout_status(), CheckoutStatus::Ready);
        assert!(state.items().is_empty());
    }

    #[test]
    fn test_latest_initiation_wins_ignores_stale_status() {
        let mut state = CartState::with_policy(ConcurrentCheckoutPolicy::LatestInitiationWins);
        state.add_item("A");
        let first = begin(&mut state);
        let second = begin(&mut state);

        state.resolve_checkout(&second, &CheckoutOutcome::Declined);
        let resolution = state.resolve_checkout(&first, &CheckoutOutcome::Succeeded);

        assert!(resolution.stale);
        assert!(!resolution.status_changed);
        assert_eq!(state.checkout_status(), CheckoutStatus::Failed);
        // The stale success still took its goods out of the cart
        assert!(state.items().is_empty());
    }

    #[test]
    fn test_latest_initiation_wins_ignores_stale_fault() {
        let mut state = CartState::with_policy(ConcurrentCheckoutPolicy::LatestInitiationWins);
        let first = begin(&mut state);
        let _second = begin(&mut state);

        state.resolve_checkout(
            &first,
            &CheckoutOutcome::Faulted {
                message: "late".into(),
            },
        );

        assert_eq!(state.checkout_status(), CheckoutStatus::Pending);
        assert_eq!(state.error_message(), "");
    }

    #[test]
    fn test_double_success_does_not_go_negative() {
        let mut state = CartState::new();
        state.set_quantity("A", 2);
        let first = begin(&mut state);
        let second = begin(&mut state);

        state.resolve_checkout(&first, &CheckoutOutcome::Succeeded);
        let resolution = state.resolve_checkout(&second, &CheckoutOutcome::Succeeded);

        assert!(!resolution.items_changed);
        assert!(state.items().is_empty());
    }
}
