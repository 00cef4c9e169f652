//! # Cart Store
//!
//! The single owner of cart state. UI code holds a [`CartStore`] handle
//! (cheap to clone), reads derived values from it and sends intents to it.
//!
//! ## Thread Safety
//! State sits behind a `std::sync::Mutex` inside an `Arc`:
//! 1. Every mutation runs to completion under the lock
//! 2. The lock is never held across an `.await`
//! 3. Emitter callbacks and logging happen after the lock is released
//!
//! ## Checkout Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout Workflow                                │
//! │                                                                         │
//! │  initiate_checkout()                                                    │
//! │     │                                                                   │
//! │     ├─ lock ─► begin_checkout ─► Pending, snapshot(gen N) ─► unlock     │
//! │     │                                                                   │
//! │     └─ spawn checkout task ──────────────────┐                          │
//! │                                              ▼                          │
//! │        returns CheckoutHandle      spawn service call (inner task)      │
//! │        immediately                           │                          │
//! │                                              ▼                          │
//! │                            Ok(success)  ──► Succeeded                   │
//! │                            Ok(!success) ──► Declined                    │
//! │                            Err(fault)   ──► Faulted { message }         │
//! │                            panic        ──► Faulted { "" }              │
//! │                                              │                          │
//! │                               lock ─► resolve_checkout ─► unlock        │
//! │                                              │                          │
//! │                                     emit events, log                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Derived Values
//! `total_item_count` and `total_price` are memoized on `items_version`
//! (and the catalog revision for price). Reading twice without a mutation
//! in between costs one computation.

use std::sync::{Arc, Mutex, PoisonError};

use basket_core::selectors::{self, cart_view};
use basket_core::{
    CartAction, CartItems, CartSnapshot, CartState, CartView, CheckoutOutcome, CheckoutStatus,
    ConcurrentCheckoutPolicy, CoreResult, LineTotal, Memo, MissingProductPolicy, ProductCatalog,
    Quantity,
};
use chrono::Utc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::events::{CartEventEmitter, NoOpEmitter};
use crate::service::{CheckoutService, SimulatedCheckoutService};

// =============================================================================
// Cart Store
// =============================================================================

/// Handle to the cart. Clones share the same state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<CartState>,
    catalog: Arc<dyn ProductCatalog>,
    service: Arc<dyn CheckoutService>,
    emitter: Arc<dyn CartEventEmitter>,
    runtime: Handle,
    missing_product: MissingProductPolicy,
    item_count: Memo<u64, Quantity>,
    price: Memo<(u64, u64), String>,
}

impl CartStore {
    /// Starts building a store.
    pub fn builder() -> CartStoreBuilder {
        CartStoreBuilder::new()
    }

    /// Executes a function with read access to the state.
    fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CartState) -> R,
    {
        let state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Executes a function with write access to the state.
    fn with_state_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CartState) -> R,
    {
        let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    // =========================================================================
    // Write Surface
    // =========================================================================

    /// Adds one unit of `id`.
    pub fn add_item(&self, id: &str) {
        self.dispatch(CartAction::AddItem { id: id.to_string() });
    }

    /// Removes `id` entirely; absent ids are ignored.
    pub fn remove_item(&self, id: &str) {
        self.dispatch(CartAction::RemoveItem { id: id.to_string() });
    }

    /// Sets the quantity of `id`; zero or less removes it.
    pub fn set_quantity(&self, id: &str, quantity: Quantity) {
        self.dispatch(CartAction::SetQuantity {
            id: id.to_string(),
            quantity,
        });
    }

    /// Applies a UI action. Returns whether the items changed.
    pub fn dispatch(&self, action: CartAction) -> bool {
        debug!(?action, "Cart action");

        let changed = self.with_state_mut(|state| {
            state
                .apply(&action)
                .then(|| (state.items().clone(), state.items_version()))
        });

        match changed {
            Some((items, version)) => {
                self.inner.emitter.emit_items_changed(&items, version);
                true
            }
            None => false,
        }
    }

    /// Starts a checkout of the current items and returns immediately.
    ///
    /// The status is `Pending` by the time this returns. Dropping the
    /// handle does not cancel the checkout.
    pub fn initiate_checkout(&self) -> CheckoutHandle {
        let ticket = Uuid::new_v4();
        let (snapshot, status_changed) = self.with_state_mut(|state| {
            let was_pending_clean = state.checkout_status() == CheckoutStatus::Pending
                && state.error_message().is_empty();
            (state.begin_checkout(ticket, Utc::now()), !was_pending_clean)
        });
        let generation = snapshot.generation;

        info!(
            %ticket,
            generation,
            items = snapshot.items.len(),
            "Checkout initiated"
        );
        if status_changed {
            self.inner.emitter.emit_checkout_status(CheckoutStatus::Pending, "");
        }

        let store = self.clone();
        let join = self.inner.runtime.spawn(async move { store.run_checkout(snapshot).await });

        CheckoutHandle {
            ticket,
            generation,
            join,
        }
    }

    async fn run_checkout(self, snapshot: CartSnapshot) -> CheckoutOutcome {
        let service = Arc::clone(&self.inner.service);
        let submitted = snapshot.clone();

        // Inner task so a panicking service still resolves the checkout
        let call = self
            .inner
            .runtime
            .spawn(async move { service.attempt_checkout(&submitted).await });

        let outcome = match call.await {
            Ok(Ok(receipt)) if receipt.success => CheckoutOutcome::Succeeded,
            Ok(Ok(_)) => CheckoutOutcome::Declined,
            Ok(Err(fault)) => CheckoutOutcome::Faulted {
                message: fault.message().to_string(),
            },
            Err(e) => {
                error!(ticket = %snapshot.ticket, error = %e, "Checkout call did not complete");
                CheckoutOutcome::Faulted {
                    message: String::new(),
                }
            }
        };

        self.apply_resolution(&snapshot, &outcome);
        outcome
    }

    fn apply_resolution(&self, snapshot: &CartSnapshot, outcome: &CheckoutOutcome) {
        let (resolution, status, message, items) = self.with_state_mut(|state| {
            let resolution = state.resolve_checkout(snapshot, outcome);
            let items = resolution
                .items_changed
                .then(|| (state.items().clone(), state.items_version()));
            (
                resolution,
                state.checkout_status(),
                state.error_message().to_string(),
                items,
            )
        });

        if resolution.stale {
            warn!(
                ticket = %snapshot.ticket,
                generation = snapshot.generation,
                applied = resolution.status_changed,
                "Resolution for a superseded checkout"
            );
        }

        match outcome {
            CheckoutOutcome::Succeeded => {
                info!(ticket = %snapshot.ticket, "Checkout succeeded")
            }
            CheckoutOutcome::Declined => {
                info!(ticket = %snapshot.ticket, "Checkout declined")
            }
            CheckoutOutcome::Faulted { message } => {
                warn!(ticket = %snapshot.ticket, error = %message, "Checkout faulted")
            }
        }

        if let Some((items, version)) = items {
            self.inner.emitter.emit_items_changed(&items, version);
        }
        if resolution.status_changed {
            self.inner.emitter.emit_checkout_status(status, &message);
        }
    }

    // =========================================================================
    // Read Surface
    // =========================================================================

    /// Copy of the current items.
    pub fn items(&self) -> CartItems {
        self.with_state(|state| state.items().clone())
    }

    /// Sum of all quantities (memoized).
    pub fn total_item_count(&self) -> Quantity {
        self.with_state(|state| {
            self.inner
                .item_count
                .get_or_compute(state.items_version(), || {
                    selectors::total_item_count(state.items())
                })
        })
    }

    /// Cart total as a two-decimal string (memoized).
    ///
    /// Errors only under `MissingProductPolicy::Fail`, and errors are not
    /// cached.
    pub fn total_price(&self) -> CoreResult<String> {
        let catalog = self.inner.catalog.as_ref();
        let policy = self.inner.missing_product;

        self.with_state(|state| {
            let key = (state.items_version(), catalog.revision());
            self.inner.price.get_or_try_compute(key, || {
                selectors::total_price(state.items(), catalog, policy)
            })
        })
    }

    /// Per-line breakdown for rendering.
    pub fn line_totals(&self) -> CoreResult<Vec<LineTotal>> {
        let catalog = self.inner.catalog.as_ref();
        let policy = self.inner.missing_product;
        self.with_state(|state| selectors::line_totals(state.items(), catalog, policy))
    }

    pub fn checkout_status(&self) -> CheckoutStatus {
        self.with_state(CartState::checkout_status)
    }

    pub fn error_message(&self) -> String {
        self.with_state(|state| state.error_message().to_string())
    }

    /// Serializable read model of the whole cart.
    pub fn view(&self) -> CartView {
        self.with_state(cart_view)
    }

    pub fn checkout_policy(&self) -> ConcurrentCheckoutPolicy {
        self.with_state(CartState::policy)
    }

    pub fn missing_product_policy(&self) -> MissingProductPolicy {
        self.inner.missing_product
    }
}

// =============================================================================
// Checkout Handle
// =============================================================================

/// A checkout in flight. Awaiting it is optional.
#[derive(Debug)]
pub struct CheckoutHandle {
    ticket: Uuid,
    generation: u64,
    join: JoinHandle<CheckoutOutcome>,
}

impl CheckoutHandle {
    /// Correlation id used in logs.
    pub fn ticket(&self) -> Uuid {
        self.ticket
    }

    /// Initiation counter value for this checkout.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits until the outcome has been applied to the cart.
    pub async fn wait(self) -> StoreResult<CheckoutOutcome> {
        self.join.await.map_err(|e| StoreError::TaskJoin(e.to_string()))
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for creating a CartStore with options.
pub struct CartStoreBuilder {
    catalog: Option<Arc<dyn ProductCatalog>>,
    service: Option<Arc<dyn CheckoutService>>,
    emitter: Option<Arc<dyn CartEventEmitter>>,
    runtime: Option<Handle>,
    missing_product: MissingProductPolicy,
    checkout_policy: ConcurrentCheckoutPolicy,
}

impl Default for CartStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CartStoreBuilder {
    /// Creates a builder with default policies.
    pub fn new() -> Self {
        CartStoreBuilder {
            catalog: None,
            service: None,
            emitter: None,
            runtime: None,
            missing_product: MissingProductPolicy::default(),
            checkout_policy: ConcurrentCheckoutPolicy::default(),
        }
    }

    /// Takes policies from `config` and uses the simulated checkout service
    /// it describes. A later `with_checkout_service` replaces the simulator.
    pub fn from_config(config: &StoreConfig) -> Self {
        CartStoreBuilder::new()
            .missing_product_policy(config.pricing.missing_product)
            .checkout_policy(config.checkout.concurrency)
            .with_checkout_service(Arc::new(SimulatedCheckoutService::from_settings(
                &config.simulator,
            )))
    }

    /// Sets the catalog used for pricing.
    pub fn with_catalog(mut self, catalog: Arc<dyn ProductCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Sets the checkout endpoint.
    pub fn with_checkout_service(mut self, service: Arc<dyn CheckoutService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Sets the event emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn CartEventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Runtime for checkout tasks; defaults to the current one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn missing_product_policy(mut self, policy: MissingProductPolicy) -> Self {
        self.missing_product = policy;
        self
    }

    pub fn checkout_policy(mut self, policy: ConcurrentCheckoutPolicy) -> Self {
        self.checkout_policy = policy;
        self
    }

    /// Builds the CartStore.
    pub fn build(self) -> StoreResult<CartStore> {
        let catalog = self
            .catalog
            .ok_or_else(|| StoreError::InvalidConfig("Product catalog required".into()))?;

        let service = self
            .service
            .ok_or_else(|| StoreError::InvalidConfig("Checkout service required".into()))?;

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| StoreError::NoRuntime)?,
        };

        let emitter = self.emitter.unwrap_or_else(|| Arc::new(NoOpEmitter));

        debug!(
            missing_product = %self.missing_product,
            checkout_policy = %self.checkout_policy,
            "Cart store created"
        );

        Ok(CartStore {
            inner: Arc::new(Inner {
                state: Mutex::new(CartState::with_policy(self.checkout_policy)),
                catalog,
                service,
                emitter,
                runtime,
                missing_product: self.missing_product,
                item_count: Memo::new(),
                price: Memo::new(),
            }),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckoutFault;
    use crate::service::{CheckoutReceipt, SimulatedOutcome};
    use async_trait::async_trait;
    use basket_core::{CatalogProduct, CoreError, InMemoryCatalog};
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::oneshot;

    type Reply = Result<CheckoutReceipt, CheckoutFault>;

    /// Answers each checkout generation when the test says so.
    #[derive(Default)]
    struct ScriptedService {
        replies: Mutex<HashMap<u64, oneshot::Receiver<Reply>>>,
        submitted: Mutex<Vec<CartSnapshot>>,
    }

    impl ScriptedService {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn script(&self, generation: u64) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.replies.lock().unwrap().insert(generation, rx);
            tx
        }
    }

    #[async_trait]
    impl CheckoutService for ScriptedService {
        async fn attempt_checkout(&self, snapshot: &CartSnapshot) -> Reply {
            self.submitted.lock().unwrap().push(snapshot.clone());
            let reply = self.replies.lock().unwrap().remove(&snapshot.generation);
            match reply {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(CheckoutFault::Transport("dropped".into()))),
                None => Err(CheckoutFault::Unknown),
            }
        }
    }

    struct PanickingService;

    #[async_trait]
    impl CheckoutService for PanickingService {
        async fn attempt_checkout(&self, _snapshot: &CartSnapshot) -> Reply {
            panic!("checkout backend exploded");
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Items(CartItems, u64),
        Status(CheckoutStatus, String),
    }

    #[derive(Default)]
    struct RecordingEmitter {
        events: Mutex<Vec<Event>>,
    }

    impl CartEventEmitter for RecordingEmitter {
        fn emit_items_changed(&self, items: &CartItems, items_version: u64) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Items(items.clone(), items_version));
        }

        fn emit_checkout_status(&self, status: CheckoutStatus, error_message: &str) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Status(status, error_message.to_string()));
        }
    }

    fn catalog() -> Arc<InMemoryCatalog> {
        Arc::new(InMemoryCatalog::from_products(vec![
            CatalogProduct::new("A", "Apple", 200),
            CatalogProduct::new("B", "Bread", 350),
        ]))
    }

    fn store_with(
        service: Arc<dyn CheckoutService>,
        policy: ConcurrentCheckoutPolicy,
    ) -> CartStore {
        CartStore::builder()
            .with_catalog(catalog())
            .with_checkout_service(service)
            .checkout_policy(policy)
            .missing_product_policy(MissingProductPolicy::Fail)
            .build()
            .unwrap()
    }

    fn store(service: Arc<dyn CheckoutService>) -> CartStore {
        store_with(service, ConcurrentCheckoutPolicy::LastResolutionWins)
    }

    fn approving() -> Arc<dyn CheckoutService> {
        Arc::new(SimulatedCheckoutService::approving(Duration::ZERO))
    }

    // =========================================================================
    // Mutations & Queries
    // =========================================================================

    #[tokio::test]
    async fn test_mutations_and_count() {
        let store = store(approving());
        store.add_item("A");
        store.add_item("A");
        store.add_item("B");
        store.set_quantity("B", 4);
        store.remove_item("GHOST");

        assert_eq!(store.items().get("A"), Some(2));
        assert_eq!(store.total_item_count(), 6);

        store.set_quantity("A", 0);
        assert_eq!(store.items().get("A"), None);
        assert_eq!(store.total_item_count(), 4);
    }

    #[tokio::test]
    async fn test_dispatch_reports_change() {
        let store = store(approving());
        let action: CartAction = serde_json::from_str(r#"{"type":"add_item","id":"A"}"#).unwrap();

        assert!(store.dispatch(action));
        assert!(!store.dispatch(CartAction::RemoveItem { id: "Z".into() }));
    }

    #[tokio::test]
    async fn test_total_price() {
        let store = store(approving());
        store.set_quantity("A", 2);
        store.add_item("B");

        assert_eq!(store.total_price().unwrap(), "7.50");
    }

    #[tokio::test]
    async fn test_memoized_total_matches_pure_function() {
        let catalog = catalog();
        let store = CartStore::builder()
            .with_catalog(catalog.clone())
            .with_checkout_service(approving())
            .missing_product_policy(MissingProductPolicy::Fail)
            .build()
            .unwrap();
        store.set_quantity("A", 3);
        store.add_item("B");

        let first = store.total_price().unwrap();
        let second = store.total_price().unwrap();
        let pure = selectors::total_price(
            &store.items(),
            catalog.as_ref(),
            MissingProductPolicy::Fail,
        )
        .unwrap();

        assert_eq!(first, second);
        assert_eq!(first, pure);
        assert_eq!(store.total_item_count(), store.total_item_count());
    }

    #[tokio::test]
    async fn test_total_price_follows_catalog_updates() {
        let catalog = catalog();
        let store = CartStore::builder()
            .with_catalog(catalog.clone())
            .with_checkout_service(approving())
            .missing_product_policy(MissingProductPolicy::Fail)
            .build()
            .unwrap();
        store.set_quantity("A", 2);
        assert_eq!(store.total_price().unwrap(), "4.00");

        catalog.upsert(CatalogProduct::new("A", "Apple", 250)).unwrap();
        assert_eq!(store.total_price().unwrap(), "5.00");
    }

    #[tokio::test]
    async fn test_missing_product_policies() {
        let strict = store(approving());
        strict.add_item("GHOST");
        assert!(matches!(
            strict.total_price(),
            Err(CoreError::ProductNotInCatalog(id)) if id == "GHOST"
        ));

        let lenient = CartStore::builder()
            .with_catalog(catalog())
            .with_checkout_service(approving())
            .missing_product_policy(MissingProductPolicy::TreatAsZero)
            .build()
            .unwrap();
        lenient.add_item("GHOST");
        lenient.add_item("A");
        assert_eq!(lenient.total_price().unwrap(), "2.00");
        assert_eq!(lenient.line_totals().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_view() {
        let store = store(approving());
        store.add_item("A");

        let view = store.view();
        assert_eq!(view.total_item_count, 1);
        assert_eq!(view.checkout_status, CheckoutStatus::Ready);
        assert_eq!(view.error_message, "");
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    #[tokio::test]
    async fn test_initiate_sets_pending_before_resolution() {
        let service = ScriptedService::new();
        let reply = service.script(1);
        let store = store(service.clone());
        store.add_item("A");

        let handle = store.initiate_checkout();
        assert_eq!(store.checkout_status(), CheckoutStatus::Pending);
        assert!(!handle.is_finished());

        reply.send(Ok(CheckoutReceipt::approved())).unwrap();
        assert_eq!(handle.wait().await.unwrap(), CheckoutOutcome::Succeeded);
        assert_eq!(store.checkout_status(), CheckoutStatus::Ready);
    }

    #[tokio::test]
    async fn test_success_empties_cart() {
        let store = store(approving());
        store.add_item("A");
        store.add_item("B");

        store.initiate_checkout().wait().await.unwrap();

        assert_eq!(store.checkout_status(), CheckoutStatus::Ready);
        assert!(store.items().is_empty());
        assert_eq!(store.error_message(), "");
    }

    #[tokio::test]
    async fn test_items_added_during_checkout_survive_success() {
        let service = ScriptedService::new();
        let reply = service.script(1);
        let store = store(service.clone());
        store.set_quantity("A", 2);

        let handle = store.initiate_checkout();
        store.add_item("A");
        store.add_item("B");
        reply.send(Ok(CheckoutReceipt::approved())).unwrap();
        handle.wait().await.unwrap();

        assert_eq!(store.items().get("A"), Some(1));
        assert_eq!(store.items().get("B"), Some(1));

        let submitted = service.submitted.lock().unwrap();
        assert_eq!(submitted[0].items.get("A"), Some(2));
        assert_eq!(submitted[0].items.get("B"), None);
    }

    #[tokio::test]
    async fn test_declined_checkout() {
        let service  = SimulatedCheckoutService::approving(Duration::ZERO)
            .with_outcome(SimulatedOutcome::Decline);
        let store = store(Arc::new(service));
        store.add_item("A");

        let outcome = store.initiate_checkout().wait().await.unwrap();

        assert_eq!(outcome, CheckoutOutcome::Declined);
        assert_eq!(store.checkout_status(), CheckoutStatus::Failed);
        assert_eq!(store.error_message(), "");
        assert_eq!(store.items().get("A"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_faulted_checkout_records_message() {
        let service = SimulatedCheckoutService::approving(Duration::from_millis(300))
            .with_outcome(SimulatedOutcome::Fault)
            .with_fault_message("network down");
        let store = store(Arc::new(service));
        store.add_item("A");

        store.initiate_checkout().wait().await.unwrap();

        assert_eq!(store.checkout_status(), CheckoutStatus::Failed);
        assert_eq!(store.error_message(), "network down");
    }

    #[tokio::test]
    async fn test_panicking_service_is_recovered() {
        let store = store(Arc::new(PanickingService));
        store.add_item("A");

        let outcome = store.initiate_checkout().wait().await.unwrap();

        assert_eq!(
            outcome,
            CheckoutOutcome::Faulted {
                message: String::new()
            }
        );
        assert_eq!(store.checkout_status(), CheckoutStatus::Failed);
        assert_eq!(store.error_message(), "");
    }

    #[tokio::test]
    async fn test_retry_after_failure_clears_message() {
        let service = ScriptedService::new();
        let first = service.script(1);
        let second = service.script(2);
        let store = store(service.clone());
        store.add_item("A");

        let handle = store.initiate_checkout();
        first.send(Err(CheckoutFault::Transport("timeout".into()))).unwrap();
        handle.wait().await.unwrap();
        assert_eq!(store.error_message(), "timeout");

        let handle = store.initiate_checkout();
        assert_eq!(store.checkout_status(), CheckoutStatus::Pending);
        assert_eq!(store.error_message(), "");

        second.send(Ok(CheckoutReceipt::approved())).unwrap();
        handle.wait().await.unwrap();
        assert_eq!(store.checkout_status(), CheckoutStatus::Ready);
    }

    #[tokio::test]
    async fn test_last_resolution_wins() {
        let service = ScriptedService::new();
        let first = service.script(1);
        let second = service.script(2);
        let store = store_with(
            service.clone(),
            ConcurrentCheckoutPolicy::LastResolutionWins,
        );
        store.add_item("A");

        let first_handle = store.initiate_checkout();
        let second_handle = store.initiate_checkout();

        second.send(Ok(CheckoutReceipt::declined())).unwrap();
        second_handle.wait().await.unwrap();
        assert_eq!(store.checkout_status(), CheckoutStatus::Failed);

        first.send(Ok(CheckoutReceipt::approved())).unwrap();
        first_handle.wait().await.unwrap();
        assert_eq!(store.checkout_status(), CheckoutStatus::Ready);
        assert!(store.items().is_empty());
    }

    #[tokio::test]
    async fn test_latest_initiation_wins() {
        let service = ScriptedService::new();
        let first = service.script(1);
        let second = service.script(2);
        let store = store_with(
            service.clone(),
            ConcurrentCheckoutPolicy::LatestInitiationWins,
        );
        store.add_item("A");

        let first_handle = store.initiate_checkout();
        let second_handle = store.initiate_checkout();

        second.send(Ok(CheckoutReceipt::declined())).unwrap();
        second_handle.wait().await.unwrap();

        first
            .send(Err(CheckoutFault::Transport("late".into())))
            .unwrap();
        first_handle.wait().await.unwrap();

        assert_eq!(store.checkout_status(), CheckoutStatus::Failed);
        assert_eq!(store.error_message(), "");
    }

    #[tokio::test]
    async fn test_emitter_receives_changes() {
        let emitter = Arc::new(RecordingEmitter::default());
        let store = CartStore::builder()
            .with_catalog(catalog())
            .with_checkout_service(approving())
            .with_emitter(emitter.clone())
            .build()
            .unwrap();

        store.add_item("A");
        store.remove_item("Z");
        store.initiate_checkout().wait().await.unwrap();

        let events = emitter.events.lock().unwrap().clone();
        let one_a: CartItems = vec![("A", 1)].into_iter().collect();
        assert_eq!(
            events,
            vec![
                Event::Items(one_a, 1),
                Event::Status(CheckoutStatus::Pending, String::new()),
                Event::Items(CartItems::new(), 2),
                Event::Status(CheckoutStatus::Ready, String::new()),
            ]
        );
    }

    #[tokio::test]
    async fn test_repeated_initiation_emits_pending_once() {
        let service = ScriptedService::new();
        let first = service.script(1);
        let second = service.script(2);
        let emitter = Arc::new(RecordingEmitter::default());
        let store = CartStore::builder()
            .with_catalog(catalog())
            .with_checkout_service(service.clone())
            .with_emitter(emitter.clone())
            .build()
            .unwrap();
        store.add_item("A");

        let first_handle = store.initiate_checkout();
        let second_handle = store.initiate_checkout();
        first.send(Ok(CheckoutReceipt::declined())).unwrap();
        first_handle.wait().await.unwrap();
        second.send(Ok(CheckoutReceipt::declined())).unwrap();
        second_handle.wait().await.unwrap();

        let statuses: Vec<Event> = emitter
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| matches!(event, Event::Status(..)))
            .cloned()
            .collect();
        assert_eq!(
            statuses,
            vec![
                Event::Status(CheckoutStatus::Pending, String::new()),
                Event::Status(CheckoutStatus::Failed, String::new()),
            ]
        );
    }

    #[tokio::test]
    async fn test_retry_from_failed_emits_pending() {
        let emitter = Arc::new(RecordingEmitter::default());
        let service = SimulatedCheckoutService::approving(Duration::ZERO)
            .with_outcome(SimulatedOutcome::Fault)
            .with_fault_message("offline");
        let store = CartStore::builder()
            .with_catalog(catalog())
            .with_checkout_service(Arc::new(service))
            .with_emitter(emitter.clone())
            .build()
            .unwrap();
        store.add_item("A");

        store.initiate_checkout().wait().await.unwrap();
        store.initiate_checkout().wait().await.unwrap();

        let pending = emitter
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| **event == Event::Status(CheckoutStatus::Pending, String::new()))
            .count();
        assert_eq!(pending, 2);
    }

    #[tokio::test]
    async fn test_highest_items_version_is_current_state() {
        let emitter = Arc::new(RecordingEmitter::default());
        let store = CartStore::builder()
            .with_catalog(catalog())
            .with_checkout_service(approving())
            .with_emitter(emitter.clone())
            .build()
            .unwrap();

        let writers: Vec<_> = ["A", "B", "C", "D"]
            .into_iter()
            .map(|id| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for quantity in 1..=25 {
                        store.set_quantity(id, quantity);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let events = emitter.events.lock().unwrap().clone();
        let latest = events
            .into_iter()
            .filter_map(|event| match event {
                Event::Items(items, version) => Some((version, items)),
                Event::Status(..) => None,
            })
            .max_by_key(|(version, _)| *version);

        assert_eq!(latest, Some((100, store.items())));
        assert_eq!(store.total_item_count(), 100);
    }

    // =========================================================================
    // Builder
    // =========================================================================

    #[test]
    fn test_build_without_runtime_fails() {
        let result = CartStore::builder()
            .with_catalog(catalog())
            .with_checkout_service(approving())
            .build();
        assert!(matches!(result, Err(StoreError::NoRuntime)));
    }

    #[test]
    fn test_build_with_explicit_runtime() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let store = CartStore::builder()
            .with_catalog(catalog())
            .with_checkout_service(approving())
            .with_runtime(runtime.handle().clone())
            .build()
            .unwrap();

        store.add_item("A");
        let outcome = runtime.block_on(store.initiate_checkout().wait()).unwrap();
        assert_eq!(outcome, CheckoutOutcome::Succeeded);
    }

    #[tokio::test]
    async fn test_build_requires_catalog_and_service() {
        let missing_catalog = CartStore::builder().with_checkout_service(approving()).build();
        assert!(matches!(missing_catalog, Err(StoreError::InvalidConfig(_))));

        let missing_service = CartStore::builder().with_catalog(catalog()).build();
        assert!(matches!(missing_service, Err(StoreError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_from_config() {
        let mut config = StoreConfig::default();
        config.checkout.concurrency = ConcurrentCheckoutPolicy::LatestInitiationWins;
        config.pricing.missing_product = MissingProductPolicy::TreatAsZero;
        config.simulator.latency_ms = 0;

        let store = CartStoreBuilder::from_config(&config)
            .with_catalog(catalog())
            .build()
            .unwrap();

        assert_eq!(
            store.checkout_policy(),
            ConcurrentCheckoutPolicy::LatestInitiationWins
        );
        assert_eq!(
            store.missing_product_policy(),
            MissingProductPolicy::TreatAsZero
        );

        store.add_item("A");
        let outcome = store.initiate_checkout().wait().await.unwrap();
        assert_eq!(outcome, CheckoutOutcome::Succeeded);
    }

    // =========================================================================
    // Properties
    // =========================================================================

    fn action_strategy() -> impl Strategy<Value = CartAction> {
        let id = prop::sample::select(vec!["A", "B", "GHOST"]).prop_map(String::from);
        prop_oneof![
            3 => id.clone().prop_map(|id| CartAction::AddItem { id }),
            1 => id.clone().prop_map(|id| CartAction::RemoveItem { id }),
            2 => (id, -2i64..6)
                .prop_map(|(id, quantity)| CartAction::SetQuantity { id, quantity }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn memoized_totals_match_selectors(
            actions in prop::collection::vec(action_strategy(), 0..40)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let catalog = catalog();
            let store = CartStore::builder()
                .with_catalog(catalog.clone())
                .with_checkout_service(approving())
                .with_runtime(runtime.handle().clone())
                .missing_product_policy(MissingProductPolicy::TreatAsZero)
                .build()
                .unwrap();

            for action in actions {
                store.dispatch(action);
                let items = store.items();
                let pure = selectors::total_price(
                    &items,
                    catalog.as_ref(),
                    MissingProductPolicy::TreatAsZero,
                )
                .unwrap();

                prop_assert_eq!(store.total_price().unwrap(), pure.clone());
                prop_assert_eq!(store.total_price().unwrap(), pure);
                prop_assert_eq!(store.total_item_count(), selectors::total_item_count(&items));
                prop_assert!(items.iter().all(|(_, quantity)| quantity >= 1));
            }
        }
    }
}
