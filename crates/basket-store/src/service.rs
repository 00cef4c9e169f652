//! # Checkout Service
//!
//! The remote call that turns a cart snapshot into an order. This is the
//! only network boundary the store knows about, and it treats it as opaque.
//!
//! ## Three Ways a Call Ends
//! ```text
//! attempt_checkout(snapshot)
//!      │
//!      ├── Ok(CheckoutReceipt { success: true })  ──► Ready, snapshot cleared
//!      ├── Ok(CheckoutReceipt { success: false }) ──► Failed, no message
//!      └── Err(CheckoutFault)                     ──► Failed, fault message
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use basket_core::CartSnapshot;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SimulatorSettings;
use crate::error::{CheckoutFault, StoreError};

// =============================================================================
// Contract
// =============================================================================

/// Structured answer from the checkout endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub success: bool,
}

impl CheckoutReceipt {
    pub const fn approved() -> Self {
        CheckoutReceipt { success: true }
    }

    pub const fn declined() -> Self {
        CheckoutReceipt { success: false }
    }
}

/// Submits a cart snapshot for checkout.
#[async_trait]
pub trait CheckoutService: Send + Sync {
    async fn attempt_checkout(
        &self,
        snapshot: &CartSnapshot,
    ) -> Result<CheckoutReceipt, CheckoutFault>;
}

// =============================================================================
// Simulated Service
// =============================================================================

/// Canned answer for [`SimulatedCheckoutService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulatedOutcome {
    /// Answer `success: true`.
    #[default]
    Approve,
    /// Answer `success: false`.
    Decline,
    /// Fail the call with the configured message.
    Fault,
}

impl fmt::Display for SimulatedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulatedOutcome::Approve => write!(f, "approve"),
            SimulatedOutcome::Decline => write!(f, "decline"),
            SimulatedOutcome::Fault => write!(f, "fault"),
        }
    }
}

impl FromStr for SimulatedOutcome {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approve" | "success" | "ok" => Ok(SimulatedOutcome::Approve),
            "decline" | "declined" => Ok(SimulatedOutcome::Decline),
            "fault" | "error" => Ok(SimulatedOutcome::Fault),
            other => Err(StoreError::InvalidConfig(format!(
                "Unknown simulated outcome: '{}'. Valid options: approve, decline, fault",
                other
            ))),
        }
    }
}

/// Stand-in for the remote checkout endpoint: waits, then answers as
/// configured.
#[derive(Debug, Clone)]
pub struct SimulatedCheckoutService {
    latency: Duration,
    outcome: SimulatedOutcome,
    reject_empty_cart: bool,
    fault_message: String,
}

impl SimulatedCheckoutService {
    /// Approves everything after `latency`.
    pub fn approving(latency: Duration) -> Self {
        SimulatedCheckoutService {
            latency,
            outcome: SimulatedOutcome::Approve,
            reject_empty_cart: false,
            fault_message: String::new(),
        }
    }

    pub fn from_settings(settings: &SimulatorSettings) -> Self {
        SimulatedCheckoutService {
            latency: Duration::from_millis(settings.latency_ms),
            outcome: settings.outcome,
            reject_empty_cart: settings.reject_empty_cart,
            fault_message: settings.fault_message.clone(),
        }
    }

    pub fn with_outcome(mut self, outcome: SimulatedOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_fault_message(mut self, message: impl Into<String>) -> Self {
        self.fault_message = message.into();
        self
    }

    /// Fault any checkout of an empty cart, whatever the outcome setting.
    pub fn reject_empty_cart(mut self, reject: bool) -> Self {
        self.reject_empty_cart = reject;
        self
    }
}

#[async_trait]
impl CheckoutService for SimulatedCheckoutService {
    async fn attempt_checkout(
        &self,
        snapshot: &CartSnapshot,
    ) -> Result<CheckoutReceipt, CheckoutFault> {
        debug!(
            ticket = %snapshot.ticket,
            items = snapshot.items.len(),
            latency_ms = self.latency.as_millis() as u64,
            "Simulated checkout call"
        );

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.reject_empty_cart && snapshot.items.is_empty() {
            return Err(CheckoutFault::Rejected("cart is empty".to_string()));
        }

        match self.outcome {
            SimulatedOutcome::Approve => Ok(CheckoutReceipt::approved()),
            SimulatedOutcome::Decline => Ok(CheckoutReceipt::declined()),
            SimulatedOutcome::Fault if self.fault_message.is_empty() => Err(CheckoutFault::Unknown),
            SimulatedOutcome::Fault => Err(CheckoutFault::Transport(self.fault_message.clone())),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
