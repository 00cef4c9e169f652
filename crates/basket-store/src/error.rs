//! # Store Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Store Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Runtime      │  │     Checkout call       │ │
//! │  │                 │  │                 │  │   (CheckoutFault)       │ │
//! │  │  InvalidConfig  │  │  NoRuntime      │  │                         │ │
//! │  │  ConfigLoad...  │  │  TaskJoin       │  │  Transport              │ │
//! │  │  TomlParse      │  │  Telemetry      │  │  Rejected               │ │
//! │  └─────────────────┘  └─────────────────┘  │  Unknown                │ │
//! │                                            └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `StoreError` is for callers wiring the store up. `CheckoutFault` never
//! escapes the store: it is recovered into the cart's `Failed` status.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store setup and orchestration errors.
#[derive(Debug, Error)]
pub enum StoreError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid store configuration.
    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    /// The store was built outside a tokio runtime and none was supplied.
    #[error("No tokio runtime available to run checkouts")]
    NoRuntime,

    /// A checkout task could not be joined (runtime shut down).
    #[error("Checkout task failed: {0}")]
    TaskJoin(String),

    /// Logging could not be initialized.
    #[error("Failed to initialize tracing: {0}")]
    Telemetry(String),

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// The checkout call itself failed, as opposed to answering `success: false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutFault {
    /// The request never got a usable answer (network down, timeout).
    #[error("{0}")]
    Transport(String),

    /// The remote end refused the call.
    #[error("{0}")]
    Rejected(String),

    /// Failed without a description.
    #[error("checkout call failed")]
    Unknown,
}

impl CheckoutFault {
    /// The text recorded as the cart's error message; empty when the fault
    /// carries no description.
    pub fn message(&self) -> &str {
        match self {
            CheckoutFault::Transport(msg) | CheckoutFault::Rejected(msg) => msg,
            CheckoutFault::Unknown => "",
        }
    }
}
