//! # Store Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BASKET_MISSING_PRODUCT=treat_as_zero                               │
//! │     BASKET_CHECKOUT_POLICY=latest_initiation_wins                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/cart/basket.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.basket.cart/basket.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [pricing]
//! missing_product = "treat_as_zero"   # fail | treat_as_zero
//!
//! [checkout]
//! concurrency = "last_resolution_wins" # or latest_initiation_wins
//!
//! [simulator]
//! latency_ms = 500
//! outcome = "approve"                  # approve | decline | fault
//! reject_empty_cart = true
//! fault_message = "network down"
//!
//! [logging]
//! filter = "info,basket=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use basket_core::{ConcurrentCheckoutPolicy, MissingProductPolicy, ValidationError};

use crate::error::{StoreError, StoreResult};
use crate::service::SimulatedOutcome;

/// Upper bound on simulated latency; anything longer is a typo.
const MAX_SIMULATED_LATENCY_MS: u64 = 60_000;

// =============================================================================
// Sections
// =============================================================================

/// How totals treat products missing from the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingSettings {
    #[serde(default)]
    pub missing_product: MissingProductPolicy,
}

/// How overlapping checkouts are resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutSettings {
    #[serde(default)]
    pub concurrency: ConcurrentCheckoutPolicy,
}

/// Behavior of the simulated checkout endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorSettings {
    /// Delay before answering (milliseconds).
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    #[serde(default)]
    pub outcome: SimulatedOutcome,

    /// Fault checkouts of an empty cart.
    #[serde(default = "default_true")]
    pub reject_empty_cart: bool,

    /// Message used when `outcome = "fault"`; empty means no description.
    #[serde(default)]
    pub fault_message: String,
}

fn default_latency_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        SimulatorSettings {
            latency_ms: default_latency_ms(),
            outcome: SimulatedOutcome::default(),
            reject_empty_cart: true,
            fault_message: String::new(),
        }
    }
}

/// Log filter used when `RUST_LOG` is not set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info,basket=debug".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,

    #[serde(default)]
    pub simulator: SimulatorSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl StoreConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (basket.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> StoreResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading store config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| {
                        StoreError::ConfigLoadFailed(format!("{}: {}", path.display(), e))
                    })?;
                config = Self::from_toml_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load store config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document; missing sections take their defaults.
    pub fn from_toml_str(contents: &str) -> StoreResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> StoreResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| StoreError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Store config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> StoreResult<()> {
        if self.simulator.latency_ms > MAX_SIMULATED_LATENCY_MS {
            return Err(StoreError::InvalidConfig(format!(
                "simulator.latency_ms must be at most {}, got {}",
                MAX_SIMULATED_LATENCY_MS, self.simulator.latency_ms
            )));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(StoreError::InvalidConfig(
                "logging.filter must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) -> StoreResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key lookup; malformed policy values are
    /// errors, malformed numbers are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> StoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(policy) = lookup("BASKET_MISSING_PRODUCT") {
            debug!(policy = %policy, "Overriding missing-product policy from environment");
            self.pricing.missing_product = policy
                .parse()
                .map_err(|e: ValidationError| StoreError::InvalidConfig(e.to_string()))?;
        }

        if let Some(policy) = lookup("BASKET_CHECKOUT_POLICY") {
            debug!(policy = %policy, "Overriding checkout policy from environment");
            self.checkout.concurrency = policy
                .parse()
                .map_err(|e: ValidationError| StoreError::InvalidConfig(e.to_string()))?;
        }

        if let Some(latency) = lookup("BASKET_SIM_LATENCY_MS") {
            match latency.parse::<u64>() {
                Ok(ms) => self.simulator.latency_ms = ms,
                Err(_) => warn!(value = %latency, "Ignoring non-numeric BASKET_SIM_LATENCY_MS"),
            }
        }

        if let Some(outcome) = lookup("BASKET_SIM_OUTCOME") {
            self.simulator.outcome = outcome.parse()?;
        }

        if let Some(filter) = lookup("BASKET_LOG") {
            self.logging.filter = filter;
        }

        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "basket", "cart")
            .map(|dirs| dirs.config_dir().join("basket.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
