//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `ENTITLEMENT_SYNC` prefix and nested values use double underscores as separators.
//!
//! The conventional flat variables used by Stripe and Firebase tooling
//! (`STRIPE_SECRET_KEY`, `FIREBASE_PROJECT_ID`, ...) are honoured as fallbacks,
//! so an existing deployment environment works unchanged.
//!
//! # Example
//!
//! ```no_run
//! use entitlement_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod directory;
mod entitlements;
mod error;
mod payment;
mod server;

pub use directory::DirectoryConfig;
pub use entitlements::EntitlementsConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;
use std::env;

/// Flat variables mapped onto their nested keys when the prefixed form is absent.
const FALLBACK_ENV_VARS: &[(&str, &str)] = &[
    ("STRIPE_SECRET_KEY", "payment.stripe_api_key"),
    ("STRIPE_WEBHOOK_SECRET", "payment.stripe_webhook_secret"),
    ("STRIPE_WEBHOOK_SECRET_TEST", "payment.stripe_webhook_secret_test"),
    ("FIREBASE_PROJECT_ID", "directory.project_id"),
    ("FIREBASE_CLIENT_EMAIL", "directory.client_email"),
    ("FIREBASE_PRIVATE_KEY", "directory.private_key"),
    ("FIRESTORE_EMULATOR_HOST", "directory.emulator_host"),
];

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
/// Every section has defaults so that [`AppConfig::validate()`] can name the
/// missing value instead of failing on deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Payment configuration (Stripe)
    #[serde(default)]
    pub payment: PaymentConfig,

    /// User directory configuration (Firestore)
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Price-to-role table
    #[serde(default)]
    pub entitlements: EntitlementsConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Seeds defaults from the flat Stripe/Firebase variables
    /// 3. Reads environment variables with `ENTITLEMENT_SYNC` prefix
    /// 4. Uses `__` (double underscore) to separate nested values
    /// 5. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `ENTITLEMENT_SYNC__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `ENTITLEMENT_SYNC__DIRECTORY__COLLECTION=members` -> `directory.collection = members`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        for (var, key) in FALLBACK_ENV_VARS {
            if let Ok(value) = env::var(var) {
                builder = builder.set_default(*key, value)?;
            }
        }

        let config = builder
            .add_source(
                config::Environment::default()
                    .prefix("ENTITLEMENT_SYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.payment.validate()?;
        self.directory.validate()?;
        Ok(())
    }
}
