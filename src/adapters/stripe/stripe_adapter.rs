//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` trait against the Stripe REST API.
//! Only subscription retrieval is needed: the webhook payload tells us which
//! subscription changed, and this adapter asks Stripe what it costs now.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key).with_timeout(Duration::from_secs(10));
//! let adapter = StripePaymentAdapter::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};

use crate::ports::{PaymentError, PaymentProvider, Subscription};

use super::webhook_types::{StripeErrorEnvelope, StripeSubscription};

/// Default Stripe API origin.
pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// API version pinned on every request so response shapes do not drift with
/// account settings.
pub const DEFAULT_API_VERSION: &str = "2023-10-16";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Value of the `Stripe-Version` header.
    api_version: String,

    /// Per-request timeout.
    timeout: Duration,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_secret(SecretString::new(api_key.into()))
    }

    /// Create a configuration from an already-wrapped key.
    pub fn from_secret(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Pin a different API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Stripe payment provider adapter.
///
/// Implements `PaymentProvider` for Stripe API integration.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: Client,
}

impl StripePaymentAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> PaymentError {
        if e.is_timeout() {
            PaymentError::timeout(format!(
                "Stripe did not respond within {}s",
                self.config.timeout.as_secs()
            ))
        } else if e.is_connect() {
            PaymentError::network(format!("Connection failed: {}", e))
        } else {
            PaymentError::network(e.to_string())
        }
    }

    async fn map_error_response(&self, response: reqwest::Response) -> PaymentError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let envelope = serde_json::from_str::<StripeErrorEnvelope>(&body).ok();
        let message = envelope
            .as_ref()
            .and_then(|e| e.error.message.clone())
            .unwrap_or(body);

        let error = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                PaymentError::authentication(format!("Stripe rejected API key: {}", message))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                PaymentError::rate_limited(format!("Stripe rate limit: {}", message))
            }
            _ => PaymentError::provider(format!("Stripe API error ({}): {}", status, message)),
        };

        match envelope.and_then(|e| e.error.code.or(e.error.error_type)) {
            Some(code) => error.with_provider_code(code),
            None => error,
        }
    }
}

/// Stripe ids are ASCII alphanumerics and underscores. Anything else would
/// change the request path.
fn is_valid_object_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, PaymentError> {
        if !is_valid_object_id(subscription_id) {
            return Err(PaymentError::invalid_request(format!(
                "Invalid subscription id: {:?}",
                subscription_id
            )));
        }

        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Stripe-Version", self.config.api_version.as_str())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(self.map_error_response(response).await);
        }

        let stripe_sub: StripeSubscription = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_send_error(e)
            } else {
                PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
            }
        })?;

        Ok(Some(stripe_sub.into_subscription()))
    }
}
