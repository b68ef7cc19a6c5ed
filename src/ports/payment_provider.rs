//! Payment provider port for authoritative subscription lookups.
//!
//! Webhook payloads can carry stale plan data, so the current price of a
//! subscription is always fetched from the provider before an entitlement
//! is granted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Get subscription by provider ID.
    ///
    /// Returns `Ok(None)` when the provider does not know the subscription.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, PaymentError>;
}

/// Subscription in the payment system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Provider's subscription ID.
    pub id: String,

    /// Price of the first subscription item, if the subscription has one.
    pub price_id: Option<String>,

    /// Provider's customer ID.
    pub customer_id: Option<String>,

    /// Current subscription status.
    pub status: SubscriptionStatus,
}

impl Subscription {
    /// Minimal active subscription; handy for tests and fakes.
    pub fn active(id: impl Into<String>, price_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            price_id: Some(price_id.into()),
            customer_id: None,
            status: SubscriptionStatus::Active,
        }
    }
}

/// Subscription status from payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Subscription is active and current.
    Active,

    /// Payment is past due, grace period active.
    PastDue,

    /// Subscription is canceled.
    Canceled,

    /// Subscription is in trial period.
    Trialing,

    /// Initial payment incomplete.
    Incomplete,

    /// Payment failed after retries exhausted.
    IncompleteExpired,

    /// Subscription is unpaid.
    Unpaid,

    /// Subscription is paused.
    Paused,

    /// Unknown status from provider.
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Parses the provider's status string, mapping anything new to `Unknown`.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "active" => Self::Active,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "trialing" => Self::Trialing,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "unpaid" => Self::Unpaid,
            "paused" => Self::Paused,
            _ => Self::Unknown,
        }
    }
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(
            PaymentErrorCode::NotFound,
            format!("{} not found", resource),
        )
    }

    /// Create a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::RateLimitExceeded, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Timeout, message)
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidRequest, message)
    }

    /// Create a provider API error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// Request did not complete in time.
    Timeout,

    /// API authentication failed.
    AuthenticationError,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Request rejected as invalid before reaching the provider.
    InvalidRequest,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::Timeout
                | PaymentErrorCode::RateLimitExceeded
                | PaymentErrorCode::ProviderError
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn payment_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn PaymentProvider) {}
    }

    #[test]
    fn subscription_status_from_provider() {
        assert_eq!(SubscriptionStatus::from_provider("active"), SubscriptionStatus::Active);
        assert_eq!(
            SubscriptionStatus::from_provider("incomplete_expired"),
            SubscriptionStatus::IncompleteExpired
        );
        assert_eq!(
            SubscriptionStatus::from_provider("something_new"),
            SubscriptionStatus::Unknown
        );
    }

    #[test]
    fn subscription_status_deserializes_unknown_values() {
        let status: SubscriptionStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(status, SubscriptionStatus::Paused);

        let status: SubscriptionStatus = serde_json::from_str("\"frozen\"").unwrap();
        assert_eq!(status, SubscriptionStatus::Unknown);
    }

    #[test]
    fn payment_error_retryable() {
        assert!(PaymentErrorCode::NetworkError.is_retryable());
        assert!(PaymentErrorCode::Timeout.is_retryable());
        assert!(PaymentErrorCode::RateLimitExceeded.is_retryable());

        assert!(!PaymentErrorCode::AuthenticationError.is_retryable());
        assert!(!PaymentErrorCode::NotFound.is_retryable());
        assert!(!PaymentErrorCode::InvalidRequest.is_retryable());
    }

    #[test]
    fn payment_error_carries_retryable_flag_from_code() {
        assert!(PaymentError::timeout("slow").retryable);
        assert!(!PaymentError::not_found("Subscription").retryable);
    }

    #[test]
    fn payment_error_display() {
        let err = PaymentError::not_found("Subscription sub_1");
        assert_eq!(err.to_string(), "not_found: Subscription sub_1 not found");
    }

    #[test]
    fn provider_code_is_attached() {
        let err = PaymentError::provider("boom").with_provider_code("api_error");
        assert_eq!(err.provider_code.as_deref(), Some("api_error"));
    }
}
