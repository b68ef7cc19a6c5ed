//! Mock payment provider for testing.
//!
//! Provides a configurable mock implementation of `PaymentProvider` for unit
//! and integration tests. Supports:
//! - Pre-configured subscriptions
//! - Error injection
//! - Artificial latency
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{PaymentError, PaymentProvider, Subscription};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.add_subscription(Subscription::active("sub_1", "price_abc"));
/// mock.fail_next_get_subscription(PaymentError::network("reset"));
///
/// let result = mock.get_subscription("sub_1").await;
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentProvider {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// Pre-configured subscriptions by ID.
    subscriptions: HashMap<String, Subscription>,

    /// Error to return on the next call only.
    next_error: Option<PaymentError>,

    /// Error to return on every call.
    persistent_error: Option<PaymentError>,

    /// Delay applied before answering.
    delay: Option<Duration>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    /// Create a new mock provider with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that knows the given subscriptions.
    pub fn with_subscriptions(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        let mock = Self::new();
        for subscription in subscriptions {
            mock.add_subscription(subscription);
        }
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Add a subscription to the "database".
    pub fn add_subscription(&self, subscription: Subscription) {
        let id = subscription.id.clone();
        self.state().subscriptions.insert(id, subscription);
    }

    /// Fail the next `get_subscription` call only.
    pub fn fail_next_get_subscription(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Fail every `get_subscription` call until cleared.
    pub fn fail_get_subscription(&self, error: PaymentError) {
        self.state().persistent_error = Some(error);
    }

    /// Remove any injected errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.persistent_error = None;
    }

    /// Sleep this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertion Helpers
    // ════════════════════════════════════════════════════════════════════════════

    /// All recorded calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    /// Number of calls to `method`.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    /// Whether `method` was called with `arg` as its first argument.
    pub fn was_called_with(&self, method: &str, arg: &str) -> bool {
        self.state()
            .call_log
            .iter()
            .any(|call| call.method == method && call.args.first().map(String::as_str) == Some(arg))
    }

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self) -> Result<(), PaymentError> {
        let mut state = self.state();
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        match &state.persistent_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, PaymentError> {
        self.record_call("get_subscription", vec![subscription_id.to_string()]);

        let delay = self.state().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.check_error()?;

        Ok(self.state().subscriptions.get(subscription_id).cloned())
    }
}
