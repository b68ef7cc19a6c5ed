//! SubscriptionResolver - Fetches the authoritative price of a subscription.

use std::sync::Arc;
use std::time::Duration;

use crate::ports::PaymentProvider;

/// Subscription with a usable price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSubscription {
    pub subscription_id: String,
    pub price_id: String,
}

/// Why a subscription could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveFailure {
    pub reason: String,
    /// True for transient provider failures (network, rate limit, timeout).
    pub retryable: bool,
}

impl ResolveFailure {
    fn permanent(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            retryable: false,
        }
    }
}

/// Looks up subscriptions through the payment provider with a hard deadline.
pub struct SubscriptionResolver {
    provider: Arc<dyn PaymentProvider>,
    timeout: Duration,
}

impl SubscriptionResolver {
    pub fn new(provider: Arc<dyn PaymentProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub async fn resolve(
        &self,
        subscription_ref: &str,
    ) -> Result<ResolvedSubscription, ResolveFailure> {
        let lookup = self.provider.get_subscription(subscription_ref);

        let subscription = match tokio::time::timeout(self.timeout, lookup).await {
            Err(_) => {
                return Err(ResolveFailure {
                    reason: format!(
                        "subscription lookup exceeded {}ms",
                        self.timeout.as_millis()
                    ),
                    retryable: true,
                })
            }
            Ok(Err(e)) => {
                return Err(ResolveFailure {
                    reason: e.to_string(),
                    retryable: e.retryable,
                })
            }
            Ok(Ok(None)) => {
                return Err(ResolveFailure::permanent("subscription not found"));
            }
            Ok(Ok(Some(subscription))) => subscription,
        };

        tracing::debug!(
            subscription_id = %subscription.id,
            status = ?subscription.status,
            customer_id = subscription.customer_id.as_deref().unwrap_or(""),
            "Resolved subscription"
        );

        match subscription.price_id {
            Some(price_id) if !price_id.is_empty() => Ok(ResolvedSubscription {
                subscription_id: subscription.id,
                price_id,
            }),
            _ => Err(ResolveFailure::permanent("subscription has no price")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::ports::{PaymentError, Subscription, SubscriptionStatus};

    fn resolver(mock: &MockPaymentProvider) -> SubscriptionResolver {
        SubscriptionResolver::new(Arc::new(mock.clone()), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn resolves_price_from_provider() {
        let mock = MockPaymentProvider::with_subscriptions([Subscription::active(
            "sub_1",
            "price_1SfKHZP1mCgTuXtUMhCioSyC",
        )]);

        let resolved = resolver(&mock).resolve("sub_1").await.unwrap();

        assert_eq!(
            resolved,
            ResolvedSubscription {
                subscription_id: "sub_1".into(),
                price_id: "price_1SfKHZP1mCgTuXtUMhCioSyC".into(),
            }
        );
        assert!(mock.was_called_with("get_subscription", "sub_1"));
    }

    #[tokio::test]
    async fn missing_subscription_is_permanent_failure() {
        let mock = MockPaymentProvider::new();

        let failure = resolver(&mock).resolve("sub_gone").await.unwrap_err();

        assert!(!failure.retryable);
        assert!(failure.reason.contains("not found"));
    }

    #[tokio::test]
    async fn subscription_without_price_fails() {
        let mock = MockPaymentProvider::with_subscriptions([Subscription {
            id: "sub_1".into(),
            price_id: None,
            customer_id: Some("cus_1".into()),
            status: SubscriptionStatus::Incomplete,
        }]);

        let failure = resolver(&mock).resolve("sub_1").await.unwrap_err();

        assert!(failure.reason.contains("no price"));
    }

    #[tokio::test]
    async fn provider_error_keeps_retryable_flag() {
        let mock = MockPaymentProvider::new();
        mock.fail_get_subscription(PaymentError::network("connection reset"));

        let failure = resolver(&mock).resolve("sub_1").await.unwrap_err();

        assert!(failure.retryable);
        assert!(failure.reason.contains("connection reset"));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let mock = MockPaymentProvider::with_subscriptions([Subscription::active(
            "sub_1", "price_1",
        )]);
        mock.set_delay(Duration::from_millis(500));
        let resolver = SubscriptionResolver::new(Arc::new(mock), Duration::from_millis(20));

        let failure = resolver.resolve("sub_1").await.unwrap_err();

        assert!(failure.retryable);
        assert!(failure.reason.contains("exceeded"));
    }
}
