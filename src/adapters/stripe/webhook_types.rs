//! Stripe REST API response types.
//!
//! Only the fields needed to resolve a subscription's current price are
//! modelled. Stripe adds fields freely, so nothing here denies unknown keys.

use serde::{Deserialize, Serialize};

use crate::ports::{Subscription, SubscriptionStatus};

/// Stripe subscription object (`GET /v1/subscriptions/{id}`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscription {
    /// Unique subscription identifier (sub_...).
    pub id: String,

    /// Customer ID owning this subscription.
    #[serde(default)]
    pub customer: Option<String>,

    /// Subscription status.
    #[serde(default)]
    pub status: Option<String>,

    /// Subscription items (price/quantity pairs).
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

/// Subscription items container.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeSubscriptionItems {
    /// List of subscription items.
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

/// Single subscription item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscriptionItem {
    /// Item ID.
    #[serde(default)]
    pub id: Option<String>,

    /// Price object.
    #[serde(default)]
    pub price: Option<StripePrice>,
}

/// Stripe price object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePrice {
    /// Price ID (price_...).
    pub id: String,
}

impl StripeSubscription {
    /// Price of the first item, the one checkout creates.
    pub fn first_price_id(&self) -> Option<&str> {
        self.items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn into_subscription(self) -> Subscription {
        let price_id = self.first_price_id().map(str::to_string);
        Subscription {
            status: self
                .status
                .as_deref()
                .map(SubscriptionStatus::from_provider)
                .unwrap_or(SubscriptionStatus::Unknown),
            id: self.id,
            price_id,
            customer_id: self.customer,
        }
    }
}

/// Error envelope returned by the Stripe API on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorEnvelope {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
