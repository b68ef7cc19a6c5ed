//! Stripe webhook event types.
//!
//! Defines the structures for parsing Stripe webhook payloads.
//! Only fields relevant to reconciliation and log correlation are captured;
//! the event-specific object stays as raw JSON until a handler asks for it.

use serde::{Deserialize, Serialize};

/// Stripe webhook event envelope (simplified).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    #[serde(default)]
    pub created: i64,

    /// Object containing event-specific data.
    pub data: WebhookEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,

    /// API version used to render this event. Stripe sends `null` for
    /// some legacy endpoints.
    #[serde(default)]
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Parse the event type into a known variant.
    pub fn parsed_type(&self) -> WebhookEventType {
        WebhookEventType::parse(&self.event_type)
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data.object)
    }
}

/// Event types with a handling path in this service.
///
/// Everything else is acknowledged without action so that new provider
/// event types never break delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEventType {
    /// Checkout session completed successfully.
    CheckoutSessionCompleted,
    /// Any other event type.
    Unhandled,
}

impl WebhookEventType {
    /// Parse event type from its wire string.
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            _ => Self::Unhandled,
        }
    }
}

/// Checkout session object as carried by `checkout.session.completed`.
///
/// Every field is optional: a session missing the email or the subscription
/// reference is a soft-skip, not a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSessionObject {
    /// Session identifier (cs_...).
    #[serde(default)]
    pub id: Option<String>,

    /// Customer details collected during checkout.
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,

    /// Email passed in when the session was created.
    #[serde(default)]
    pub customer_email: Option<String>,

    /// Subscription created by the session, as an id or an expanded object.
    #[serde(default)]
    pub subscription: Option<ExpandableId>,
}

/// Customer details block of a checkout session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

/// A Stripe "expandable" reference: either the bare id or the full object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ExpandableId {
    Id(String),
    Object { id: String },
}

impl ExpandableId {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Object { id } => id,
        }
    }
}

impl CheckoutSessionObject {
    /// Customer email, preferring the details collected at checkout over the
    /// session-level email. Blank values count as absent.
    pub fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|details| non_blank(details.email.as_deref()))
            .or_else(|| non_blank(self.customer_email.as_deref()))
    }

    /// Subscription id created by the checkout, if any.
    pub fn subscription_ref(&self) -> Option<&str> {
        non_blank(self.subscription.as_ref().map(ExpandableId::id))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Builder for creating test WebhookEvent instances.
#[cfg(test)]
pub struct WebhookEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
    livemode: bool,
}

#[cfg(test)]
impl Default for WebhookEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "checkout.session.completed".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
            livemode: false,
        }
    }
}

#[cfg(test)]
impl WebhookEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn livemode(mut self, livemode: bool) -> Self {
        self.livemode = livemode;
        self
    }

    pub fn build(self) -> WebhookEvent {
        WebhookEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: WebhookEventData {
                object: self.object,
            },
            livemode: self.livemode,
            api_version: Some("2023-10-16".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ══════════════════════════════════════════════════════════════
    // Envelope Deserialization Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn deserialize_minimal_event() {
        let json = r#"{
            "id": "evt_1234567890",
            "type": "checkout.session.completed",
            "created": 1704067200,
            "data": {
                "object": {}
            },
            "livemode": false,
            "api_version": "2023-10-16"
        }"#;

        let event: WebhookEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.id, "evt_1234567890");
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.created, 1704067200);
        assert!(!event.livemode);
        assert_eq!(event.api_version.as_deref(), Some("2023-10-16"));
    }

    #[test]
    fn deserialize_event_with_null_api_version() {
        let json = r#"{
            "id": "evt_legacy",
            "type": "invoice.paid",
            "created": 1704067200,
            "data": {"object": {"id": "in_1"}},
            "livemode": true,
            "api_version": null
        }"#;

        let event: WebhookEvent = serde_json::from_str(json).unwrap();

        assert!(event.api_version.is_none());
        assert!(event.livemode);
    }

    #[test]
    fn deserialize_event_without_data_fails() {
        let json = r#"{"id": "evt_1", "type": "checkout.session.completed"}"#;
        assert!(serde_json::from_str::<WebhookEvent>(json).is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Event Type Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn checkout_completed_is_handled() {
        assert_eq!(
            WebhookEventType::parse("checkout.session.completed"),
            WebhookEventType::CheckoutSessionCompleted
        );
    }

    #[test]
    fn other_types_are_unhandled() {
        for event_type in [
            "checkout.session.expired",
            "invoice.paid",
            "customer.subscription.deleted",
            "some.future.event",
        ] {
            assert_eq!(
                WebhookEventType::parse(event_type),
                WebhookEventType::Unhandled
            );
        }
    }

    #[test]
    fn parsed_type_uses_event_type_field() {
        let event = WebhookEventBuilder::new().event_type("invoice.paid").build();
        assert_eq!(event.parsed_type(), WebhookEventType::Unhandled);
    }

    // ══════════════════════════════════════════════════════════════
    // Checkout Session Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn email_prefers_customer_details() {
        let event = WebhookEventBuilder::new()
            .object(json!({
                "id": "cs_1",
                "customer_details": {"email": "details@x.com"},
                "customer_email": "session@x.com",
                "subscription": "sub_1"
            }))
            .build();

        let session: CheckoutSessionObject = event.deserialize_object().unwrap();

        assert_eq!(session.email(), Some("details@x.com"));
        assert_eq!(session.subscription_ref(), Some("sub_1"));
    }

    #[test]
    fn email_falls_back_to_session_email() {
        let session: CheckoutSessionObject = serde_json::from_value(json!({
            "customer_details": {"email": null},
            "customer_email": "session@x.com"
        }))
        .unwrap();

        assert_eq!(session.email(), Some("session@x.com"));
    }

    #[test]
    fn blank_email_counts_as_missing() {
        let session: CheckoutSessionObject = serde_json::from_value(json!({
            "customer_details": {"email": ""},
            "customer_email": "   "
        }))
        .unwrap();

        assert_eq!(session.email(), None);
    }

    #[test]
    fn expanded_subscription_object_yields_id() {
        let session: CheckoutSessionObject = serde_json::from_value(json!({
            "subscription": {"id": "sub_expanded", "object": "subscription", "status": "active"}
        }))
        .unwrap();

        assert_eq!(session.subscription_ref(), Some("sub_expanded"));
    }

    #[test]
    fn null_subscription_is_missing() {
        let session: CheckoutSessionObject =
            serde_json::from_value(json!({"subscription": null})).unwrap();

        assert_eq!(session.subscription_ref(), None);
    }
}
