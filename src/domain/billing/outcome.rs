//! Terminal states of an authenticated webhook delivery.

use std::fmt;

/// Where processing of an authenticated event stopped.
///
/// None of these cause provider redelivery; see `AckResponder`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Directory record overwritten with the new entitlement.
    Updated {
        user_id: String,
        role: String,
        price_id: String,
        subscription_id: String,
    },
    /// Event type has no handling path.
    Ignored { event_type: String },
    /// Handled event missing an email or subscription reference.
    MalformedEvent { reason: String },
    /// Provider lookup failed or returned no price.
    UnresolvedSubscription {
        subscription_id: String,
        reason: String,
        retryable: bool,
    },
    /// Resolved price has no role in the price table.
    UnknownEntitlement {
        subscription_id: String,
        price_id: String,
    },
    /// No directory record for the email.
    UserNotFound,
    /// Several records share the email and the policy refuses to pick one.
    AmbiguousUser { matches: usize },
    /// Directory read or write failed.
    ReconciliationError { reason: String, retryable: bool },
}

impl WebhookOutcome {
    /// Stable snake_case label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Updated { .. } => "updated",
            Self::Ignored { .. } => "ignored",
            Self::MalformedEvent { .. } => "malformed_event",
            Self::UnresolvedSubscription { .. } => "unresolved_subscription",
            Self::UnknownEntitlement { .. } => "unknown_entitlement",
            Self::UserNotFound => "user_not_found",
            Self::AmbiguousUser { .. } => "ambiguous_user",
            Self::ReconciliationError { .. } => "reconciliation_error",
        }
    }

    /// True if a directory record was written.
    pub fn is_update(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

impl fmt::Display for WebhookOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_snake_case_labels() {
        assert_eq!(WebhookOutcome::UserNotFound.kind(), "user_not_found");
        assert_eq!(
            WebhookOutcome::AmbiguousUser { matches: 2 }.to_string(),
            "ambiguous_user"
        );
    }

    #[test]
    fn only_updated_is_update() {
        let updated = WebhookOutcome::Updated {
            user_id: "u1".into(),
            role: "premium".into(),
            price_id: "price_1".into(),
            subscription_id: "sub_1".into(),
        };
        assert!(updated.is_update());
        assert!(!WebhookOutcome::UserNotFound.is_update());
        assert!(!WebhookOutcome::Ignored {
            event_type: "invoice.paid".into()
        }
        .is_update());
    }
}
