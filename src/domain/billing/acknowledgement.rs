//! Maps processing results to the HTTP answer the provider sees.
//!
//! Only an authentication failure is answered with a non-2xx status.
//! Business-logic failures are acknowledged so the provider stops retrying;
//! they are surfaced through logs instead.

use http::StatusCode;
use serde::Serialize;

use super::errors::VerificationError;
use super::outcome::WebhookOutcome;

/// Error code returned for every verification failure.
pub const INVALID_SIGNATURE_CODE: &str = "INVALID_SIGNATURE";

/// Message returned for every verification failure. Intentionally vague.
pub const INVALID_SIGNATURE_MESSAGE: &str = "Webhook Error";

/// JSON body of an acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AckBody {
    Received { received: bool },
    Rejected { error_code: String, message: String },
}

/// Status and body to send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    pub status: StatusCode,
    pub body: AckBody,
}

impl Acknowledgement {
    pub fn received() -> Self {
        Self {
            status: StatusCode::OK,
            body: AckBody::Received { received: true },
        }
    }

    pub fn invalid_signature() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: AckBody::Rejected {
                error_code: INVALID_SIGNATURE_CODE.to_string(),
                message: INVALID_SIGNATURE_MESSAGE.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AckResponder;

impl AckResponder {
    pub fn respond(result: &Result<WebhookOutcome, VerificationError>) -> Acknowledgement {
        match result {
            Ok(_) => Acknowledgement::received(),
            Err(_) => Acknowledgement::invalid_signature(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_outcomes() -> Vec<WebhookOutcome> {
        vec![
            WebhookOutcome::Updated {
                user_id: "u1".into(),
                role: "premium".into(),
                price_id: "price_1".into(),
                subscription_id: "sub_1".into(),
            },
            WebhookOutcome::Ignored {
                event_type: "invoice.paid".into(),
            },
            WebhookOutcome::MalformedEvent {
                reason: "missing customer email".into(),
            },
            WebhookOutcome::UnresolvedSubscription {
                subscription_id: "sub_1".into(),
                reason: "not found".into(),
                retryable: false,
            },
            WebhookOutcome::UnknownEntitlement {
                subscription_id: "sub_1".into(),
                price_id: "price_x".into(),
            },
            WebhookOutcome::UserNotFound,
            WebhookOutcome::AmbiguousUser { matches: 2 },
            WebhookOutcome::ReconciliationError {
                reason: "timeout".into(),
                retryable: true,
            },
        ]
    }

    #[test]
    fn every_outcome_is_acknowledged() {
        for outcome in all_outcomes() {
            let ack = AckResponder::respond(&Ok(outcome.clone()));
            assert_eq!(ack.status, StatusCode::OK, "{outcome}");
            assert_eq!(ack.body, AckBody::Received { received: true });
        }
    }

    #[test]
    fn verification_failure_is_bad_request() {
        let ack = AckResponder::respond(&Err(VerificationError::NoMatchingSecret));

        assert_eq!(ack.status, StatusCode::BAD_REQUEST);
        assert_eq!(ack, Acknowledgement::invalid_signature());
    }

    #[test]
    fn bodies_serialize_to_wire_shape() {
        let received = serde_json::to_value(&Acknowledgement::received().body).unwrap();
        assert_eq!(received, serde_json::json!({"received": true}));

        let rejected = serde_json::to_value(&Acknowledgement::invalid_signature().body).unwrap();
        assert_eq!(
            rejected,
            serde_json::json!({"error_code": "INVALID_SIGNATURE", "message": "Webhook Error"})
        );
    }
}
