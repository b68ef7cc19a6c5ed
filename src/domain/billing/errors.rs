//! Verification error types for Stripe webhook handling.
//!
//! Every variant means the same thing to the delivering provider: the request
//! was not authenticated and must be redelivered. The variants exist so the
//! logs say *why*.

use http::StatusCode;
use thiserror::Error;

/// Errors that stop a delivery before it is authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// No Stripe-Signature header on the request.
    #[error("Missing signature header")]
    MissingHeader,

    /// Header present but not in `t=...,v1=...` form.
    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),

    /// Signed timestamp is older than the replay tolerance.
    #[error("Timestamp outside tolerance ({age_secs} seconds old)")]
    TimestampOutsideTolerance { age_secs: i64 },

    /// Signed timestamp is in the future beyond clock skew tolerance.
    #[error("Timestamp in the future")]
    TimestampInFuture,

    /// None of the configured secrets produced a matching signature.
    #[error("No signing secret matched")]
    NoMatchingSecret,

    /// Signature matched but the body is not a webhook event.
    #[error("Signed payload is not a webhook event: {0}")]
    UnparseablePayload(String),
}

impl VerificationError {
    /// Short machine-readable reason for structured logs.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::MalformedHeader(_) => "malformed_header",
            Self::TimestampOutsideTolerance { .. } => "timestamp_outside_tolerance",
            Self::TimestampInFuture => "timestamp_in_future",
            Self::NoMatchingSecret => "no_matching_secret",
            Self::UnparseablePayload(_) => "unparseable_payload",
        }
    }

    /// Every verification failure is answered with 400 so the provider
    /// redelivers.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}
