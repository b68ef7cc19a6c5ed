//! Stripe webhook signature verification.
//!
//! Implements verification of Stripe webhook signatures using HMAC-SHA256
//! against an ordered set of signing secrets (typically live first, then
//! test). Includes timestamp validation to prevent replay attacks.
//!
//! The signature covers `"{timestamp}." ++ body` where `body` is the exact
//! request bytes, so callers must hand over the body untouched.

use std::fmt;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use super::errors::VerificationError;
use super::webhook_event::WebhookEvent;

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age for webhook events (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Maximum allowed clock skew for future events (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components from the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// v1 signatures (HMAC-SHA256). Stripe sends one per active secret
    /// while a secret is being rolled.
    pub v1_signatures: Vec<Vec<u8>>,
    /// Optional v0 legacy signature.
    pub v0_signature: Option<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses a Stripe-Signature header string.
    ///
    /// Format: `t=<timestamp>,v1=<signature>[,v1=<signature>][,v0=<legacy>]`
    pub fn parse(header: &str) -> Result<Self, VerificationError> {
        let header = header.trim();
        if header.is_empty() {
            return Err(VerificationError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();
        let mut v0_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| malformed("invalid header format"))?;

            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| malformed("invalid timestamp"))?,
                    );
                }
                "v1" => {
                    v1_signatures.push(
                        hex::decode(value.trim())
                            .map_err(|_| malformed("invalid v1 signature hex"))?,
                    );
                }
                "v0" => {
                    v0_signature = Some(
                        hex::decode(value.trim())
                            .map_err(|_| malformed("invalid v0 signature hex"))?,
                    );
                }
                _ => {
                    // Ignore unknown fields for forward compatibility
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| malformed("missing timestamp"))?;
        if v1_signatures.is_empty() {
            return Err(malformed("missing v1 signature"));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
            v0_signature,
        })
    }
}

fn malformed(reason: &str) -> VerificationError {
    VerificationError::MalformedHeader(reason.to_string())
}

/// Returned when a secret set is built from an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("At least one webhook signing secret is required")]
pub struct EmptySecretSet;

/// Ordered, non-empty list of webhook signing secrets.
///
/// Immutable once built; clones share the same underlying list.
#[derive(Clone)]
pub struct SecretSet {
    secrets: Arc<[SecretString]>,
}

impl SecretSet {
    /// Builds a secret set, preserving order.
    pub fn new(secrets: Vec<SecretString>) -> Result<Self, EmptySecretSet> {
        if secrets.is_empty() {
            return Err(EmptySecretSet);
        }
        Ok(Self {
            secrets: secrets.into(),
        })
    }

    /// Number of configured secrets.
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Index of the first secret, in configured order, whose signature over
    /// `payload` appears in the header.
    pub fn first_match(&self, header: &SignatureHeader, payload: &[u8]) -> Option<usize> {
        self.secrets.iter().position(|secret| {
            compute_signature(secret.expose_secret().as_bytes(), header.timestamp, payload)
                .map(|expected| {
                    header
                        .v1_signatures
                        .iter()
                        .any(|candidate| constant_time_compare(&expected, candidate))
                })
                .unwrap_or(false)
        })
    }
}

impl fmt::Debug for SecretSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretSet")
            .field("len", &self.secrets.len())
            .finish()
    }
}

/// Verifier for Stripe webhook signatures.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secrets: SecretSet,
    tolerance_secs: i64,
}

impl SignatureVerifier {
    /// Creates a verifier with the default 5 minute replay tolerance.
    pub fn new(secrets: SecretSet) -> Self {
        Self {
            secrets,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Overrides the replay tolerance.
    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verifies the webhook signature and parses the event.
    ///
    /// # Verification Steps
    ///
    /// 1. Parse the signature header
    /// 2. Validate timestamp is within acceptable range
    /// 3. Find the first configured secret whose HMAC matches
    /// 4. Parse the JSON payload into a [`WebhookEvent`]
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, VerificationError> {
        self.verify_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// [`verify`](Self::verify) against an explicit clock.
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<WebhookEvent, VerificationError> {
        let header = SignatureHeader::parse(signature_header)?;

        self.validate_timestamp(header.timestamp, now)?;

        let secret_index = self
            .secrets
            .first_match(&header, payload)
            .ok_or(VerificationError::NoMatchingSecret)?;

        let event: WebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| VerificationError::UnparseablePayload(e.to_string()))?;

        tracing::debug!(
            event_id = %event.id,
            secret_index,
            "Webhook signature verified"
        );

        Ok(event)
    }

    /// Validates that the timestamp is within acceptable bounds.
    fn validate_timestamp(&self, timestamp: i64, now: i64) -> Result<(), VerificationError> {
        let age = now - timestamp;

        if age > self.tolerance_secs {
            return Err(VerificationError::TimestampOutsideTolerance { age_secs: age });
        }

        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(VerificationError::TimestampInFuture);
        }

        Ok(())
    }
}

/// Computes the HMAC-SHA256 signature over `"{timestamp}." ++ payload`.
///
/// Returns `None` only if the MAC rejects the key, which HMAC never does.
fn compute_signature(secret: &[u8], timestamp: i64, payload: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac.finalize().into_bytes().to_vec())
}

/// Builds a Stripe-Signature header value for `payload` signed with `secret`.
///
/// Useful for replaying captured payloads against a local instance.
pub fn sign_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signature = compute_signature(secret.as_bytes(), timestamp, payload)
        .map(hex::encode)
        .unwrap_or_default();
    format!("t={},v1={}", timestamp, signature)
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
