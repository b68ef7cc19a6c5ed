//! Payment provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment provider configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key (sk_live_* / sk_test_* / rk_*)
    pub stripe_api_key: Option<SecretString>,

    /// Live-mode webhook signing secret (whsec_*)
    pub stripe_webhook_secret: Option<SecretString>,

    /// Test-mode webhook signing secret (whsec_*)
    pub stripe_webhook_secret_test: Option<SecretString>,

    /// Additional comma-separated signing secrets, used while rotating
    pub stripe_webhook_secrets: Option<SecretString>,

    /// Stripe API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Pinned Stripe API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-call timeout for subscription lookups in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Accepted signature age in seconds
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: i64,
}

impl PaymentConfig {
    /// Signing secrets in the order they are tried.
    ///
    /// Live secret first, then test, then any extras. Blank entries and
    /// repeats are dropped.
    pub fn signing_secrets(&self) -> Vec<SecretString> {
        let extras = self
            .stripe_webhook_secrets
            .as_ref()
            .map(|s| {
                s.expose_secret()
                    .split(',')
                    .map(|part| part.trim().to_string())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let candidates = [
            self.stripe_webhook_secret.as_ref(),
            self.stripe_webhook_secret_test.as_ref(),
        ]
        .into_iter()
        .flatten()
        .map(|s| s.expose_secret().trim().to_string())
        .chain(extras);

        let mut seen: Vec<String> = Vec::new();
        for secret in candidates {
            if !secret.is_empty() && !seen.contains(&secret) {
                seen.push(secret);
            }
        }
        seen.into_iter().map(SecretString::new).collect()
    }

    /// Check if using test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key
            .as_ref()
            .map(|k| k.expose_secret().contains("_test_"))
            .unwrap_or(false)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let key = self
            .stripe_api_key
            .as_ref()
            .ok_or(ValidationError::MissingRequired("payment.stripe_api_key"))?;
        let key = key.expose_secret();
        if !key.starts_with("sk_") && !key.starts_with("rk_") {
            return Err(ValidationError::InvalidStripeKey);
        }

        let secrets = self.signing_secrets();
        if secrets.is_empty() {
            return Err(ValidationError::MissingRequired(
                "payment.stripe_webhook_secret",
            ));
        }
        if secrets
            .iter()
            .any(|s| !s.expose_secret().starts_with("whsec_"))
        {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("payment.request_timeout_secs"));
        }
        if self.signature_tolerance_secs <= 0 {
            return Err(ValidationError::InvalidSignatureTolerance);
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: None,
            stripe_webhook_secret: None,
            stripe_webhook_secret_test: None,
            stripe_webhook_secrets: None,
            api_base_url: default_api_base_url(),
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout(),
            signature_tolerance_secs: default_signature_tolerance(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_api_version() -> String {
    "2023-10-16".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_signature_tolerance() -> i64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> Option<SecretString> {
        Some(SecretString::new(s.to_string()))
    }

    fn valid_config() -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: secret("sk_test_xxx"),
            stripe_webhook_secret: secret("whsec_live"),
            ..Default::default()
        }
    }

    fn exposed(secrets: Vec<SecretString>) -> Vec<String> {
        secrets
            .iter()
            .map(|s| s.expose_secret().clone())
            .collect()
    }

    #[test]
    fn test_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_restricted_key_accepted() {
        let config = PaymentConfig {
            stripe_api_key: secret("rk_live_xxx"),
            ..valid_config()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_api_key() {
        let config = PaymentConfig {
            stripe_api_key: None,
            ..valid_config()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("payment.stripe_api_key"))
        );
    }

    #[test]
    fn test_invalid_api_key() {
        let config = PaymentConfig {
            stripe_api_key: secret("pk_test_xxx"),
            ..valid_config()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidStripeKey));
    }

    #[test]
    fn test_missing_webhook_secret() {
        let config = PaymentConfig {
            stripe_webhook_secret: None,
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_invalid_webhook_secret() {
        let config = PaymentConfig {
            stripe_webhook_secret: secret("invalid"),
            ..valid_config()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn test_signing_secrets_order_and_dedup() {
        let config = PaymentConfig {
            stripe_webhook_secret_test: secret("whsec_test"),
            stripe_webhook_secrets: secret("whsec_old, whsec_live,, whsec_next"),
            ..valid_config()
        };

        assert_eq!(
            exposed(config.signing_secrets()),
            vec!["whsec_live", "whsec_test", "whsec_old", "whsec_next"]
        );
    }

    #[test]
    fn test_test_secret_alone_is_enough() {
        let config = PaymentConfig {
            stripe_webhook_secret: None,
            stripe_webhook_secret_test: secret("whsec_test"),
            ..valid_config()
        };
        assert!(config.validate().is_ok());
        assert_eq!(exposed(config.signing_secrets()), vec!["whsec_test"]);
    }

    #[test]
    fn test_is_test_mode() {
        assert!(valid_config().is_test_mode());

        let live = PaymentConfig {
            stripe_api_key: secret("sk_live_xxx"),
            ..valid_config()
        };
        assert!(!live.is_test_mode());
    }

    #[test]
    fn test_non_positive_tolerance_rejected() {
        let config = PaymentConfig {
            signature_tolerance_secs: 0,
            ..valid_config()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidSignatureTolerance)
        );
    }
}
