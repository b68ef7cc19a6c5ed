//! User directory configuration (Firestore)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::billing::DuplicateEmailPolicy;

/// User directory configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Google Cloud project holding the directory
    pub project_id: Option<String>,

    /// Service account email used as the token issuer
    pub client_email: Option<String>,

    /// Service account private key (PEM, `\n` escapes allowed)
    pub private_key: Option<SecretString>,

    /// Collection holding one document per user
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Firestore REST base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// OAuth token endpoint for the service account
    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    /// Local emulator `host:port`; disables service account auth
    pub emulator_host: Option<String>,

    /// Per-call timeout for lookups and writes in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// What to do when several records share a checkout email
    #[serde(default)]
    pub duplicate_email_policy: DuplicateEmailPolicy,
}

impl DirectoryConfig {
    /// Check if talking to a local emulator
    pub fn is_emulator(&self) -> bool {
        self.emulator_host
            .as_deref()
            .map(|h| !h.trim().is_empty())
            .unwrap_or(false)
    }

    /// Validate directory configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_id.as_deref().map_or(true, str::is_empty) {
            return Err(ValidationError::MissingRequired("directory.project_id"));
        }

        if self.collection.is_empty() || self.collection.contains('/') {
            return Err(ValidationError::InvalidCollection);
        }

        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout(
                "directory.request_timeout_secs",
            ));
        }

        if self.is_emulator() {
            return Ok(());
        }

        if self.client_email.as_deref().map_or(true, str::is_empty) {
            return Err(ValidationError::MissingRequired("directory.client_email"));
        }

        let key = self
            .private_key
            .as_ref()
            .ok_or(ValidationError::MissingRequired("directory.private_key"))?;
        if !key.expose_secret().contains("PRIVATE KEY") {
            return Err(ValidationError::InvalidPrivateKey);
        }

        Ok(())
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            client_email: None,
            private_key: None,
            collection: default_collection(),
            base_url: default_base_url(),
            token_uri: default_token_uri(),
            emulator_host: None,
            request_timeout_secs: default_request_timeout(),
            duplicate_email_policy: DuplicateEmailPolicy::default(),
        }
    }
}

fn default_collection() -> String {
    "users".to_string()
}

fn default_base_url() -> String {
    "https://firestore.googleapis.com".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_request_timeout() -> u64 {
    10
}
