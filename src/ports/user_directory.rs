//! UserDirectory port - Interface for the external user record store.
//!
//! Records are located by email and carry the entitlement role plus the
//! billing fields that justify it. The reconciliation pipeline only ever
//! overwrites those fields as a whole, so applying the same update twice
//! leaves the record exactly as applying it once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Port for reading and updating user records.
///
/// # Example
///
/// ```ignore
/// let matches = directory.find_by_email("a@x.com", 2).await?;
/// if let Some(user) = matches.first() {
///     directory.apply_entitlement(&user.id, &update).await?;
/// }
/// ```
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns up to `limit` records whose email equals `email` exactly.
    ///
    /// Order is whatever the backing store returns.
    async fn find_by_email(
        &self,
        email: &str,
        limit: usize,
    ) -> Result<Vec<UserRecord>, DirectoryError>;

    /// Overwrites the role and billing fields of an existing record in one
    /// atomic write and stamps `last_payment` with the store's clock.
    ///
    /// Fails with [`DirectoryError::NotFound`] if the record vanished.
    async fn apply_entitlement(
        &self,
        user_id: &str,
        update: &EntitlementUpdate,
    ) -> Result<(), DirectoryError>;
}

/// A user record as stored in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Store-assigned document id.
    pub id: String,
    pub email: String,
    /// Current entitlement role, if one was ever granted.
    pub role: Option<String>,
    pub billing: BillingMetadata,
}

impl UserRecord {
    /// A record with no entitlement yet.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role: None,
            billing: BillingMetadata::default(),
        }
    }
}

/// Billing fields written alongside the role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingMetadata {
    pub price_id: Option<String>,
    pub subscription_id: Option<String>,
    pub last_payment: Option<DateTime<Utc>>,
}

/// Fields overwritten by a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementUpdate {
    pub role: String,
    pub price_id: String,
    pub subscription_id: String,
}

/// Errors from directory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("Directory unreachable: {0}")]
    Network(String),

    #[error("Directory authentication failed: {0}")]
    Authentication(String),

    #[error("Directory record not found: {0}")]
    NotFound(String),

    #[error("Directory returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Unexpected directory response: {0}")]
    InvalidResponse(String),
}

impl DirectoryError {
    /// Whether replaying the delivery later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Backend { status, .. } => *status == 429 || *status >= 500,
            Self::Authentication(_) | Self::NotFound(_) | Self::InvalidResponse(_) => false,
        }
    }
}
