//! UserReconciler - Writes an entitlement onto the directory record for an email.
//!
//! The write is a full overwrite of role, price and subscription, so
//! replaying it converges on the same record regardless of how many times or
//! in what order duplicate deliveries arrive.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::billing::{DuplicateEmailPolicy, WebhookOutcome};
use crate::ports::{DirectoryError, EntitlementUpdate, UserDirectory};

/// Matches requested per lookup; two is enough to detect duplicates.
const LOOKUP_LIMIT: usize = 2;

/// Looks up and updates directory records with a hard deadline per call.
pub struct UserReconciler {
    directory: Arc<dyn UserDirectory>,
    timeout: Duration,
    duplicate_policy: DuplicateEmailPolicy,
}

impl UserReconciler {
    pub fn new(directory: Arc<dyn UserDirectory>, timeout: Duration) -> Self {
        Self {
            directory,
            timeout,
            duplicate_policy: DuplicateEmailPolicy::default(),
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicateEmailPolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Returns `Updated`, `UserNotFound`, `AmbiguousUser` or `ReconciliationError`.
    pub async fn reconcile(
        &self,
        email: &str,
        role: &str,
        price_id: &str,
        subscription_id: &str,
    ) -> WebhookOutcome {
        let matches = match self
            .bounded(self.directory.find_by_email(email, LOOKUP_LIMIT), "lookup")
            .await
        {
            Ok(matches) => matches,
            Err(outcome) => return outcome,
        };

        let user = match matches.as_slice() {
            [] => return WebhookOutcome::UserNotFound,
            [only] => only,
            [first, ..] => {
                tracing::warn!(
                    matches = matches.len(),
                    policy = %self.duplicate_policy,
                    "Multiple directory records share this email"
                );
                match self.duplicate_policy {
                    DuplicateEmailPolicy::FirstMatch => first,
                    DuplicateEmailPolicy::Reject => {
                        return WebhookOutcome::AmbiguousUser {
                            matches: matches.len(),
                        }
                    }
                }
            }
        };

        let update = EntitlementUpdate {
            role: role.to_string(),
            price_id: price_id.to_string(),
            subscription_id: subscription_id.to_string(),
        };

        if let Err(outcome) = self
            .bounded(self.directory.apply_entitlement(&user.id, &update), "write")
            .await
        {
            return outcome;
        }

        WebhookOutcome::Updated {
            user_id: user.id.clone(),
            role: update.role,
            price_id: update.price_id,
            subscription_id: update.subscription_id,
        }
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, DirectoryError>>,
        stage: &str,
    ) -> Result<T, WebhookOutcome> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(WebhookOutcome::ReconciliationError {
                reason: format!("directory {} failed: {}", stage, e),
                retryable: e.is_retryable(),
            }),
            Err(_) => Err(WebhookOutcome::ReconciliationError {
                reason: format!(
                    "directory {} exceeded {}ms",
                    stage,
                    self.timeout.as_millis()
                ),
                retryable: true,
            }),
        }
    }
}
