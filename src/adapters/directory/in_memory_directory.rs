//! In-memory user directory for tests and local runs.
//!
//! Keeps records in insertion order so "first match" is deterministic, and
//! records every entitlement write for assertions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::ports::{DirectoryError, EntitlementUpdate, UserDirectory, UserRecord};

/// In-memory `UserDirectory`.
///
/// # Example
///
/// ```ignore
/// let directory = InMemoryUserDirectory::new();
/// directory.seed(UserRecord::new("u1", "a@x.com")).await;
///
/// // ... run the pipeline ...
///
/// assert_eq!(directory.write_count(), 1);
/// assert_eq!(directory.get("u1").await.unwrap().role.as_deref(), Some("premium"));
/// ```
#[derive(Default)]
pub struct InMemoryUserDirectory {
    records: RwLock<Vec<UserRecord>>,
    writes: RwLock<Vec<(String, EntitlementUpdate)>>,
    write_count: AtomicUsize,
    find_error: RwLock<Option<DirectoryError>>,
    apply_error: RwLock<Option<DirectoryError>>,
    delay: RwLock<Option<Duration>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Adds a record.
    pub async fn seed(&self, record: UserRecord) {
        self.records.write().await.push(record);
    }

    /// Current state of a record.
    pub async fn get(&self, user_id: &str) -> Option<UserRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == user_id)
            .cloned()
    }

    /// Number of successful `apply_entitlement` calls.
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Every successful write, in order.
    pub async fn writes(&self) -> Vec<(String, EntitlementUpdate)> {
        self.writes.read().await.clone()
    }

    /// Makes every `find_by_email` fail until cleared.
    pub async fn fail_find(&self, error: DirectoryError) {
        *self.find_error.write().await = Some(error);
    }

    /// Makes every `apply_entitlement` fail until cleared.
    pub async fn fail_apply(&self, error: DirectoryError) {
        *self.apply_error.write().await = Some(error);
    }

    pub async fn clear_errors(&self) {
        *self.find_error.write().await = None;
        *self.apply_error.write().await = None;
    }

    /// Sleeps this long before each operation.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    async fn pause(&self) {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(
        &self,
        email: &str,
        limit: usize,
    ) -> Result<Vec<UserRecord>, DirectoryError> {
        self.pause().await;

        if let Some(error) = self.find_error.read().await.clone() {
            return Err(error);
        }

        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.email == email)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn apply_entitlement(
        &self,
        user_id: &str,
        update: &EntitlementUpdate,
    ) -> Result<(), DirectoryError> {
        self.pause().await;

        if let Some(error) = self.apply_error.read().await.clone() {
            return Err(error);
        }

        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == user_id)
            .ok_or_else(|| DirectoryError::NotFound(user_id.to_string()))?;

        record.role = Some(update.role.clone());
        record.billing.price_id = Some(update.price_id.clone());
        record.billing.subscription_id = Some(update.subscription_id.clone());
        record.billing.last_payment = Some(Utc::now());
        drop(records);

        self.writes
            .write()
            .await
            .push((user_id.to_string(), update.clone()));
        self.write_count.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }
}
