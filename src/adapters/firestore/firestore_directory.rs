//! Firestore REST implementation of `UserDirectory`.
//!
//! Users live in a single collection keyed by an opaque document id and are
//! located by an `email` equality query. Entitlement writes go through
//! `:commit` so the field overwrite and the server timestamp land together.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::ports::{BillingMetadata, DirectoryError, EntitlementUpdate, UserDirectory, UserRecord};

use super::service_account::AccessTokenSource;

/// Default Firestore REST origin.
pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com";

/// Directory field names.
pub mod fields {
    pub const EMAIL: &str = "email";
    pub const ROLE: &str = "role";
    pub const PRICE_ID: &str = "stripePriceId";
    pub const SUBSCRIPTION_ID: &str = "stripeSubscriptionId";
    pub const LAST_PAYMENT: &str = "lastPayment";
}

/// Firestore connection settings.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    pub collection: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: "(default)".to_string(),
            collection: "users".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Points at a local emulator (`host:port`).
    pub fn with_emulator_host(self, host: &str) -> Self {
        self.with_base_url(format!("http://{}", host))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `projects/{p}/databases/{d}/documents`
    fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database
        )
    }

    fn document_name(&self, user_id: &str) -> String {
        format!("{}/{}/{}", self.documents_root(), self.collection, user_id)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1/{}:{}", self.base_url, self.documents_root(), method)
    }
}

/// Firestore-backed user directory.
pub struct FirestoreUserDirectory {
    config: FirestoreConfig,
    tokens: Arc<dyn AccessTokenSource>,
    http_client: Client,
}

impl FirestoreUserDirectory {
    pub fn new(
        config: FirestoreConfig,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, DirectoryError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DirectoryError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            tokens,
            http_client,
        })
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response, DirectoryError> {
        let token = self.tokens.access_token().await?;

        let response = self
            .http_client
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(map_send_error)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(map_error_response(response).await)
        }
    }
}

fn map_send_error(e: reqwest::Error) -> DirectoryError {
    if e.is_timeout() {
        DirectoryError::Network(format!("Directory request timed out: {}", e))
    } else {
        DirectoryError::Network(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

async fn map_error_response(response: reqwest::Response) -> DirectoryError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) => format!("{}: {}", code, envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) => body,
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DirectoryError::Authentication(message),
        StatusCode::NOT_FOUND => DirectoryError::NotFound(message),
        _ => DirectoryError::Backend {
            status: status.as_u16(),
            message,
        },
    }
}

/// One element of a `:runQuery` response stream.
#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<FirestoreDocument>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

impl FirestoreDocument {
    fn into_user_record(self) -> Result<UserRecord, DirectoryError> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                DirectoryError::InvalidResponse(format!("Bad document name: {}", self.name))
            })?
            .to_string();

        Ok(UserRecord {
            id,
            email: string_field(&self.fields, fields::EMAIL).unwrap_or_default(),
            role: string_field(&self.fields, fields::ROLE),
            billing: BillingMetadata {
                price_id: string_field(&self.fields, fields::PRICE_ID),
                subscription_id: string_field(&self.fields, fields::SUBSCRIPTION_ID),
                last_payment: timestamp_field(&self.fields, fields::LAST_PAYMENT),
            },
        })
    }
}

fn string_field(fields: &HashMap<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)?
        .get("stringValue")?
        .as_str()
        .map(str::to_string)
}

fn timestamp_field(fields: &HashMap<String, Value>, name: &str) -> Option<DateTime<Utc>> {
    let raw = fields.get(name)?.get("timestampValue")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

/// Document ids may not contain `/` and may not be `.` or `..`.
fn is_valid_document_id(id: &str) -> bool {
    !id.is_empty() && !id.contains('/') && id != "." && id != ".."
}

#[async_trait]
impl UserDirectory for FirestoreUserDirectory {
    async fn find_by_email(
        &self,
        email: &str,
        limit: usize,
    ) -> Result<Vec<UserRecord>, DirectoryError> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": self.config.collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": fields::EMAIL },
                        "op": "EQUAL",
                        "value": string_value(email)
                    }
                },
                "limit": limit
            }
        });

        let response = self.post(&self.config.endpoint("runQuery"), &body).await?;

        let items: Vec<RunQueryItem> = response.json().await.map_err(|e| {
            DirectoryError::InvalidResponse(format!("Failed to parse query response: {}", e))
        })?;

        items
            .into_iter()
            .filter_map(|item| item.document)
            .take(limit)
            .map(FirestoreDocument::into_user_record)
            .collect()
    }

    async fn apply_entitlement(
        &self,
        user_id: &str,
        update: &EntitlementUpdate,
    ) -> Result<(), DirectoryError> {
        if !is_valid_document_id(user_id) {
            return Err(DirectoryError::NotFound(format!(
                "Invalid document id: {:?}",
                user_id
            )));
        }

        let body = json!({
            "writes": [{
                "update": {
                    "name": self.config.document_name(user_id),
                    "fields": {
                        (fields::ROLE): string_value(&update.role),
                        (fields::PRICE_ID): string_value(&update.price_id),
                        (fields::SUBSCRIPTION_ID): string_value(&update.subscription_id)
                    }
                },
                "updateMask": {
                    "fieldPaths": [fields::ROLE, fields::PRICE_ID, fields::SUBSCRIPTION_ID]
                },
                "updateTransforms": [{
                    "fieldPath": fields::LAST_PAYMENT,
                    "setToServerValue": "REQUEST_TIME"
                }],
                "currentDocument": { "exists": true }
            }]
        });

        self.post(&self.config.endpoint("commit"), &body).await?;

        tracing::debug!(
            user_id,
            collection = %self.config.collection,
            "Committed entitlement update"
        );

        Ok(())
    }
}
