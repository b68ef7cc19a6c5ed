//! Google service account OAuth for the Firestore REST API.
//!
//! Exchanges a self-signed RS256 assertion for a short-lived bearer token
//! (the JWT bearer grant) and caches it until shortly before expiry.
//!
//! # Caching
//!
//! Tokens are cached behind a `tokio::sync::RwLock`. Readers share the
//! cached token; a refresh takes the write lock and re-checks before
//! fetching so concurrent deliveries trigger at most one exchange.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::ports::DirectoryError;

/// OAuth scope granting Firestore document access.
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Default Google OAuth token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion. Google caps this at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh this long before the token actually expires.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Source of bearer tokens for directory requests.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<SecretString, DirectoryError>;
}

/// Service account identity used to sign token requests.
#[derive(Clone)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    private_key: SecretString,
    pub token_uri: String,
}

impl ServiceAccountCredentials {
    /// Builds credentials, decoding literal `\n` sequences in the key.
    ///
    /// Keys pasted into single-line environment variables arrive escaped.
    pub fn new(
        client_email: impl Into<String>,
        private_key: &str,
        token_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_email: client_email.into(),
            private_key: SecretString::new(decode_private_key(private_key)),
            token_uri: token_uri.into(),
        }
    }

    pub fn private_key(&self) -> &SecretString {
        &self.private_key
    }
}

impl std::fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Turns literal `\n` escape sequences into real newlines.
pub fn decode_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS as u64
}

struct CachedToken {
    token: SecretString,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }
}

/// Token source backed by a service account key.
pub struct ServiceAccountTokenSource {
    credentials: ServiceAccountCredentials,
    encoding_key: EncodingKey,
    http_client: reqwest::Client,
    cache: Arc<RwLock<Option<CachedToken>>>,
}

impl ServiceAccountTokenSource {
    /// Parses the private key up front so a bad key fails at startup.
    pub fn new(
        credentials: ServiceAccountCredentials,
        timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let encoding_key =
            EncodingKey::from_rsa_pem(credentials.private_key.expose_secret().as_bytes())
                .map_err(|e| {
                    DirectoryError::Authentication(format!("Invalid service account key: {}", e))
                })?;

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            encoding_key,
            http_client,
            cache: Arc::new(RwLock::new(None)),
        })
    }

    fn sign_assertion(&self, now: i64) -> Result<String, DirectoryError> {
        let claims = AssertionClaims {
            iss: self.credentials.client_email.clone(),
            scope: DATASTORE_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| DirectoryError::Authentication(format!("Failed to sign assertion: {}", e)))
    }

    async fn fetch_token(&self) -> Result<CachedToken, DirectoryError> {
        let assertion = self.sign_assertion(chrono::Utc::now().timestamp())?;

        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| DirectoryError::Network(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_server_error() {
                DirectoryError::Backend {
                    status: status.as_u16(),
                    message: body,
                }
            } else {
                DirectoryError::Authentication(format!("Token exchange rejected ({}): {}", status, body))
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            DirectoryError::InvalidResponse(format!("Failed to parse token response: {}", e))
        })?;

        tracing::debug!(
            client_email = %self.credentials.client_email,
            expires_in = token.expires_in,
            "Fetched directory access token"
        );

        Ok(CachedToken {
            token: SecretString::new(token.access_token),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<SecretString, DirectoryError> {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.is_fresh() {
                    return Ok(cached.token.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(ref cached) = *cache {
            if cached.is_fresh() {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }
}

impl std::fmt::Debug for ServiceAccountTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountTokenSource")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// Fixed token, used against the Firestore emulator.
#[derive(Clone)]
pub struct StaticTokenSource {
    token: SecretString,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token.into()),
        }
    }

    /// The emulator accepts `owner` as an all-access token.
    pub fn emulator() -> Self {
        Self::new("owner")
    }
}

#[async_trait]
impl AccessTokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<SecretString, DirectoryError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PRIVATE_KEY: &str = include_str!("../../../tests/fixtures/test_service_account_key.pem");
    const PUBLIC_KEY: &str =
        include_str!("../../../tests/fixtures/test_service_account_key.pub.pem");
    const CLIENT_EMAIL: &str = "sync@demo-project.iam.gserviceaccount.com";

    fn source_for(server: &MockServer) -> ServiceAccountTokenSource {
        let credentials = ServiceAccountCredentials::new(
            CLIENT_EMAIL,
            PRIVATE_KEY,
            format!("{}/token", server.uri()),
        );
        ServiceAccountTokenSource::new(credentials, Duration::from_secs(5)).unwrap()
    }

    fn token_body(token: &str, expires_in: u64) -> serde_json::Value {
        json!({"access_token": token, "expires_in": expires_in, "token_type": "Bearer"})
    }

    // ══════════════════════════════════════════════════════════════
    // Credential Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn escaped_newlines_are_decoded() {
        let escaped = PRIVATE_KEY.replace('\n', "\\n");
        assert!(!escaped.contains('\n'));

        let credentials = ServiceAccountCredentials::new(CLIENT_EMAIL, &escaped, DEFAULT_TOKEN_URI);

        assert_eq!(credentials.private_key().expose_secret(), PRIVATE_KEY);
    }

    #[test]
    fn escaped_key_still_parses() {
        let escaped = PRIVATE_KEY.replace('\n', "\\n");
        let credentials = ServiceAccountCredentials::new(CLIENT_EMAIL, &escaped, DEFAULT_TOKEN_URI);

        assert!(ServiceAccountTokenSource::new(credentials, Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn debug_redacts_private_key() {
        let credentials = ServiceAccountCredentials::new(CLIENT_EMAIL, PRIVATE_KEY, DEFAULT_TOKEN_URI);
        let debug = format!("{:?}", credentials);

        assert!(!debug.contains("BEGIN PRIVATE KEY"));
        assert!(debug.contains(CLIENT_EMAIL));
    }

    #[test]
    fn garbage_key_is_rejected_at_construction() {
        let credentials =
            ServiceAccountCredentials::new(CLIENT_EMAIL, "not a pem", DEFAULT_TOKEN_URI);

        let result = ServiceAccountTokenSource::new(credentials, Duration::from_secs(5));

        assert!(matches!(result, Err(DirectoryError::Authentication(_))));
    }

    #[test]
    fn assertion_carries_expected_claims() {
        let credentials =
            ServiceAccountCredentials::new(CLIENT_EMAIL, PRIVATE_KEY, DEFAULT_TOKEN_URI);
        let source = ServiceAccountTokenSource::new(credentials, Duration::from_secs(5)).unwrap();
        let now = chrono::Utc::now().timestamp();

        let assertion = source.sign_assertion(now).unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[DEFAULT_TOKEN_URI]);
        validation.set_issuer(&[CLIENT_EMAIL]);
        let decoded = jsonwebtoken::decode::<AssertionClaims>(
            &assertion,
            &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.scope, DATASTORE_SCOPE);
        assert_eq!(decoded.claims.iat, now);
        assert_eq!(decoded.claims.exp, now + 3600);
    }

    // ══════════════════════════════════════════════════════════════
    // Token Exchange Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn exchanges_assertion_and_caches_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .and(body_string_contains("assertion="))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("ya29.first", 3600)))
            .expect(1)
            .mount(&server)
            .await;
        let source = source_for(&server);

        let first = source.access_token().await.unwrap();
        let second = source.access_token().await.unwrap();

        assert_eq!(first.expose_secret(), "ya29.first");
        assert_eq!(second.expose_secret(), "ya29.first");
    }

    #[tokio::test]
    async fn near_expiry_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("ya29.short", 30)))
            .expect(2)
            .mount(&server)
            .await;
        let source = source_for(&server);

        source.access_token().await.unwrap();
        source.access_token().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(token_body("ya29.shared", 3600))
                    .set_delay(Duration::from_millis(50)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let source = Arc::new(source_for(&server));

        let (a, b) = tokio::join!(source.access_token(), source.access_token());

        assert_eq!(a.unwrap().expose_secret(), "ya29.shared");
        assert_eq!(b.unwrap().expose_secret(), "ya29.shared");
    }

    #[tokio::test]
    async fn rejected_exchange_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": "invalid_grant", "error_description": "Invalid JWT Signature."})),
            )
            .mount(&server)
            .await;

        let err = source_for(&server).access_token().await.unwrap_err();

        assert!(matches!(err, DirectoryError::Authentication(ref m) if m.contains("invalid_grant")));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn token_endpoint_outage_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = source_for(&server).access_token().await.unwrap_err();

        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn static_source_returns_fixed_token() {
        let token = StaticTokenSource::emulator().access_token().await.unwrap();
        assert_eq!(token.expose_secret(), "owner");
    }
}
