//! Startup wiring: turns validated configuration into a ready router.
//!
//! Everything that can fail because of bad configuration (unparseable
//! private key, empty secret list, unreadable price table) fails here,
//! before the listener is bound.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::adapters::firestore::{
    AccessTokenSource, FirestoreConfig, FirestoreUserDirectory, ServiceAccountCredentials,
    ServiceAccountTokenSource, StaticTokenSource,
};
use crate::adapters::http::{build_router, WebhookAppState};
use crate::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use crate::application::{BillingWebhookHandler, SubscriptionResolver, UserReconciler};
use crate::config::{AppConfig, ConfigError, DirectoryConfig, ValidationError};
use crate::domain::billing::{EmptySecretSet, PriceTableError, SecretSet, SignatureVerifier};
use crate::ports::{DirectoryError, PaymentError};

/// Errors that prevent the service from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    PriceTable(#[from] PriceTableError),

    #[error(transparent)]
    Secrets(#[from] EmptySecretSet),

    #[error("Payment provider setup failed: {0}")]
    PaymentProvider(#[from] PaymentError),

    #[error("User directory setup failed: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Server I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Builds the webhook handler and its collaborators.
pub fn build_handler(config: &AppConfig) -> Result<BillingWebhookHandler, StartupError> {
    config.validate()?;

    let payment = &config.payment;
    let api_key = payment
        .stripe_api_key
        .clone()
        .ok_or(ValidationError::MissingRequired("payment.stripe_api_key"))?;
    let payment_timeout = Duration::from_secs(payment.request_timeout_secs);
    let stripe = StripePaymentAdapter::new(
        StripeConfig::from_secret(api_key)
            .with_base_url(payment.api_base_url.clone())
            .with_api_version(payment.api_version.clone())
            .with_timeout(payment_timeout),
    )?;

    let secrets = SecretSet::new(payment.signing_secrets())?;
    let secret_count = secrets.len();
    let verifier = SignatureVerifier::new(secrets).with_tolerance(payment.signature_tolerance_secs);

    let directory_timeout = Duration::from_secs(config.directory.request_timeout_secs);
    let directory = build_directory(&config.directory, directory_timeout)?;

    let price_roles = config.entitlements.load_price_roles()?;

    tracing::info!(
        test_mode = payment.is_test_mode(),
        signing_secrets = secret_count,
        price_roles = price_roles.len(),
        collection = %config.directory.collection,
        emulator = config.directory.is_emulator(),
        duplicate_email_policy = %config.directory.duplicate_email_policy,
        "Webhook pipeline configured"
    );

    Ok(BillingWebhookHandler::new(
        verifier,
        SubscriptionResolver::new(Arc::new(stripe), payment_timeout),
        price_roles,
        UserReconciler::new(Arc::new(directory), directory_timeout)
            .with_duplicate_policy(config.directory.duplicate_email_policy),
    ))
}

/// Builds the full HTTP application.
pub fn build_app(config: &AppConfig) -> Result<Router, StartupError> {
    let handler = build_handler(config)?;
    let state = WebhookAppState::new(Arc::new(handler));
    Ok(build_router(state))
}

fn build_directory(
    config: &DirectoryConfig,
    timeout: Duration,
) -> Result<FirestoreUserDirectory, StartupError> {
    let project_id = config
        .project_id
        .clone()
        .ok_or(ValidationError::MissingRequired("directory.project_id"))?;

    let firestore = FirestoreConfig::new(project_id)
        .with_collection(config.collection.clone())
        .with_timeout(timeout);

    if let Some(host) = config.emulator_host.as_deref().filter(|h| !h.trim().is_empty()) {
        let tokens: Arc<dyn AccessTokenSource> = Arc::new(StaticTokenSource::emulator());
        return Ok(FirestoreUserDirectory::new(
            firestore.with_emulator_host(host),
            tokens,
        )?);
    }

    let client_email = config
        .client_email
        .clone()
        .ok_or(ValidationError::MissingRequired("directory.client_email"))?;
    let private_key = config
        .private_key
        .as_ref()
        .ok_or(ValidationError::MissingRequired("directory.private_key"))?;
    let credentials = ServiceAccountCredentials::new(
        client_email,
        private_key.expose_secret(),
        config.token_uri.clone(),
    );
    let tokens: Arc<dyn AccessTokenSource> =
        Arc::new(ServiceAccountTokenSource::new(credentials, timeout)?);

    Ok(FirestoreUserDirectory::new(
        firestore.with_base_url(config.base_url.clone()),
        tokens,
    )?)
}
