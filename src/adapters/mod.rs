//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `stripe` - Stripe subscription lookups (plus a mock)
//! - `firestore` - Firestore REST user directory and service account auth
//! - `directory` - In-memory user directory
//! - `http` - Axum router for webhook delivery and liveness

pub mod directory;
pub mod firestore;
pub mod http;
pub mod stripe;

pub use directory::InMemoryUserDirectory;
pub use firestore::{FirestoreConfig, FirestoreUserDirectory};
pub use http::{build_router, WebhookAppState};
pub use stripe::{MockPaymentProvider, StripeConfig, StripePaymentAdapter};
