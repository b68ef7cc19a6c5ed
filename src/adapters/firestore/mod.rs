//! Firestore user directory adapter.
//!
//! Implements the `UserDirectory` port over the Firestore REST API,
//! authenticated with a service account (or the emulator's static token).

mod firestore_directory;
mod service_account;

pub use firestore_directory::{fields, FirestoreConfig, FirestoreUserDirectory, DEFAULT_BASE_URL};
pub use service_account::{
    decode_private_key, AccessTokenSource, ServiceAccountCredentials, ServiceAccountTokenSource,
    StaticTokenSource, DATASTORE_SCOPE, DEFAULT_TOKEN_URI,
};
