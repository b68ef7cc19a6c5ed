//! entitlement-sync - Billing webhook reconciliation service
//!
//! Receives signed Stripe webhook deliveries, resolves the authoritative
//! subscription price, maps it to an entitlement role and overwrites the
//! matching user record in the directory.

pub mod adapters;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
