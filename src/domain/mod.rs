//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `billing` - Webhook authentication, event routing, price → role mapping
//!   and delivery outcomes

pub mod billing;
