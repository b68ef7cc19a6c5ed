//! HTTP DTOs for the webhook endpoints.
//!
//! The wire bodies themselves are defined by `AckBody`; this module only
//! binds them to axum responses.

use axum::{
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::billing::Acknowledgement;

/// Name of the header Stripe signs deliveries with.
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

impl IntoResponse for Acknowledgement {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
