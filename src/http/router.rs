use crate::http::handlers::{bookings, notifications, ops, payments};
use crate::http::middleware::caller::identify_caller;
use crate::AppState;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

/// All routes with caller identification. Rate limiting is layered on by the
/// binary since it needs a live Redis.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/health", get(payments::health))
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/:booking_id", get(bookings::get_booking))
        .route("/bookings/:booking_id/cancel", post(bookings::cancel_booking))
        .route("/bookings/:booking_id/refund", post(bookings::refund_booking))
        .route("/bookings/:booking_id/qr", get(bookings::get_qr_code))
        .route(
            "/ticket-types/:ticket_type_id/availability",
            get(bookings::availability),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route("/payments/khalti/callback", get(payments::khalti_callback))
        .route("/payments/verify", post(payments::verify_payment))
        .route("/ops/readiness", get(ops::readiness))
        .route("/ops/liveness", get(ops::liveness))
        .layer(from_fn_with_state(state.internal_api_key.clone(), identify_caller))
        .with_state(state)
}
