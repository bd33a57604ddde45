use crate::domain::error::BookingError;
use crate::domain::payment::{CallbackParams, ClientVerifyRequest, ClientVerifyResponse};
use crate::http::middleware::caller::Caller;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};

/// Browser redirect target after the hosted payment page. Success sends the
/// buyer on to the frontend; any failure is answered as JSON.
pub async fn khalti_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, BookingError> {
    let confirmation = state.pipeline.handle_callback(params).await?;
    let location = format!(
        "{}/booking-success?booking_id={}",
        state.frontend_url, confirmation.booking.booking_id
    );
    Ok((StatusCode::SEE_OTHER, [(header::LOCATION, location)]))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<ClientVerifyRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state.bookings.get(req.booking_id).await?;
    caller.authorize(&booking)?;

    let confirmation = state.pipeline.handle_client_verification(req).await?;
    Ok(Json(ClientVerifyResponse {
        confirmed: true,
        booking_id: confirmation.booking.booking_id,
        already_paid: confirmation.already_paid,
    }))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
