use crate::domain::booking::{BookingView, CreateBookingRequest};
use crate::domain::error::BookingError;
use crate::domain::payment::MessageResponse;
use crate::domain::ticket::AvailabilityResponse;
use crate::http::middleware::caller::Caller;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use uuid::Uuid;

pub async fn create_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, BookingError> {
    let buyer_id = caller.require_user()?;
    let resp = state.bookings.checkout(buyer_id, req).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state.bookings.get(booking_id).await?;
    caller.authorize(&booking)?;
    Ok(Json(BookingView::from(booking)))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state.bookings.get(booking_id).await?;
    caller.authorize(&booking)?;
    let cancelled = state.bookings.cancel(booking_id).await?;
    Ok(Json(BookingView::from(cancelled)))
}

pub async fn refund_booking(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state.bookings.get(booking_id).await?;
    caller.authorize(&booking)?;
    state.bookings.refund(booking_id).await?;
    Ok(Json(MessageResponse {
        message: "Refund processed successfully".to_string(),
    }))
}

pub async fn get_qr_code(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let booking = state.bookings.get(booking_id).await?;
    caller.authorize(&booking)?;
    let qr = state
        .bookings
        .stores
        .qr_codes
        .find_by_booking(booking_id)
        .await?
        .ok_or(BookingError::QrCodeNotIssued(booking_id))?;
    Ok(Json(qr))
}

pub async fn availability(
    State(state): State<AppState>,
    Path(ticket_type_id): Path<Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let (quantity, available) = state.bookings.available(ticket_type_id).await?;
    Ok(Json(AvailabilityResponse {
        ticket_type_id,
        quantity,
        available,
    }))
}
