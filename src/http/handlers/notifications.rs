use crate::domain::error::BookingError;
use crate::http::middleware::caller::Caller;
use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Extension, Json};

/// The caller's own notification history, oldest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, BookingError> {
    let user_id = caller.require_user()?;
    let records = state.bookings.stores.notifications.list_for_user(user_id).await?;
    Ok(Json(records))
}
