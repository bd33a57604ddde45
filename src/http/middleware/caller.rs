use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::domain::booking::Booking;
use crate::domain::error::BookingError;

pub const USER_HEADER: &str = "X-User-Id";
pub const INTERNAL_KEY_HEADER: &str = "X-Internal-Api-Key";

/// Identity established by the session layer in front of this service.
#[derive(Debug, Clone, Copy, Default)]
pub struct Caller {
    pub user_id: Option<Uuid>,
    pub is_admin: bool,
}

impl Caller {
    pub fn require_user(&self) -> Result<Uuid, BookingError> {
        self.user_id.ok_or(BookingError::Unauthenticated)
    }

    pub fn authorize(&self, booking: &Booking) -> Result<(), BookingError> {
        if self.is_admin {
            return Ok(());
        }
        let user_id = self.require_user()?;
        if booking.is_owned_by(user_id) {
            Ok(())
        } else {
            Err(BookingError::Forbidden)
        }
    }
}

/// Never rejects; handlers decide what identity they need.
pub async fn identify_caller(
    State(internal_api_key): State<String>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let headers = request.headers();
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok());
    let is_admin = !internal_api_key.is_empty()
        && headers
            .get(INTERNAL_KEY_HEADER)
            .and_then(|h| h.to_str().ok())
            .is_some_and(|provided| provided == internal_api_key);

    request.extensions_mut().insert(Caller { user_id, is_admin });
    next.run(request).await
}
