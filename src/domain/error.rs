use crate::domain::booking::BookingStatus;
use crate::domain::payment::{ErrorEnvelope, ErrorPayload};
use crate::gateways::ProviderError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("quantity must be a positive integer")]
    InvalidQuantity,
    #[error("ticket type {0} not found")]
    TicketTypeNotFound(Uuid),
    #[error("unsupported payment method: {0}")]
    UnsupportedPaymentMethod(String),
    #[error("Only {available} tickets are available.")]
    InsufficientInventory { available: i64 },
    #[error("booking {0} not found")]
    BookingNotFound(Uuid),
    #[error("buyer {0} not found")]
    BuyerNotFound(Uuid),
    #[error("authentication required")]
    Unauthenticated,
    #[error("not allowed to act on this booking")]
    Forbidden,
    #[error("Only pending bookings can be cancelled")]
    NotCancellable { status: BookingStatus },
    #[error("Only paid bookings can be refunded")]
    NotRefundable { status: BookingStatus },
    #[error("A refund is already in progress for this booking")]
    RefundInProgress,
    #[error("booking is already {status}")]
    AlreadyFinal { status: BookingStatus },
    #[error("missing callback parameter: {0}")]
    MissingCallbackField(&'static str),
    #[error("invalid callback parameter: {0}")]
    InvalidCallbackField(&'static str),
    #[error("Payment verification failed: provider reports {status}")]
    PaymentNotCompleted { status: String },
    #[error("payment was not started for this booking")]
    PaymentReferenceMismatch,
    #[error("Booking was cancelled before the payment completed; the payment has been refunded")]
    LatePaymentRefunded,
    #[error("paid amount {paid} does not match booking total {expected}")]
    AmountMismatch { expected: i64, paid: i64 },
    #[error("QR code not issued for booking {0}")]
    QrCodeNotIssued(Uuid),
    #[error("Failed to initiate payment")]
    InitiationFailed(#[source] ProviderError),
    #[error("Payment verification failed")]
    VerificationFailed(#[source] ProviderError),
    #[error("Refund failed")]
    RefundFailed(#[source] ProviderError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl BookingError {
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::InvalidQuantity => "INVALID_QUANTITY",
            BookingError::TicketTypeNotFound(_) => "TICKET_TYPE_NOT_FOUND",
            BookingError::UnsupportedPaymentMethod(_) => "UNSUPPORTED_PAYMENT_METHOD",
            BookingError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            BookingError::BookingNotFound(_) => "BOOKING_NOT_FOUND",
            BookingError::BuyerNotFound(_) => "BUYER_NOT_FOUND",
            BookingError::Unauthenticated => "UNAUTHENTICATED",
            BookingError::Forbidden => "FORBIDDEN",
            BookingError::NotCancellable { .. } => "NOT_CANCELLABLE",
            BookingError::NotRefundable { .. } => "NOT_REFUNDABLE",
            BookingError::RefundInProgress => "REFUND_IN_PROGRESS",
            BookingError::AlreadyFinal { .. } => "BOOKING_ALREADY_FINAL",
            BookingError::MissingCallbackField(_) => "INVALID_CALLBACK_PARAMETERS",
            BookingError::InvalidCallbackField(_) => "INVALID_CALLBACK_PARAMETERS",
            BookingError::PaymentNotCompleted { .. } => "PAYMENT_NOT_COMPLETED",
            BookingError::PaymentReferenceMismatch => "PAYMENT_REFERENCE_MISMATCH",
            BookingError::LatePaymentRefunded => "LATE_PAYMENT_REFUNDED",
            BookingError::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            BookingError::QrCodeNotIssued(_) => "QR_CODE_NOT_ISSUED",
            BookingError::InitiationFailed(_) => "PAYMENT_INITIATION_FAILED",
            BookingError::VerificationFailed(_) => "PAYMENT_VERIFICATION_FAILED",
            BookingError::RefundFailed(_) => "REFUND_FAILED",
            BookingError::Storage(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::InvalidQuantity
            | BookingError::UnsupportedPaymentMethod(_)
            | BookingError::InsufficientInventory { .. }
            | BookingError::NotRefundable { .. }
            | BookingError::NotCancellable { .. }
            | BookingError::MissingCallbackField(_)
            | BookingError::InvalidCallbackField(_)
            | BookingError::PaymentNotCompleted { .. }
            | BookingError::PaymentReferenceMismatch
            | BookingError::AmountMismatch { .. } => StatusCode::BAD_REQUEST,
            BookingError::Unauthenticated => StatusCode::UNAUTHORIZED,
            BookingError::Forbidden => StatusCode::FORBIDDEN,
            BookingError::TicketTypeNotFound(_)
            | BookingError::BookingNotFound(_)
            | BookingError::BuyerNotFound(_)
            | BookingError::QrCodeNotIssued(_) => StatusCode::NOT_FOUND,
            BookingError::AlreadyFinal { .. }
            | BookingError::RefundInProgress
            | BookingError::LatePaymentRefunded => StatusCode::CONFLICT,
            BookingError::InitiationFailed(ProviderError::Timeout)
            | BookingError::VerificationFailed(ProviderError::Timeout)
            | BookingError::RefundFailed(ProviderError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            BookingError::InitiationFailed(_)
            | BookingError::VerificationFailed(_)
            | BookingError::RefundFailed(_) => StatusCode::BAD_GATEWAY,
            BookingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let details = match self {
            BookingError::InitiationFailed(e) | BookingError::VerificationFailed(e) | BookingError::RefundFailed(e) => {
                Some(match e.details() {
                    Some(d) => format!("{}: {}", e, d),
                    None => e.to_string(),
                })
            }
            _ => None,
        };
        let message = match self {
            BookingError::Storage(_) => "internal error".to_string(),
            other => other.to_string(),
        };

        ErrorEnvelope {
            error: ErrorPayload {
                code: self.code().to_string(),
                message,
                details,
            },
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        if let BookingError::Storage(e) = &self {
            tracing::error!("storage failure: {:#}", e);
        }
        (self.status_code(), Json(self.envelope())).into_response()
    }
}
