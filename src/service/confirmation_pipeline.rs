use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::error::BookingError;
use crate::domain::notification::NotificationMedium;
use crate::domain::payment::{CallbackParams, ClientVerifyRequest};
use crate::domain::qr;
use crate::gateways::{self, STATUS_COMPLETED};
use crate::service::booking_service::{format_minor, BookingService, ConfirmOutcome, SweepReport};
use chrono::{DateTime, Utc};
use uuid::Uuid;

const CONFIRMATION_MEDIUMS: [NotificationMedium; 2] = [NotificationMedium::Email, NotificationMedium::Push];

#[derive(Debug, Clone)]
pub struct Confirmation {
    pub booking: Booking,
    pub already_paid: bool,
    pub qr_issued: bool,
}

/// Verify, transition, issue the ticket, notify. Each step gates the next;
/// nothing after the paid transition can undo it.
#[derive(Clone)]
pub struct ConfirmationPipeline {
    pub bookings: BookingService,
    pub qr_secret: String,
}

impl ConfirmationPipeline {
    pub async fn handle_callback(&self, params: CallbackParams) -> Result<Confirmation, BookingError> {
        let order_id = required(params.purchase_order_id.as_deref(), "purchase_order_id")?;
        let status = required(params.status.as_deref(), "status")?;
        let pidx = required(params.pidx.as_deref(), "pidx")?;

        if status != STATUS_COMPLETED {
            tracing::info!(purchase_order_id = order_id, status, "callback reports unfinished payment");
            return Err(BookingError::PaymentNotCompleted {
                status: status.to_string(),
            });
        }
        let booking_id = Uuid::parse_str(order_id).map_err(|_| BookingError::InvalidCallbackField("purchase_order_id"))?;

        self.confirm(booking_id, pidx, None).await
    }

    pub async fn handle_client_verification(&self, req: ClientVerifyRequest) -> Result<Confirmation, BookingError> {
        let token = required(Some(req.token.as_str()), "token")?;
        if let Some(raw) = req.payment_method.as_deref() {
            self.bookings.resolve_method(Some(raw))?;
        }
        self.confirm(req.booking_id, token, req.amount).await
    }

    /// Expiry pass for abandoned bookings. Those whose payment went through
    /// after all are confirmed here instead of being cancelled.
    pub async fn sweep_expired(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<SweepReport, BookingError> {
        let report = self.bookings.sweep_expired(cutoff, limit).await?;
        for (booking_id, pidx) in &report.completed {
            if let Err(e) = self.confirm(*booking_id, pidx, None).await {
                tracing::warn!(booking_id = %booking_id, "confirming expired booking failed: {}", e);
            }
        }
        Ok(report)
    }

    async fn confirm(&self, booking_id: Uuid, pidx: &str, claimed_amount: Option<i64>) -> Result<Confirmation, BookingError> {
        let booking = self.bookings.get(booking_id).await?;
        if booking.payment_reference.as_deref() != Some(pidx) {
            tracing::warn!(booking_id = %booking_id, pidx, "payment index does not belong to booking");
            return Err(BookingError::PaymentReferenceMismatch);
        }
        let provider = self
            .bookings
            .providers
            .get(booking.payment_method)
            .ok_or_else(|| BookingError::UnsupportedPaymentMethod(booking.payment_method.to_string()))?;

        if booking.status == BookingStatus::Paid && booking.transaction_id.as_deref() == Some(pidx) {
            let qr_issued = self.ensure_qr(&booking).await;
            tracing::info!(booking_id = %booking_id, "verification repeated for paid booking");
            return Ok(Confirmation {
                booking,
                already_paid: true,
                qr_issued,
            });
        }

        let verification = gateways::verify(provider.as_ref(), pidx).await.map_err(|e| {
            tracing::warn!(booking_id = %booking_id, provider = provider.name(), "payment lookup failed: {}", e);
            BookingError::VerificationFailed(e)
        })?;
        if !verification.completed {
            tracing::info!(booking_id = %booking_id, status = %verification.provider_status, "payment not completed");
            return Err(BookingError::PaymentNotCompleted {
                status: verification.provider_status,
            });
        }
        if verification.total_amount != booking.total_amount_minor {
            tracing::warn!(
                booking_id = %booking_id,
                expected = booking.total_amount_minor,
                paid = verification.total_amount,
                "paid amount mismatch"
            );
            return Err(BookingError::AmountMismatch {
                expected: booking.total_amount_minor,
                paid: verification.total_amount,
            });
        }
        if let Some(claimed) = claimed_amount {
            if claimed != booking.total_amount_minor {
                return Err(BookingError::AmountMismatch {
                    expected: booking.total_amount_minor,
                    paid: claimed,
                });
            }
        }

        let outcome = match self.bookings.confirm_paid(booking_id, &verification.transaction_id).await {
            Err(BookingError::AlreadyFinal {
                status: BookingStatus::Cancelled,
            }) => {
                self.bookings
                    .refund_late_payment(&booking, &verification.transaction_id)
                    .await?;
                return Err(BookingError::LatePaymentRefunded);
            }
            other => other?,
        };
        let qr_issued = self.ensure_qr(outcome.booking()).await;

        match outcome {
            ConfirmOutcome::AlreadyPaid(booking) => Ok(Confirmation {
                booking,
                already_paid: true,
                qr_issued,
            }),
            ConfirmOutcome::Confirmed(booking) => {
                self.notify_confirmed(&booking).await;
                Ok(Confirmation {
                    booking,
                    already_paid: false,
                    qr_issued,
                })
            }
        }
    }

    /// Failures are logged and reported through the return value only; a
    /// paid booking stays paid.
    async fn ensure_qr(&self, booking: &Booking) -> bool {
        let Some(transaction_id) = booking.transaction_id.as_deref() else {
            tracing::error!(booking_id = %booking.booking_id, "paid booking without transaction id");
            return false;
        };

        match self.bookings.stores.qr_codes.find_by_booking(booking.booking_id).await {
            Ok(Some(_)) => return true,
            Ok(None) => {}
            Err(e) => {
                tracing::error!(booking_id = %booking.booking_id, "qr lookup failed: {:#}", e);
                return false;
            }
        }

        let record = match qr::issue(booking.booking_id, transaction_id, &self.qr_secret) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(booking_id = %booking.booking_id, "qr render failed: {:#}", e);
                return false;
            }
        };
        match self.bookings.stores.qr_codes.insert_if_absent(&record).await {
            Ok(inserted) => {
                if inserted {
                    tracing::info!(booking_id = %booking.booking_id, "qr code issued");
                }
                true
            }
            Err(e) => {
                tracing::error!(booking_id = %booking.booking_id, "qr persist failed: {:#}", e);
                false
            }
        }
    }

    async fn notify_confirmed(&self, booking: &Booking) {
        let stores = &self.bookings.stores;
        let buyer = match stores.buyers.find(booking.buyer_id).await {
            Ok(Some(b)) => b,
            Ok(None) => {
                tracing::warn!(booking_id = %booking.booking_id, "buyer missing, confirmation not sent");
                return;
            }
            Err(e) => {
                tracing::warn!(booking_id = %booking.booking_id, "confirmation skipped: {:#}", e);
                return;
            }
        };
        let ticket = match stores.ticket_types.find(booking.ticket_type_id).await {
            Ok(Some(t)) => t,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(booking_id = %booking.booking_id, "confirmation skipped: {:#}", e);
                return;
            }
        };

        let message = format!(
            "Your booking for {} is confirmed. {} x {} ticket(s), total {}. Booking ID: {}.",
            ticket.event_name,
            booking.quantity,
            ticket.name,
            format_minor(booking.total_amount_minor),
            booking.booking_id
        );
        self.bookings
            .dispatcher
            .dispatch(
                self.bookings.dispatch_mode,
                buyer,
                ticket.event_id,
                message,
                CONFIRMATION_MEDIUMS.to_vec(),
                Some(format!("Booking confirmed: {}", ticket.event_name)),
            )
            .await;
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, BookingError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(BookingError::MissingCallbackField(field)),
    }
}
