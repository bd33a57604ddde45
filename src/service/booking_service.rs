use crate::domain::booking::{
    Booking, BookingStatus, CreateBookingRequest, CreateBookingResponse, NewBooking, PaymentMethod,
};
use crate::domain::error::BookingError;
use crate::domain::notification::NotificationMedium;
use crate::gateways::{self, CustomerInfo, InitiateRequest, LineItem, ProviderError, ProviderRegistry, RefundRequest};
use crate::inventory::accountant;
use crate::repo::Stores;
use crate::service::notification_dispatcher::{DispatchMode, NotificationDispatcher};
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const CALLBACK_PATH: &str = "/payments/khalti/callback";

#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    Confirmed(Booking),
    AlreadyPaid(Booking),
}

impl ConfirmOutcome {
    pub fn booking(&self) -> &Booking {
        match self {
            ConfirmOutcome::Confirmed(b) | ConfirmOutcome::AlreadyPaid(b) => b,
        }
    }
}

#[derive(Debug, Default)]
pub struct SweepReport {
    pub cancelled: usize,
    /// Provider lookup failed; retried on the next sweep.
    pub deferred: usize,
    /// Booking and payment index of expired bookings the provider reports paid.
    pub completed: Vec<(Uuid, String)>,
}

/// Owns every status change of a booking. Transitions are applied as
/// compare-and-set against the stored status.
#[derive(Clone)]
pub struct BookingService {
    pub stores: Stores,
    pub providers: ProviderRegistry,
    pub dispatcher: NotificationDispatcher,
    pub dispatch_mode: DispatchMode,
    pub public_base_url: String,
}

impl BookingService {
    pub fn resolve_method(&self, raw: Option<&str>) -> Result<PaymentMethod, BookingError> {
        let raw = raw.unwrap_or(PaymentMethod::Khalti.as_str());
        PaymentMethod::parse(raw)
            .filter(|m| self.providers.supports(*m))
            .ok_or_else(|| BookingError::UnsupportedPaymentMethod(raw.to_string()))
    }

    pub async fn create(
        &self,
        buyer_id: Uuid,
        ticket_type_id: Uuid,
        quantity: i64,
        payment_method: Option<&str>,
    ) -> Result<Booking, BookingError> {
        accountant::validate_quantity(quantity)?;
        let payment_method = self.resolve_method(payment_method)?;

        let booking = self
            .stores
            .bookings
            .reserve(&NewBooking {
                booking_id: Uuid::new_v4(),
                buyer_id,
                ticket_type_id,
                quantity,
                payment_method,
            })
            .await?;

        tracing::info!(
            booking_id = %booking.booking_id,
            ticket_type_id = %ticket_type_id,
            quantity,
            total_amount_minor = booking.total_amount_minor,
            "pending booking created"
        );
        Ok(booking)
    }

    /// Creates the pending booking and starts the payment. If the provider
    /// never accepted the payment the booking is deleted again.
    pub async fn checkout(&self, buyer_id: Uuid, req: CreateBookingRequest) -> Result<CreateBookingResponse, BookingError> {
        let buyer = self
            .stores
            .buyers
            .find(buyer_id)
            .await?
            .ok_or(BookingError::BuyerNotFound(buyer_id))?;

        let booking = self
            .create(buyer_id, req.ticket_id, req.quantity, req.payment_method.as_deref())
            .await?;

        let ticket = self
            .stores
            .ticket_types
            .find(booking.ticket_type_id)
            .await?
            .ok_or(BookingError::TicketTypeNotFound(booking.ticket_type_id))?;
        let provider = self
            .providers
            .get(booking.payment_method)
            .ok_or_else(|| BookingError::UnsupportedPaymentMethod(booking.payment_method.to_string()))?;

        let request = InitiateRequest {
            purchase_order_id: booking.booking_id.to_string(),
            purchase_order_name: format!("Ticket for {}", ticket.event_name),
            amount_minor: booking.total_amount_minor,
            return_url: format!("{}{}", self.public_base_url, CALLBACK_PATH),
            website_url: self.public_base_url.clone(),
            customer: CustomerInfo {
                name: buyer.name.clone(),
                email: buyer.email.clone(),
                phone: buyer.phone.clone(),
            },
            line: LineItem {
                ticket_type_id: ticket.ticket_type_id.to_string(),
                ticket_name: ticket.name.clone(),
                quantity: booking.quantity,
                unit_price_minor: ticket.price_minor,
            },
        };

        let initiated = provider.initiate(&request).await.and_then(|resp| {
            match resp.payment_url.as_deref().map(str::trim) {
                Some(url) if !url.is_empty() => Ok((resp.pidx.clone(), url.to_string())),
                _ => Err(ProviderError::MissingPaymentUrl),
            }
        });
        let (pidx, payment_url) = match initiated {
            Ok(started) => started,
            Err(e) => {
                tracing::warn!(booking_id = %booking.booking_id, provider = provider.name(), "payment initiation failed: {}", e);
                self.discard_unpaid(booking.booking_id).await;
                return Err(BookingError::InitiationFailed(e));
            }
        };

        match self.stores.bookings.attach_payment_reference(booking.booking_id, &pidx).await {
            Ok(true) => {}
            Ok(false) => {
                self.discard_unpaid(booking.booking_id).await;
                return Err(anyhow!("booking {} left pending before payment was attached", booking.booking_id).into());
            }
            Err(e) => {
                self.discard_unpaid(booking.booking_id).await;
                return Err(e.into());
            }
        }

        tracing::info!(booking_id = %booking.booking_id, pidx = %pidx, "payment initiated");
        Ok(CreateBookingResponse {
            booking_id: booking.booking_id,
            payment_url,
            message: "Booking created. Please complete payment.".to_string(),
        })
    }

    async fn discard_unpaid(&self, booking_id: Uuid) {
        if let Err(e) = self.stores.bookings.delete_pending(booking_id).await {
            tracing::error!(booking_id = %booking_id, "could not delete unpaid booking: {:#}", e);
        }
    }

    pub async fn get(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.stores
            .bookings
            .get(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    pub async fn available(&self, ticket_type_id: Uuid) -> Result<(i64, i64), BookingError> {
        let ticket = self
            .stores
            .ticket_types
            .find(ticket_type_id)
            .await?
            .ok_or(BookingError::TicketTypeNotFound(ticket_type_id))?;
        let lines = self.stores.ticket_types.booking_lines(ticket_type_id).await?;
        Ok((ticket.quantity, accountant::available(&ticket, &lines, None)))
    }

    pub async fn confirm_paid(&self, booking_id: Uuid, transaction_id: &str) -> Result<ConfirmOutcome, BookingError> {
        if let Some(booking) = self
            .stores
            .bookings
            .transition(booking_id, BookingStatus::Pending, BookingStatus::Paid, Some(transaction_id))
            .await?
        {
            tracing::info!(booking_id = %booking_id, transaction_id, "booking paid");
            return Ok(ConfirmOutcome::Confirmed(booking));
        }

        let current = self.get(booking_id).await?;
        match current.status {
            BookingStatus::Paid => Ok(ConfirmOutcome::AlreadyPaid(current)),
            status => Err(BookingError::AlreadyFinal { status }),
        }
    }

    pub async fn cancel(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        if let Some(booking) = self
            .stores
            .bookings
            .transition(booking_id, BookingStatus::Pending, BookingStatus::Cancelled, None)
            .await?
        {
            tracing::info!(booking_id = %booking_id, "booking cancelled");
            return Ok(booking);
        }

        let current = self.get(booking_id).await?;
        Err(BookingError::NotCancellable { status: current.status })
    }

    /// Cancels abandoned pending bookings created before `cutoff`. Bookings
    /// with a started payment are looked up first: completed ones are reported
    /// back for confirmation, and ones the provider cannot answer for are left
    /// for the next round.
    pub async fn sweep_expired(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<SweepReport, BookingError> {
        let stale = self.stores.bookings.list_pending_older_than(cutoff, limit).await?;
        let mut report = SweepReport::default();
        for booking in stale {
            if let Some(reference) = booking.payment_reference.clone() {
                match self.payment_completed(&booking, &reference).await {
                    Some(true) => {
                        tracing::info!(booking_id = %booking.booking_id, pidx = %reference, "expired booking was paid");
                        report.completed.push((booking.booking_id, reference));
                        continue;
                    }
                    Some(false) => {}
                    None => {
                        report.deferred += 1;
                        continue;
                    }
                }
            }

            match self.cancel(booking.booking_id).await {
                Ok(_) => report.cancelled += 1,
                Err(BookingError::NotCancellable { status }) => {
                    tracing::debug!(booking_id = %booking.booking_id, status = %status, "booking left pending sweep");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    async fn payment_completed(&self, booking: &Booking, reference: &str) -> Option<bool> {
        let Some(provider) = self.providers.get(booking.payment_method) else {
            tracing::warn!(booking_id = %booking.booking_id, method = %booking.payment_method, "no provider to ask before expiry");
            return None;
        };
        match gateways::verify(provider.as_ref(), reference).await {
            Ok(v) => Some(v.completed && v.total_amount == booking.total_amount_minor),
            Err(e) => {
                tracing::warn!(booking_id = %booking.booking_id, "lookup before expiry failed: {}", e);
                None
            }
        }
    }

    /// The provider must accept the refund before the status flips. A claim on
    /// the booking keeps a second refund from reaching the provider meanwhile.
    pub async fn refund(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let booking = self.get(booking_id).await?;
        if !booking.status.can_transition_to(BookingStatus::Refunded) {
            return Err(BookingError::NotRefundable { status: booking.status });
        }

        let transaction_id = booking
            .transaction_id
            .clone()
            .ok_or_else(|| anyhow!("paid booking {} has no transaction id", booking_id))?;
        let provider = self
            .providers
            .get(booking.payment_method)
            .ok_or_else(|| BookingError::UnsupportedPaymentMethod(booking.payment_method.to_string()))?;

        if !self.stores.bookings.claim_refund(booking_id).await? {
            let current = self.get(booking_id).await?;
            return Err(match current.status {
                BookingStatus::Paid => BookingError::RefundInProgress,
                status => BookingError::NotRefundable { status },
            });
        }

        let refunded = provider
            .refund(&RefundRequest {
                transaction_id,
                amount_minor: booking.total_amount_minor,
            })
            .await;
        if let Err(e) = refunded {
            tracing::warn!(booking_id = %booking_id, "refund rejected by provider: {}", e);
            if let Err(release) = self.stores.bookings.release_refund_claim(booking_id).await {
                tracing::error!(booking_id = %booking_id, "refund claim not released: {:#}", release);
            }
            return Err(BookingError::RefundFailed(e));
        }

        let refunded = match self
            .stores
            .bookings
            .transition(booking_id, BookingStatus::Paid, BookingStatus::Refunded, None)
            .await?
        {
            Some(b) => b,
            None => {
                let current = self.get(booking_id).await?;
                return Err(BookingError::NotRefundable { status: current.status });
            }
        };
        tracing::info!(booking_id = %booking_id, "booking refunded");

        self.notify_refund(
            &refunded,
            |event| format!("Your booking for {} has been refunded.", event),
        )
        .await;
        Ok(refunded)
    }

    /// Returns a payment that completed after its booking was cancelled. The
    /// booking stays cancelled.
    pub async fn refund_late_payment(&self, booking: &Booking, transaction_id: &str) -> Result<(), BookingError> {
        let provider = self
            .providers
            .get(booking.payment_method)
            .ok_or_else(|| BookingError::UnsupportedPaymentMethod(booking.payment_method.to_string()))?;

        if !self.stores.bookings.claim_refund(booking.booking_id).await? {
            return Err(BookingError::RefundInProgress);
        }
        if let Err(e) = provider
            .refund(&RefundRequest {
                transaction_id: transaction_id.to_string(),
                amount_minor: booking.total_amount_minor,
            })
            .await
        {
            tracing::error!(booking_id = %booking.booking_id, "late payment refund rejected: {}", e);
            if let Err(release) = self.stores.bookings.release_refund_claim(booking.booking_id).await {
                tracing::error!(booking_id = %booking.booking_id, "refund claim not released: {:#}", release);
            }
            return Err(BookingError::RefundFailed(e));
        }

        tracing::warn!(booking_id = %booking.booking_id, transaction_id, "payment for cancelled booking refunded");
        self.notify_refund(booking, |event| {
            format!(
                "Your payment for {} arrived after the booking had expired and has been refunded.",
                event
            )
        })
        .await;
        Ok(())
    }

    async fn notify_refund(&self, booking: &Booking, lead: impl Fn(&str) -> String) {
        let buyer = match self.stores.buyers.find(booking.buyer_id).await {
            Ok(Some(b)) => b,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(booking_id = %booking.booking_id, "refund notice skipped: {:#}", e);
                return;
            }
        };
        let ticket = match self.stores.ticket_types.find(booking.ticket_type_id).await {
            Ok(Some(t)) => t,
            _ => return,
        };

        self.dispatcher
            .dispatch(
                self.dispatch_mode,
                buyer,
                ticket.event_id,
                format!("{} Amount: {}.", lead(&ticket.event_name), format_minor(booking.total_amount_minor)),
                vec![NotificationMedium::Email],
                Some(format!("Refund processed: {}", ticket.event_name)),
            )
            .await;
    }
}

pub fn format_minor(amount_minor: i64) -> String {
    format!("Rs. {}.{:02}", amount_minor / 100, (amount_minor % 100).abs())
}
