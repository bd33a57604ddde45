use crate::domain::booking::{Booking, BookingLine, BookingStatus, NewBooking};
use crate::domain::buyer::Buyer;
use crate::domain::error::BookingError;
use crate::domain::notification::{NewNotification, NotificationRecord, NotificationStatus};
use crate::domain::qr::QrCodeRecord;
use crate::domain::ticket::TicketType;
use crate::inventory::accountant;
use crate::repo::{BookingStore, BuyerDirectory, NotificationStore, QrCodeStore, TicketTypeStore};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    ticket_types: HashMap<Uuid, TicketType>,
    bookings: HashMap<Uuid, Booking>,
    qr_codes: HashMap<Uuid, QrCodeRecord>,
    notifications: Vec<NotificationRecord>,
    buyers: HashMap<Uuid, Buyer>,
    push_tokens: HashMap<Uuid, String>,
    refund_claims: HashSet<Uuid>,
}

/// Single-process store. One mutex guards every table, which gives the same
/// check-then-insert atomicity the Postgres row lock provides.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_qr_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_ticket_type(&self, ticket: TicketType) {
        self.state.lock().await.ticket_types.insert(ticket.ticket_type_id, ticket);
    }

    pub async fn add_buyer(&self, buyer: Buyer) {
        self.state.lock().await.buyers.insert(buyer.user_id, buyer);
    }

    pub async fn set_push_token(&self, user_id: Uuid, token: &str) {
        self.state.lock().await.push_tokens.insert(user_id, token.to_string());
    }

    pub async fn bookings_for(&self, ticket_type_id: Uuid) -> Vec<Booking> {
        let state = self.state.lock().await;
        let mut out: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.ticket_type_id == ticket_type_id)
            .cloned()
            .collect();
        out.sort_by_key(|b| b.created_at);
        out
    }

    pub async fn qr_code_count(&self, booking_id: Uuid) -> usize {
        usize::from(self.state.lock().await.qr_codes.contains_key(&booking_id))
    }

    pub async fn all_notifications(&self) -> Vec<NotificationRecord> {
        self.state.lock().await.notifications.clone()
    }

    pub fn fail_qr_inserts(&self, fail: bool) {
        self.fail_qr_inserts.store(fail, Ordering::SeqCst);
    }
}

fn lines_for(state: &MemoryState, ticket_type_id: Uuid) -> Vec<BookingLine> {
    state
        .bookings
        .values()
        .filter(|b| b.ticket_type_id == ticket_type_id)
        .map(BookingLine::from)
        .collect()
}

#[async_trait::async_trait]
impl TicketTypeStore for MemoryStore {
    async fn find(&self, ticket_type_id: Uuid) -> Result<Option<TicketType>> {
        Ok(self.state.lock().await.ticket_types.get(&ticket_type_id).cloned())
    }

    async fn booking_lines(&self, ticket_type_id: Uuid) -> Result<Vec<BookingLine>> {
        let state = self.state.lock().await;
        Ok(lines_for(&state, ticket_type_id))
    }
}

#[async_trait::async_trait]
impl BookingStore for MemoryStore {
    async fn reserve(&self, new: &NewBooking) -> Result<Booking, BookingError> {
        accountant::validate_quantity(new.quantity)?;

        let mut state = self.state.lock().await;
        let ticket = state
            .ticket_types
            .get(&new.ticket_type_id)
            .cloned()
            .ok_or(BookingError::TicketTypeNotFound(new.ticket_type_id))?;
        let lines = lines_for(&state, new.ticket_type_id);
        accountant::admit(&ticket, &lines, new.quantity)?;

        let total_amount_minor = ticket
            .price_minor
            .checked_mul(new.quantity)
            .ok_or_else(|| anyhow!("total amount overflow"))?;

        let booking = Booking {
            booking_id: new.booking_id,
            buyer_id: new.buyer_id,
            ticket_type_id: new.ticket_type_id,
            quantity: new.quantity,
            total_amount_minor,
            status: BookingStatus::Pending,
            payment_method: new.payment_method,
            transaction_id: None,
            payment_reference: None,
            created_at: Utc::now(),
        };
        state.bookings.insert(booking.booking_id, booking.clone());
        Ok(booking)
    }

    async fn get(&self, booking_id: Uuid) -> Result<Option<Booking>> {
        Ok(self.state.lock().await.bookings.get(&booking_id).cloned())
    }

    async fn delete_pending(&self, booking_id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.bookings.get(&booking_id) {
            Some(b) if b.status == BookingStatus::Pending => {
                state.bookings.remove(&booking_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn attach_payment_reference(&self, booking_id: Uuid, reference: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state
            .bookings
            .values()
            .any(|b| b.payment_reference.as_deref() == Some(reference))
        {
            return Err(anyhow!("payment reference {} already attached", reference));
        }
        match state.bookings.get_mut(&booking_id) {
            Some(b) if b.status == BookingStatus::Pending && b.payment_reference.is_none() => {
                b.payment_reference = Some(reference.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn transition(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        transaction_id: Option<&str>,
    ) -> Result<Option<Booking>> {
        let mut state = self.state.lock().await;
        if let Some(txn) = transaction_id {
            if state
                .bookings
                .values()
                .any(|b| b.booking_id != booking_id && b.transaction_id.as_deref() == Some(txn))
            {
                return Err(anyhow!("transaction id {} already recorded", txn));
            }
        }
        let Some(booking) = state.bookings.get_mut(&booking_id) else {
            return Ok(None);
        };
        if booking.status != from {
            return Ok(None);
        }

        booking.status = to;
        if let Some(txn) = transaction_id {
            booking.transaction_id = Some(txn.to_string());
        }
        Ok(Some(booking.clone()))
    }

    async fn list_pending_older_than(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<Booking>> {
        let state = self.state.lock().await;
        let mut out: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at < cutoff)
            .cloned()
            .collect();
        out.sort_by_key(|b| b.created_at);
        out.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(out)
    }

    async fn claim_refund(&self, booking_id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        let refundable = state
            .bookings
            .get(&booking_id)
            .is_some_and(|b| matches!(b.status, BookingStatus::Paid | BookingStatus::Cancelled));
        Ok(refundable && state.refund_claims.insert(booking_id))
    }

    async fn release_refund_claim(&self, booking_id: Uuid) -> Result<()> {
        self.state.lock().await.refund_claims.remove(&booking_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl QrCodeStore for MemoryStore {
    async fn insert_if_absent(&self, qr: &QrCodeRecord) -> Result<bool> {
        if self.fail_qr_inserts.load(Ordering::SeqCst) {
            return Err(anyhow!("qr_codes table unavailable"));
        }

        let mut state = self.state.lock().await;
        let paid = state
            .bookings
            .get(&qr.booking_id)
            .is_some_and(|b| b.status == BookingStatus::Paid);
        if !paid || state.qr_codes.contains_key(&qr.booking_id) {
            return Ok(false);
        }
        state.qr_codes.insert(qr.booking_id, qr.clone());
        Ok(true)
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> Result<Option<QrCodeRecord>> {
        Ok(self.state.lock().await.qr_codes.get(&booking_id).cloned())
    }
}

#[async_trait::async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_pending(&self, new: &NewNotification) -> Result<NotificationRecord> {
        let record = NotificationRecord {
            notification_id: Uuid::new_v4(),
            user_id: new.user_id,
            event_id: new.event_id,
            title: new.title.clone(),
            message: new.message.clone(),
            medium: new.medium,
            status: NotificationStatus::Pending,
            created_at: Utc::now(),
        };
        self.state.lock().await.notifications.push(record.clone());
        Ok(record)
    }

    async fn set_status(&self, notification_id: Uuid, status: NotificationStatus) -> Result<()> {
        let mut state = self.state.lock().await;
        let record = state
            .notifications
            .iter_mut()
            .find(|n| n.notification_id == notification_id)
            .ok_or_else(|| anyhow!("notification {} not found", notification_id))?;
        record.status = status;
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<NotificationRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl BuyerDirectory for MemoryStore {
    async fn find(&self, user_id: Uuid) -> Result<Option<Buyer>> {
        Ok(self.state.lock().await.buyers.get(&user_id).cloned())
    }

    async fn push_token(&self, user_id: Uuid) -> Result<Option<String>> {
        Ok(self.state.lock().await.push_tokens.get(&user_id).cloned())
    }
}
