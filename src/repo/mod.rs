use crate::domain::booking::{Booking, BookingLine, BookingStatus, NewBooking};
use crate::domain::buyer::Buyer;
use crate::domain::error::BookingError;
use crate::domain::notification::{NewNotification, NotificationRecord, NotificationStatus};
use crate::domain::qr::QrCodeRecord;
use crate::domain::ticket::TicketType;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

pub mod bookings_repo;
pub mod buyers_repo;
pub mod memory;
pub mod notifications_repo;
pub mod qr_codes_repo;
pub mod ticket_types_repo;

#[async_trait::async_trait]
pub trait TicketTypeStore: Send + Sync {
    async fn find(&self, ticket_type_id: Uuid) -> Result<Option<TicketType>>;

    async fn booking_lines(&self, ticket_type_id: Uuid) -> Result<Vec<BookingLine>>;
}

#[async_trait::async_trait]
pub trait BookingStore: Send + Sync {
    /// Locks the ticket type, runs the inventory check against the locked
    /// snapshot and inserts a pending booking, all in one unit of work.
    async fn reserve(&self, new: &NewBooking) -> Result<Booking, BookingError>;

    async fn get(&self, booking_id: Uuid) -> Result<Option<Booking>>;

    /// Only removes the row while it is still pending.
    async fn delete_pending(&self, booking_id: Uuid) -> Result<bool>;

    /// Records the provider's payment index on a pending booking that has none yet.
    async fn attach_payment_reference(&self, booking_id: Uuid, reference: &str) -> Result<bool>;

    /// Compare-and-set on status. `None` means the booking was not in `from`.
    async fn transition(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        transaction_id: Option<&str>,
    ) -> Result<Option<Booking>>;

    async fn list_pending_older_than(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<Booking>>;

    /// Marks a paid (or cancelled but charged) booking as having a refund in
    /// flight. `false` when another refund already holds the claim.
    async fn claim_refund(&self, booking_id: Uuid) -> Result<bool>;

    async fn release_refund_claim(&self, booking_id: Uuid) -> Result<()>;
}

#[async_trait::async_trait]
pub trait QrCodeStore: Send + Sync {
    /// Inserts only for a paid booking without an existing code.
    async fn insert_if_absent(&self, qr: &QrCodeRecord) -> Result<bool>;

    async fn find_by_booking(&self, booking_id: Uuid) -> Result<Option<QrCodeRecord>>;
}

#[async_trait::async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_pending(&self, new: &NewNotification) -> Result<NotificationRecord>;

    async fn set_status(&self, notification_id: Uuid, status: NotificationStatus) -> Result<()>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<NotificationRecord>>;
}

#[async_trait::async_trait]
pub trait BuyerDirectory: Send + Sync {
    async fn find(&self, user_id: Uuid) -> Result<Option<Buyer>>;

    async fn push_token(&self, user_id: Uuid) -> Result<Option<String>>;
}

#[derive(Clone)]
pub struct Stores {
    pub ticket_types: Arc<dyn TicketTypeStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub qr_codes: Arc<dyn QrCodeStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub buyers: Arc<dyn BuyerDirectory>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            ticket_types: Arc::new(ticket_types_repo::TicketTypesRepo { pool: pool.clone() }),
            bookings: Arc::new(bookings_repo::BookingsRepo { pool: pool.clone() }),
            qr_codes: Arc::new(qr_codes_repo::QrCodesRepo { pool: pool.clone() }),
            notifications: Arc::new(notifications_repo::NotificationsRepo { pool: pool.clone() }),
            buyers: Arc::new(buyers_repo::BuyersRepo { pool }),
        }
    }

    pub fn memory(store: Arc<memory::MemoryStore>) -> Self {
        Self {
            ticket_types: store.clone(),
            bookings: store.clone(),
            qr_codes: store.clone(),
            notifications: store.clone(),
            buyers: store,
        }
    }
}
