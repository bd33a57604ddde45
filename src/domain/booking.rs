use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Paid => "paid",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "paid" => Some(BookingStatus::Paid),
            "cancelled" => Some(BookingStatus::Cancelled),
            "refunded" => Some(BookingStatus::Refunded),
            _ => None,
        }
    }

    /// Legal edges: pending -> paid, pending -> cancelled, paid -> refunded.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Paid)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Paid, BookingStatus::Refunded)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Refunded)
    }

    /// Bookings in these states hold inventory.
    pub fn holds_inventory(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Paid)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Khalti,
    Esewa,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Khalti => "khalti",
            PaymentMethod::Esewa => "esewa",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "khalti" => Some(PaymentMethod::Khalti),
            "esewa" => Some(PaymentMethod::Esewa),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: Uuid,
    pub buyer_id: Uuid,
    pub ticket_type_id: Uuid,
    pub quantity: i64,
    pub total_amount_minor: i64,
    pub status: BookingStatus,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    /// Payment index handed out by the provider when the payment was started.
    pub payment_reference: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Booking {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id
    }
}

/// The slice of a booking the inventory accountant needs.
#[derive(Debug, Clone, Copy)]
pub struct BookingLine {
    pub booking_id: Uuid,
    pub quantity: i64,
    pub status: BookingStatus,
}

impl From<&Booking> for BookingLine {
    fn from(b: &Booking) -> Self {
        Self {
            booking_id: b.booking_id,
            quantity: b.quantity,
            status: b.status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub booking_id: Uuid,
    pub buyer_id: Uuid,
    pub ticket_type_id: Uuid,
    pub quantity: i64,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub ticket_id: Uuid,
    pub quantity: i64,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateBookingResponse {
    pub booking_id: Uuid,
    pub payment_url: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub booking_id: Uuid,
    pub ticket_type_id: Uuid,
    pub quantity: i64,
    pub total_amount_minor: i64,
    pub status: BookingStatus,
    pub payment_method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Booking> for BookingView {
    fn from(b: Booking) -> Self {
        Self {
            booking_id: b.booking_id,
            ticket_type_id: b.ticket_type_id,
            quantity: b.quantity,
            total_amount_minor: b.total_amount_minor,
            status: b.status,
            payment_method: b.payment_method,
            transaction_id: b.transaction_id,
            created_at: b.created_at,
        }
    }
}
