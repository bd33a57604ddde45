use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketCategory {
    Vip,
    Ga,
    Student,
    Discount,
}

impl TicketCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketCategory::Vip => "VIP",
            TicketCategory::Ga => "GA",
            TicketCategory::Student => "STUDENT",
            TicketCategory::Discount => "DISCOUNT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "VIP" => Some(TicketCategory::Vip),
            "GA" => Some(TicketCategory::Ga),
            "STUDENT" => Some(TicketCategory::Student),
            "DISCOUNT" => Some(TicketCategory::Discount),
            _ => None,
        }
    }
}

/// A priced admission category of one event. `quantity` is the hard cap the
/// inventory accountant enforces across pending and paid bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketType {
    pub ticket_type_id: Uuid,
    pub event_id: Uuid,
    pub event_name: String,
    pub name: String,
    pub price_minor: i64,
    pub quantity: i64,
    pub category: TicketCategory,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResponse {
    pub ticket_type_id: Uuid,
    pub quantity: i64,
    pub available: i64,
}
