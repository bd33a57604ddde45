use crate::domain::booking::BookingLine;
use crate::domain::error::BookingError;
use crate::domain::ticket::TicketType;
use uuid::Uuid;

/// Tickets still sellable for `ticket`, counting pending and paid bookings.
/// `excluding` drops one booking so it can be revalidated in place.
pub fn available(ticket: &TicketType, bookings: &[BookingLine], excluding: Option<Uuid>) -> i64 {
    let held: i64 = bookings
        .iter()
        .filter(|b| b.status.holds_inventory())
        .filter(|b| excluding != Some(b.booking_id))
        .map(|b| b.quantity)
        .sum();

    (ticket.quantity - held).max(0)
}

pub fn validate_quantity(quantity: i64) -> Result<(), BookingError> {
    if quantity <= 0 {
        return Err(BookingError::InvalidQuantity);
    }
    Ok(())
}

/// Must run against the same snapshot the caller is about to insert into.
pub fn admit(ticket: &TicketType, bookings: &[BookingLine], requested: i64) -> Result<(), BookingError> {
    validate_quantity(requested)?;
    let remaining = available(ticket, bookings, None);
    if requested > remaining {
        return Err(BookingError::InsufficientInventory { available: remaining });
    }
    Ok(())
}
