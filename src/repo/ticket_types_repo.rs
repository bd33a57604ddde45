use crate::domain::booking::{BookingLine, BookingStatus};
use crate::domain::ticket::{TicketCategory, TicketType};
use crate::repo::TicketTypeStore;
use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

const SELECT_TICKET_TYPE: &str = r#"
    SELECT t.ticket_type_id, t.event_id, e.name AS event_name, t.name, t.price_minor, t.quantity, t.category, t.created_at
    FROM ticket_types t
    JOIN events e ON e.event_id = t.event_id
    WHERE t.ticket_type_id = $1
"#;

#[derive(Clone)]
pub struct TicketTypesRepo {
    pub pool: PgPool,
}

impl TicketTypesRepo {
    /// Row lock held until `tx` ends; serializes every reservation on this
    /// ticket type.
    pub async fn lock_tx(tx: &mut Transaction<'_, Postgres>, ticket_type_id: Uuid) -> Result<Option<TicketType>> {
        let row = sqlx::query(&format!("{} FOR UPDATE OF t", SELECT_TICKET_TYPE))
            .bind(ticket_type_id)
            .fetch_optional(&mut **tx)
            .await?;

        row.map(|r| map_ticket_type(&r)).transpose()
    }

    pub async fn booking_lines_tx(
        tx: &mut Transaction<'_, Postgres>,
        ticket_type_id: Uuid,
    ) -> Result<Vec<BookingLine>> {
        let rows = sqlx::query(
            "SELECT booking_id, quantity, status FROM bookings WHERE ticket_type_id = $1 AND status IN ('pending', 'paid')",
        )
        .bind(ticket_type_id)
        .fetch_all(&mut **tx)
        .await?;

        rows.iter().map(map_line).collect()
    }
}

#[async_trait::async_trait]
impl TicketTypeStore for TicketTypesRepo {
    async fn find(&self, ticket_type_id: Uuid) -> Result<Option<TicketType>> {
        let row = sqlx::query(SELECT_TICKET_TYPE)
            .bind(ticket_type_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| map_ticket_type(&r)).transpose()
    }

    async fn booking_lines(&self, ticket_type_id: Uuid) -> Result<Vec<BookingLine>> {
        let rows = sqlx::query(
            "SELECT booking_id, quantity, status FROM bookings WHERE ticket_type_id = $1 AND status IN ('pending', 'paid')",
        )
        .bind(ticket_type_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_line).collect()
    }
}

fn map_ticket_type(r: &PgRow) -> Result<TicketType> {
    let category: String = r.get("category");
    Ok(TicketType {
        ticket_type_id: r.get("ticket_type_id"),
        event_id: r.get("event_id"),
        event_name: r.get("event_name"),
        name: r.get("name"),
        price_minor: r.get("price_minor"),
        quantity: r.get("quantity"),
        category: TicketCategory::parse(&category).ok_or_else(|| anyhow!("unknown ticket category {}", category))?,
        created_at: r.get("created_at"),
    })
}

fn map_line(r: &PgRow) -> Result<BookingLine> {
    let status: String = r.get("status");
    Ok(BookingLine {
        booking_id: r.get("booking_id"),
        quantity: r.get("quantity"),
        status: BookingStatus::parse(&status).ok_or_else(|| anyhow!("unknown booking status {}", status))?,
    })
}
