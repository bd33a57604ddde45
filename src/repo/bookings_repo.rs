use crate::domain::booking::{Booking, BookingStatus, NewBooking, PaymentMethod};
use crate::domain::error::BookingError;
use crate::inventory::accountant;
use crate::repo::ticket_types_repo::TicketTypesRepo;
use crate::repo::BookingStore;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const BOOKING_COLUMNS: &str =
    "booking_id, buyer_id, ticket_type_id, quantity, total_amount_minor, status, payment_method, transaction_id, payment_reference, created_at";

#[derive(Clone)]
pub struct BookingsRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl BookingStore for BookingsRepo {
    async fn reserve(&self, new: &NewBooking) -> Result<Booking, BookingError> {
        accountant::validate_quantity(new.quantity)?;

        let mut tx = self.pool.begin().await.map_err(anyhow::Error::from)?;
        let ticket = TicketTypesRepo::lock_tx(&mut tx, new.ticket_type_id)
            .await?
            .ok_or(BookingError::TicketTypeNotFound(new.ticket_type_id))?;
        let lines = TicketTypesRepo::booking_lines_tx(&mut tx, new.ticket_type_id).await?;

        // Dropping `tx` on rejection rolls back and releases the lock.
        accountant::admit(&ticket, &lines, new.quantity)?;

        let total_amount_minor = ticket
            .price_minor
            .checked_mul(new.quantity)
            .ok_or_else(|| anyhow!("total amount overflow"))?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO bookings (
                booking_id, buyer_id, ticket_type_id, quantity, total_amount_minor, status, payment_method
            ) VALUES ($1, $2, $3, $4, $5, 'pending', $6)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(new.booking_id)
        .bind(new.buyer_id)
        .bind(new.ticket_type_id)
        .bind(new.quantity)
        .bind(total_amount_minor)
        .bind(new.payment_method.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(anyhow::Error::from)?;

        tx.commit().await.map_err(anyhow::Error::from)?;
        Ok(map_booking(&row)?)
    }

    async fn get(&self, booking_id: Uuid) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!("SELECT {} FROM bookings WHERE booking_id = $1", BOOKING_COLUMNS))
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| map_booking(&r)).transpose()
    }

    async fn delete_pending(&self, booking_id: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM bookings WHERE booking_id = $1 AND status = 'pending'")
            .bind(booking_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn attach_payment_reference(&self, booking_id: Uuid, reference: &str) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE bookings
            SET payment_reference = $2, updated_at = now()
            WHERE booking_id = $1 AND status = 'pending' AND payment_reference IS NULL
            "#,
        )
        .bind(booking_id)
        .bind(reference)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn transition(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        transaction_id: Option<&str>,
    ) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE bookings
            SET status = $3, transaction_id = COALESCE($4, transaction_id), updated_at = now()
            WHERE booking_id = $1 AND status = $2
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| map_booking(&r)).transpose()
    }

    async fn list_pending_older_than(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM bookings WHERE status = 'pending' AND created_at < $1 ORDER BY created_at ASC LIMIT $2",
            BOOKING_COLUMNS
        ))
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_booking).collect()
    }

    async fn claim_refund(&self, booking_id: Uuid) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE bookings
            SET refund_claimed_at = now(), updated_at = now()
            WHERE booking_id = $1 AND status IN ('paid', 'cancelled') AND refund_claimed_at IS NULL
            "#,
        )
        .bind(booking_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn release_refund_claim(&self, booking_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE bookings SET refund_claimed_at = NULL WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn map_booking(r: &PgRow) -> Result<Booking> {
    let status: String = r.get("status");
    let method: String = r.get("payment_method");
    Ok(Booking {
        booking_id: r.get("booking_id"),
        buyer_id: r.get("buyer_id"),
        ticket_type_id: r.get("ticket_type_id"),
        quantity: r.get("quantity"),
        total_amount_minor: r.get("total_amount_minor"),
        status: BookingStatus::parse(&status).ok_or_else(|| anyhow!("unknown booking status {}", status))?,
        payment_method: PaymentMethod::parse(&method).ok_or_else(|| anyhow!("unknown payment method {}", method))?,
        transaction_id: r.get("transaction_id"),
        payment_reference: r.get("payment_reference"),
        created_at: r.get("created_at"),
    })
}
