use crate::domain::qr::QrCodeRecord;
use crate::repo::QrCodeStore;
use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct QrCodesRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl QrCodeStore for QrCodesRepo {
    async fn insert_if_absent(&self, qr: &QrCodeRecord) -> Result<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO qr_codes (booking_id, payload, image_svg_base64, created_at)
            SELECT $1, $2, $3, $4
            WHERE EXISTS (SELECT 1 FROM bookings WHERE booking_id = $1 AND status = 'paid')
            ON CONFLICT (booking_id) DO NOTHING
            "#,
        )
        .bind(qr.booking_id)
        .bind(&qr.payload)
        .bind(&qr.image_svg_base64)
        .bind(qr.created_at)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> Result<Option<QrCodeRecord>> {
        let row = sqlx::query("SELECT booking_id, payload, image_svg_base64, created_at FROM qr_codes WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| QrCodeRecord {
            booking_id: r.get("booking_id"),
            payload: r.get("payload"),
            image_svg_base64: r.get("image_svg_base64"),
            created_at: r.get("created_at"),
        }))
    }
}
