use crate::domain::notification::{NewNotification, NotificationMedium, NotificationRecord, NotificationStatus};
use crate::repo::NotificationStore;
use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct NotificationsRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl NotificationStore for NotificationsRepo {
    async fn insert_pending(&self, new: &NewNotification) -> Result<NotificationRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO notifications (notification_id, user_id, event_id, title, message, medium, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending')
            RETURNING notification_id, user_id, event_id, title, message, medium, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.event_id)
        .bind(new.title.as_deref())
        .bind(&new.message)
        .bind(new.medium.as_str())
        .fetch_one(&self.pool)
        .await?;

        map_notification(&row)
    }

    async fn set_status(&self, notification_id: Uuid, status: NotificationStatus) -> Result<()> {
        sqlx::query("UPDATE notifications SET status = $2 WHERE notification_id = $1")
            .bind(notification_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<NotificationRecord>> {
        let rows = sqlx::query(
            "SELECT notification_id, user_id, event_id, title, message, medium, status, created_at FROM notifications WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_notification).collect()
    }
}

fn map_notification(r: &PgRow) -> Result<NotificationRecord> {
    let medium: String = r.get("medium");
    let status: String = r.get("status");
    Ok(NotificationRecord {
        notification_id: r.get("notification_id"),
        user_id: r.get("user_id"),
        event_id: r.get("event_id"),
        title: r.get("title"),
        message: r.get("message"),
        medium: NotificationMedium::parse(&medium).ok_or_else(|| anyhow!("unknown medium {}", medium))?,
        status: NotificationStatus::parse(&status).ok_or_else(|| anyhow!("unknown notification status {}", status))?,
        created_at: r.get("created_at"),
    })
}
