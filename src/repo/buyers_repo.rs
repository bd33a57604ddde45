use crate::domain::buyer::Buyer;
use crate::repo::BuyerDirectory;
use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Read-only view over tables owned by the account service.
#[derive(Clone)]
pub struct BuyersRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl BuyerDirectory for BuyersRepo {
    async fn find(&self, user_id: Uuid) -> Result<Option<Buyer>> {
        let row = sqlx::query("SELECT user_id, full_name, email, phone FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Buyer {
            user_id: r.get("user_id"),
            name: r.get("full_name"),
            email: r.get("email"),
            phone: r.get("phone"),
        }))
    }

    async fn push_token(&self, user_id: Uuid) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT token FROM notification_tokens WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("token")))
    }
}
