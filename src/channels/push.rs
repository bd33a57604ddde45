use crate::channels::{DeliveryChannel, OutboundMessage, Recipient};
use crate::domain::notification::NotificationMedium;
use anyhow::{anyhow, bail, Result};
use serde_json::json;

pub struct FcmPushChannel {
    pub endpoint: String,
    pub server_key: String,
    pub client: reqwest::Client,
}

#[async_trait::async_trait]
impl DeliveryChannel for FcmPushChannel {
    fn medium(&self) -> NotificationMedium {
        NotificationMedium::Push
    }

    async fn deliver(&self, recipient: &Recipient, message: &OutboundMessage) -> Result<()> {
        let token = recipient
            .push_token
            .as_deref()
            .ok_or_else(|| anyhow!("no push token for user {}", recipient.buyer.user_id))?;

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&json!({
                "to": token,
                "notification": {
                    "title": message.title,
                    "body": message.body,
                },
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("fcm returned HTTP {}", resp.status().as_u16());
        }

        // FCM answers 200 with per-token failures in the body.
        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        if body.get("failure").and_then(|f| f.as_i64()).unwrap_or(0) > 0 {
            bail!("fcm rejected token: {}", body);
        }
        Ok(())
    }
}
