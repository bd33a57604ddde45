use crate::channels::{DeliveryChannel, OutboundMessage, Recipient};
use crate::domain::notification::NotificationMedium;
use anyhow::{anyhow, bail, Result};
use serde_json::json;

/// Posts to an HTTP SMS gateway. Without a configured endpoint every delivery
/// fails, so the notification row ends up `failed`.
pub struct HttpSmsChannel {
    pub endpoint: Option<String>,
    pub token: String,
    pub sender: String,
    pub client: reqwest::Client,
}

#[async_trait::async_trait]
impl DeliveryChannel for HttpSmsChannel {
    fn medium(&self) -> NotificationMedium {
        NotificationMedium::Sms
    }

    async fn deliver(&self, recipient: &Recipient, message: &OutboundMessage) -> Result<()> {
        let phone = recipient
            .buyer
            .phone
            .as_deref()
            .ok_or_else(|| anyhow!("no phone number for user {}", recipient.buyer.user_id))?;

        let Some(endpoint) = &self.endpoint else {
            tracing::info!(user_id = %recipient.buyer.user_id, "sms gateway not configured, dropping: {}", message.body);
            bail!("sms gateway not configured");
        };

        let resp = self
            .client
            .post(endpoint)
            .json(&json!({
                "token": self.token,
                "from": self.sender,
                "to": phone,
                "text": message.body,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("sms gateway returned HTTP {}", resp.status().as_u16());
        }
        Ok(())
    }
}
