use crate::domain::buyer::Buyer;
use crate::domain::notification::NotificationMedium;
use anyhow::Result;

pub mod email;
pub mod push;
pub mod sms;

#[derive(Debug, Clone)]
pub struct Recipient {
    pub buyer: Buyer,
    pub push_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub title: String,
    pub body: String,
}

#[async_trait::async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn medium(&self) -> NotificationMedium;

    async fn deliver(&self, recipient: &Recipient, message: &OutboundMessage) -> Result<()>;
}
