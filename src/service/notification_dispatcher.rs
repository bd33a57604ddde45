use crate::channels::{DeliveryChannel, OutboundMessage, Recipient};
use crate::domain::buyer::Buyer;
use crate::domain::notification::{NewNotification, NotificationMedium, NotificationRecord, NotificationStatus};
use crate::repo::{BuyerDirectory, NotificationStore};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone)]
pub struct NotificationDispatcher {
    pub notifications: Arc<dyn NotificationStore>,
    pub buyers: Arc<dyn BuyerDirectory>,
    pub channels: HashMap<NotificationMedium, Arc<dyn DeliveryChannel>>,
    pub timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        buyers: Arc<dyn BuyerDirectory>,
        timeout: Duration,
    ) -> Self {
        Self {
            notifications,
            buyers,
            channels: HashMap::new(),
            timeout,
        }
    }

    pub fn with_channel(mut self, channel: Arc<dyn DeliveryChannel>) -> Self {
        self.channels.insert(channel.medium(), channel);
        self
    }

    /// Records a pending row, attempts delivery, then records the outcome.
    /// Channel failures end up as `failed` rows; only storage errors escape.
    pub async fn notify(
        &self,
        user: &Buyer,
        event_id: Uuid,
        message: &str,
        medium: NotificationMedium,
        title: Option<&str>,
    ) -> Result<NotificationRecord> {
        let mut record = self
            .notifications
            .insert_pending(&NewNotification {
                user_id: user.user_id,
                event_id,
                title: title.map(str::to_string),
                message: message.to_string(),
                medium,
            })
            .await?;

        let outcome = self.deliver(user, message, medium, title).await;
        let status = match outcome {
            Ok(()) => {
                tracing::info!(user_id = %user.user_id, medium = medium.as_str(), "notification sent");
                NotificationStatus::Sent
            }
            Err(e) => {
                tracing::warn!(user_id = %user.user_id, medium = medium.as_str(), "notification failed: {:#}", e);
                NotificationStatus::Failed
            }
        };

        self.notifications.set_status(record.notification_id, status).await?;
        record.status = status;
        Ok(record)
    }

    /// One independent `notify` per medium; partial delivery is expected.
    pub async fn notify_all(
        &self,
        user: &Buyer,
        event_id: Uuid,
        message: &str,
        mediums: &[NotificationMedium],
        title: Option<&str>,
    ) -> Vec<NotificationRecord> {
        let mut out = Vec::with_capacity(mediums.len());
        for medium in mediums {
            match self.notify(user, event_id, message, *medium, title).await {
                Ok(record) => out.push(record),
                Err(e) => tracing::error!(user_id = %user.user_id, medium = medium.as_str(), "could not record notification: {:#}", e),
            }
        }
        out
    }

    async fn deliver(
        &self,
        user: &Buyer,
        message: &str,
        medium: NotificationMedium,
        title: Option<&str>,
    ) -> Result<()> {
        let channel = self
            .channels
            .get(&medium)
            .ok_or_else(|| anyhow!("no channel registered for {}", medium.as_str()))?;

        let push_token = if medium == NotificationMedium::Push {
            Some(
                self.buyers
                    .push_token(user.user_id)
                    .await?
                    .ok_or_else(|| anyhow!("no push token for user {}", user.user_id))?,
            )
        } else {
            None
        };

        let recipient = Recipient {
            buyer: user.clone(),
            push_token,
        };
        let outbound = OutboundMessage {
            title: title.map(str::to_string).unwrap_or_else(|| "Event notification".to_string()),
            body: message.to_string(),
        };

        tokio::time::timeout(self.timeout, channel.deliver(&recipient, &outbound))
            .await
            .map_err(|_| anyhow!("{} delivery timed out", medium.as_str()))?
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Inline,
    Background,
}

impl NotificationDispatcher {
    /// Fans out without ever surfacing an error to the caller. In background
    /// mode the caller does not wait for any channel.
    pub async fn dispatch(
        &self,
        mode: DispatchMode,
        user: Buyer,
        event_id: Uuid,
        message: String,
        mediums: Vec<NotificationMedium>,
        title: Option<String>,
    ) {
        match mode {
            DispatchMode::Inline => {
                self.notify_all(&user, event_id, &message, &mediums, title.as_deref())
                    .await;
            }
            DispatchMode::Background => {
                let dispatcher = self.clone();
                tokio::spawn(async move {
                    dispatcher
                        .notify_all(&user, event_id, &message, &mediums, title.as_deref())
                        .await;
                });
            }
        }
    }
}
