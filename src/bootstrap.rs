use crate::channels::email::SmtpEmailChannel;
use crate::channels::push::FcmPushChannel;
use crate::channels::sms::HttpSmsChannel;
use crate::config::AppConfig;
use crate::domain::booking::PaymentMethod;
use crate::gateways::khalti::KhaltiGateway;
use crate::gateways::mock::{MockBehavior, MockGateway};
use crate::gateways::{PaymentProvider, ProviderRegistry};
use crate::repo::Stores;
use crate::service::notification_dispatcher::NotificationDispatcher;
use std::sync::Arc;
use std::time::Duration;

pub fn providers(cfg: &AppConfig, client: &reqwest::Client) -> ProviderRegistry {
    let provider: Arc<dyn PaymentProvider> = match cfg.payment_provider.as_str() {
        "mock" => {
            let behavior = MockBehavior::parse(&cfg.mock_provider_behavior);
            tracing::warn!(?behavior, "using mock payment provider");
            Arc::new(MockGateway::new(behavior))
        }
        _ => Arc::new(KhaltiGateway {
            initiate_url: cfg.khalti_initiate_url.clone(),
            lookup_url: cfg.khalti_lookup_url.clone(),
            refund_url: cfg.khalti_refund_url.clone(),
            secret_key: cfg.khalti_secret_key.clone(),
            timeout_ms: cfg.provider_timeout_ms,
            client: client.clone(),
        }),
    };
    ProviderRegistry::new().with(PaymentMethod::Khalti, provider)
}

pub fn dispatcher(cfg: &AppConfig, stores: &Stores, client: &reqwest::Client) -> anyhow::Result<NotificationDispatcher> {
    Ok(NotificationDispatcher::new(
        stores.notifications.clone(),
        stores.buyers.clone(),
        Duration::from_millis(cfg.notification_timeout_ms),
    )
    .with_channel(Arc::new(SmtpEmailChannel::new(
        &cfg.smtp_host,
        cfg.smtp_port,
        &cfg.smtp_username,
        &cfg.smtp_password,
        &cfg.mail_from,
    )?))
    .with_channel(Arc::new(FcmPushChannel {
        endpoint: cfg.fcm_endpoint.clone(),
        server_key: cfg.fcm_server_key.clone(),
        client: client.clone(),
    }))
    .with_channel(Arc::new(HttpSmsChannel {
        endpoint: cfg.sms_api_url.clone(),
        token: cfg.sms_api_token.clone(),
        sender: cfg.sms_sender.clone(),
        client: client.clone(),
    })))
}
