mod common;

use common::RecordingChannel;
use event_ticketing::channels::sms::HttpSmsChannel;
use event_ticketing::domain::notification::{NotificationMedium, NotificationStatus};
use event_ticketing::repo::memory::MemoryStore;
use event_ticketing::repo::Stores;
use event_ticketing::service::notification_dispatcher::NotificationDispatcher;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

async fn dispatcher_with(store: Arc<MemoryStore>) -> NotificationDispatcher {
    let stores = Stores::memory(store);
    NotificationDispatcher::new(stores.notifications, stores.buyers, Duration::from_secs(1))
}

#[tokio::test]
async fn successful_delivery_is_recorded_sent() {
    let store = Arc::new(MemoryStore::new());
    let email = RecordingChannel::new(NotificationMedium::Email);
    let dispatcher = dispatcher_with(store.clone()).await.with_channel(email.clone());
    let buyer = common::buyer();

    let record = dispatcher
        .notify(&buyer, Uuid::new_v4(), "Doors open at 7pm", NotificationMedium::Email, Some("Reminder"))
        .await
        .unwrap();

    assert_eq!(record.status, NotificationStatus::Sent);
    assert_eq!(email.messages()[0].title, "Reminder");
    assert_eq!(store.all_notifications().await[0].status, NotificationStatus::Sent);
}

#[tokio::test]
async fn channel_error_is_recorded_failed_not_returned() {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = dispatcher_with(store.clone())
        .await
        .with_channel(RecordingChannel::failing(NotificationMedium::Email));

    let record = dispatcher
        .notify(&common::buyer(), Uuid::new_v4(), "hello", NotificationMedium::Email, None)
        .await
        .unwrap();

    assert_eq!(record.status, NotificationStatus::Failed);
    assert_eq!(store.all_notifications().await[0].status, NotificationStatus::Failed);
}

#[tokio::test]
async fn push_without_token_fails_without_calling_channel() {
    let store = Arc::new(MemoryStore::new());
    let push = RecordingChannel::new(NotificationMedium::Push);
    let dispatcher = dispatcher_with(store.clone()).await.with_channel(push.clone());

    let record = dispatcher
        .notify(&common::buyer(), Uuid::new_v4(), "hello", NotificationMedium::Push, None)
        .await
        .unwrap();

    assert_eq!(record.status, NotificationStatus::Failed);
    assert_eq!(push.count(), 0);
}

#[tokio::test]
async fn unregistered_medium_is_a_failed_delivery() {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = dispatcher_with(store.clone()).await;

    let record = dispatcher
        .notify(&common::buyer(), Uuid::new_v4(), "hello", NotificationMedium::Sms, None)
        .await
        .unwrap();

    assert_eq!(record.status, NotificationStatus::Failed);
}

#[tokio::test]
async fn mediums_are_dispatched_independently() {
    let store = Arc::new(MemoryStore::new());
    let buyer = common::buyer();
    store.set_push_token(buyer.user_id, "tok").await;
    let email = RecordingChannel::new(NotificationMedium::Email);
    let dispatcher = dispatcher_with(store.clone())
        .await
        .with_channel(email.clone())
        .with_channel(RecordingChannel::failing(NotificationMedium::Push))
        .with_channel(Arc::new(HttpSmsChannel {
            endpoint: None,
            token: String::new(),
            sender: "TICKETS".to_string(),
            client: reqwest::Client::new(),
        }));

    let records = dispatcher
        .notify_all(
            &buyer,
            Uuid::new_v4(),
            "Your booking is confirmed",
            &[NotificationMedium::Email, NotificationMedium::Push, NotificationMedium::Sms],
            None,
        )
        .await;

    let statuses: Vec<_> = records.iter().map(|r| (r.medium, r.status)).collect();
    assert_eq!(
        statuses,
        vec![
            (NotificationMedium::Email, NotificationStatus::Sent),
            (NotificationMedium::Push, NotificationStatus::Failed),
            (NotificationMedium::Sms, NotificationStatus::Failed),
        ]
    );
    assert_eq!(email.count(), 1);
    assert_eq!(store.all_notifications().await.len(), 3);
}

#[tokio::test]
async fn sms_without_gateway_is_recorded_failed() {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = dispatcher_with(store.clone()).await.with_channel(Arc::new(HttpSmsChannel {
        endpoint: None,
        token: String::new(),
        sender: "TICKETS".to_string(),
        client: reqwest::Client::new(),
    }));

    let record = dispatcher
        .notify(&common::buyer(), Uuid::new_v4(), "Gates open at 6pm", NotificationMedium::Sms, None)
        .await
        .unwrap();

    assert_eq!(record.status, NotificationStatus::Failed);
    assert_eq!(store.all_notifications().await[0].status, NotificationStatus::Failed);
}
