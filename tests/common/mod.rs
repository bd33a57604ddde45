#![allow(dead_code)]

use event_ticketing::channels::{DeliveryChannel, OutboundMessage, Recipient};
use event_ticketing::domain::booking::{CreateBookingRequest, PaymentMethod};
use event_ticketing::domain::buyer::Buyer;
use event_ticketing::domain::notification::NotificationMedium;
use event_ticketing::domain::ticket::{TicketCategory, TicketType};
use event_ticketing::gateways::mock::MockGateway;
use event_ticketing::gateways::ProviderRegistry;
use event_ticketing::repo::memory::MemoryStore;
use event_ticketing::repo::Stores;
use event_ticketing::service::booking_service::BookingService;
use event_ticketing::service::confirmation_pipeline::ConfirmationPipeline;
use event_ticketing::service::notification_dispatcher::{DispatchMode, NotificationDispatcher};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const QR_SECRET: &str = "test-qr-secret";

pub struct RecordingChannel {
    pub medium: NotificationMedium,
    pub fail: bool,
    pub sent: Mutex<Vec<(Uuid, OutboundMessage)>>,
}

impl RecordingChannel {
    pub fn new(medium: NotificationMedium) -> Arc<Self> {
        Arc::new(Self {
            medium,
            fail: false,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(medium: NotificationMedium) -> Arc<Self> {
        Arc::new(Self {
            medium,
            fail: true,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }
}

#[async_trait::async_trait]
impl DeliveryChannel for RecordingChannel {
    fn medium(&self) -> NotificationMedium {
        self.medium
    }

    async fn deliver(&self, recipient: &Recipient, message: &OutboundMessage) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("{} channel down", self.medium.as_str());
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.buyer.user_id, message.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<MockGateway>,
    pub service: BookingService,
    pub pipeline: ConfirmationPipeline,
    pub email: Arc<RecordingChannel>,
    pub push: Arc<RecordingChannel>,
    pub ticket: TicketType,
    pub buyer: Buyer,
}

impl Harness {
    pub async fn new(gateway: MockGateway, capacity: i64, price_minor: i64) -> Self {
        Self::with_channels(
            gateway,
            capacity,
            price_minor,
            RecordingChannel::new(NotificationMedium::Email),
            RecordingChannel::new(NotificationMedium::Push),
        )
        .await
    }

    pub async fn with_channels(
        gateway: MockGateway,
        capacity: i64,
        price_minor: i64,
        email: Arc<RecordingChannel>,
        push: Arc<RecordingChannel>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let ticket = ticket_type(capacity, price_minor);
        store.add_ticket_type(ticket.clone()).await;

        let buyer = buyer();
        store.add_buyer(buyer.clone()).await;
        store.set_push_token(buyer.user_id, "device-token-1").await;

        let gateway = Arc::new(gateway);
        let stores = Stores::memory(store.clone());
        let dispatcher = NotificationDispatcher::new(
            stores.notifications.clone(),
            stores.buyers.clone(),
            Duration::from_secs(2),
        )
        .with_channel(email.clone())
        .with_channel(push.clone());

        let service = BookingService {
            stores,
            providers: ProviderRegistry::new().with(PaymentMethod::Khalti, gateway.clone()),
            dispatcher,
            dispatch_mode: DispatchMode::Inline,
            public_base_url: "http://tickets.test".to_string(),
        };
        let pipeline = ConfirmationPipeline {
            bookings: service.clone(),
            qr_secret: QR_SECRET.to_string(),
        };

        Self {
            store,
            gateway,
            service,
            pipeline,
            email,
            push,
            ticket,
            buyer,
        }
    }

    pub fn request(&self, quantity: i64) -> CreateBookingRequest {
        CreateBookingRequest {
            ticket_id: self.ticket.ticket_type_id,
            quantity,
            payment_method: Some("khalti".to_string()),
        }
    }
}

pub fn ticket_type(capacity: i64, price_minor: i64) -> TicketType {
    TicketType {
        ticket_type_id: Uuid::new_v4(),
        event_id: Uuid::new_v4(),
        event_name: "Kathmandu Jazz Night".to_string(),
        name: "General Admission".to_string(),
        price_minor,
        quantity: capacity,
        category: TicketCategory::Ga,
        created_at: chrono::Utc::now(),
    }
}

pub fn buyer() -> Buyer {
    Buyer {
        user_id: Uuid::new_v4(),
        name: "Sita Sharma".to_string(),
        email: "sita@example.com".to_string(),
        phone: Some("+9779800000000".to_string()),
    }
}
