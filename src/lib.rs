pub mod bootstrap;
pub mod channels;
pub mod config;
pub mod domain {
    pub mod booking;
    pub mod buyer;
    pub mod error;
    pub mod notification;
    pub mod payment;
    pub mod qr;
    pub mod ticket;
}
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod bookings;
        pub mod notifications;
        pub mod ops;
        pub mod payments;
    }
    pub mod middleware {
        pub mod caller;
        pub mod rate_limit;
    }
    pub mod router;
}
pub mod inventory;
pub mod repo;
pub mod service {
    pub mod booking_service;
    pub mod confirmation_pipeline;
    pub mod notification_dispatcher;
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: service::booking_service::BookingService,
    pub pipeline: service::confirmation_pipeline::ConfirmationPipeline,
    pub pool: Option<sqlx::PgPool>,
    pub redis_client: Option<redis::Client>,
    pub frontend_url: String,
    pub internal_api_key: String,
}
