use axum::middleware::from_fn_with_state;
use event_ticketing::bootstrap;
use event_ticketing::config::AppConfig;
use event_ticketing::http::middleware::rate_limit::{enforce, RateLimitState};
use event_ticketing::repo::Stores;
use event_ticketing::service::booking_service::BookingService;
use event_ticketing::service::confirmation_pipeline::ConfirmationPipeline;
use event_ticketing::service::notification_dispatcher::DispatchMode;
use event_ticketing::AppState;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let stores = Stores::postgres(pool.clone());
    let client = reqwest::Client::new();
    let providers = bootstrap::providers(&cfg, &client);
    let dispatcher = bootstrap::dispatcher(&cfg, &stores, &client)?;

    let bookings = BookingService {
        stores,
        providers,
        dispatcher,
        dispatch_mode: DispatchMode::Background,
        public_base_url: cfg.public_base_url.clone(),
    };
    let pipeline = ConfirmationPipeline {
        bookings: bookings.clone(),
        qr_secret: cfg.qr_signing_secret.clone(),
    };

    let state = AppState {
        bookings,
        pipeline,
        pool: Some(pool),
        redis_client: Some(redis::Client::open(cfg.redis_url.clone())?),
        frontend_url: cfg.frontend_url.clone(),
        internal_api_key: cfg.internal_api_key.clone(),
    };

    let app = event_ticketing::http::router::build(state).layer(from_fn_with_state(
        RateLimitState {
            redis_client: redis::Client::open(cfg.redis_url.clone())?,
            max_per_minute: cfg.rate_limit_per_minute,
        },
        enforce,
    ));

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
