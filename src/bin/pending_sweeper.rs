use anyhow::Result;
use event_ticketing::bootstrap;
use event_ticketing::config::AppConfig;
use event_ticketing::repo::Stores;
use event_ticketing::service::booking_service::BookingService;
use event_ticketing::service::confirmation_pipeline::ConfirmationPipeline;
use event_ticketing::service::notification_dispatcher::DispatchMode;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cfg.database_url)
        .await?;

    let stores = Stores::postgres(pool);
    // Expired bookings with a started payment are looked up before they are
    // cancelled, and confirmed (QR plus notifications) if the payment went through.
    let client = reqwest::Client::new();
    let dispatcher = bootstrap::dispatcher(&cfg, &stores, &client)?;
    let bookings = BookingService {
        stores,
        providers: bootstrap::providers(&cfg, &client),
        dispatcher,
        dispatch_mode: DispatchMode::Inline,
        public_base_url: cfg.public_base_url.clone(),
    };
    let pipeline = ConfirmationPipeline {
        bookings,
        qr_secret: cfg.qr_signing_secret.clone(),
    };

    let ttl = chrono::Duration::minutes(cfg.pending_booking_ttl_minutes);
    tracing::info!(ttl_minutes = cfg.pending_booking_ttl_minutes, "pending sweeper started");

    loop {
        let cutoff = chrono::Utc::now() - ttl;
        match pipeline.sweep_expired(cutoff, 100).await {
            Ok(report) => {
                if report.cancelled > 0 || report.deferred > 0 || !report.completed.is_empty() {
                    tracing::info!(
                        cancelled = report.cancelled,
                        deferred = report.deferred,
                        confirmed = report.completed.len(),
                        "pending sweep finished"
                    );
                }
            }
            Err(e) => tracing::error!("sweep failed: {}", e),
        }

        tokio::time::sleep(std::time::Duration::from_secs(cfg.sweep_interval_secs)).await;
    }
}
