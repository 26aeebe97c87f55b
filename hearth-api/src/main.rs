use anyhow::Context;
use hearth_api::{app, metrics::ApiMetrics, state::AppState};
use hearth_core::payment::{GatewayMode, PaymentGateway, PaymentOrchestrator, SimulatedGateway};
use hearth_core::{EventBus, HotelStore, Services};
use hearth_store::app_config::Config;
use hearth_store::{DbClient, HttpCardGateway, MemoryStore, PgStore, RedisClient};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hearth_api=debug,hearth_core=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    let settings = config.hotel_settings().context("Invalid billing settings")?;
    tracing::info!("Starting Hearth API on port {}", config.server.port);

    let store: Arc<dyn HotelStore> = match &config.database.url {
        Some(url) => {
            let db = DbClient::new(url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Arc::new(PgStore::new(db.pool))
        }
        None => {
            tracing::warn!("database.url not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let gateway: Arc<dyn PaymentGateway> = match config.payment.mode {
        GatewayMode::Simulated => Arc::new(SimulatedGateway::new()),
        GatewayMode::Live => Arc::new(
            HttpCardGateway::from_config(&config.payment).context("Failed to configure payment gateway")?,
        ),
    };
    let payment_gateway = gateway.name();
    let orchestrator = PaymentOrchestrator::new(gateway, config.payment.failure_policy, settings.currency.clone());

    let redis = match &config.redis {
        Some(redis) => Some(Arc::new(
            RedisClient::new(&redis.url).context("Failed to create Redis client")?,
        )),
        None => None,
    };

    let events = EventBus::default();
    let services = Services::new(store.clone(), orchestrator, settings, events.clone());
    let metrics = ApiMetrics::new().context("Failed to register metrics")?;

    let app_state = AppState {
        services,
        store,
        events,
        redis,
        rate_limit: config.rate_limit.clone(),
        metrics: Arc::new(metrics),
        payment_gateway,
        request_timeout: Duration::from_secs(config.server.request_timeout_seconds),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
