//! Course Market payment service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use course_market::adapters::http::{payment_router, PaymentAppState};
use course_market::adapters::memory::NoopEnrollmentCache;
use course_market::adapters::paymob::{PaymobCheckoutAdapter, PaymobConfig};
use course_market::adapters::postgres::{
    PostgresCatalogReader, PostgresEnrollmentReader, PostgresPaymentRepository,
    PostgresProcessedEventLedger, PostgresRoomMembership,
};
use course_market::adapters::redis::RedisEnrollmentCache;
use course_market::adapters::stripe::{StripeCheckoutAdapter, StripeConfig};
use course_market::application::{PruneProcessedEventsCommand, PruneProcessedEventsHandler};
use course_market::config::{AppConfig, RedisConfig};
use course_market::ports::{CheckoutGateways, EnrollmentCache, ProcessedEventLedger};

const PRUNE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    init_tracing(&config);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Starting course market payment service"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await
        .context("failed to connect to database")?;
    tracing::info!("Database connection established");

    if config.database.run_migrations {
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("failed to run migrations")?;
        tracing::info!("Database migrations applied");
    }

    let enrollment_cache = match &config.redis {
        Some(redis) => connect_enrollment_cache(redis).await?,
        None => {
            tracing::info!("Redis not configured, enrollment cache disabled");
            Arc::new(NoopEnrollmentCache) as Arc<dyn EnrollmentCache>
        }
    };

    let gateways = build_gateways(&config)?;
    tracing::info!(methods = ?gateways.methods(), "Payment gateways configured");

    let ledger: Arc<dyn ProcessedEventLedger> =
        Arc::new(PostgresProcessedEventLedger::new(pool.clone()));
    spawn_processed_event_pruner(
        ledger.clone(),
        config.payment.processed_event_retention_days,
    );

    let state = PaymentAppState {
        payments: Arc::new(PostgresPaymentRepository::new(pool.clone())),
        enrollments: Arc::new(PostgresEnrollmentReader::new(pool.clone())),
        catalog: Arc::new(PostgresCatalogReader::new(pool.clone())),
        ledger,
        rooms: Arc::new(PostgresRoomMembership::new(pool.clone())),
        enrollment_cache,
        gateways,
        gateway_timeout: config.payment.gateway_timeout(),
    };

    let frontend_origin: HeaderValue = config
        .server
        .frontend_origin()
        .parse()
        .context("frontend_url is not a valid origin")?;
    let cors = CorsLayer::new()
        .allow_origin(frontend_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static("x-user-id"),
        ]);

    let app = payment_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config
        .server
        .socket_addr()
        .context("invalid server host or port")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect_enrollment_cache(config: &RedisConfig) -> anyhow::Result<Arc<dyn EnrollmentCache>> {
    let client = redis::Client::open(config.url.as_str()).context("invalid Redis URL")?;
    let conn = client
        .get_multiplexed_async_connection()
        .await
        .context("failed to connect to Redis")?;
    tracing::info!(ttl_secs = config.enrollment_cache_ttl_secs, "Enrollment cache enabled");

    Ok(Arc::new(RedisEnrollmentCache::new(
        conn,
        config.enrollment_cache_ttl_secs,
    )))
}

fn build_gateways(config: &AppConfig) -> anyhow::Result<CheckoutGateways> {
    let payment = &config.payment;
    let frontend_url = config.server.frontend_origin();

    let stripe = StripeConfig::new(
        payment.stripe_api_key.expose_secret().as_str(),
        payment.stripe_webhook_secret.expose_secret().as_str(),
        frontend_url,
    )
    .with_base_url(payment.stripe_api_base_url.as_str())
    .with_currency(&payment.currency)
    .with_require_livemode(payment.stripe_require_livemode)
    .with_tolerance_secs(payment.webhook_tolerance_secs)
    .with_request_timeout(payment.gateway_timeout());
    let mut gateways = CheckoutGateways::new().with(Arc::new(StripeCheckoutAdapter::new(stripe)));

    if let Some(paymob) = payment.paymob()? {
        let paymob_config = PaymobConfig::new(
            paymob.secret_key.expose_secret().as_str(),
            paymob.public_key,
            paymob.hmac_secret.expose_secret().as_str(),
            paymob.integration_ids,
        )
        .with_base_url(paymob.api_base_url)
        .with_currency(&payment.currency)
        .with_redirection_url(config.server.checkout_success_url())
        .with_request_timeout(payment.gateway_timeout());
        let paymob_config = match paymob.notification_url {
            Some(url) => paymob_config.with_notification_url(url),
            None => paymob_config,
        };
        gateways = gateways.with(Arc::new(PaymobCheckoutAdapter::new(paymob_config)));
    }

    Ok(gateways)
}

/// Daily removal of processed-event records past the retention window.
fn spawn_processed_event_pruner(ledger: Arc<dyn ProcessedEventLedger>, retention_days: i64) {
    let handler = PruneProcessedEventsHandler::new(ledger);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            match handler
                .handle(PruneProcessedEventsCommand { retention_days })
                .await
            {
                Ok(removed) => tracing::info!(removed, retention_days, "Pruned processed webhook events"),
                Err(e) => tracing::error!(error = %e, "Failed to prune processed webhook events"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
