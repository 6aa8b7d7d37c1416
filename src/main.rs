use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use subhub::adapters::email::{ResendConfig, ResendSender};
use subhub::adapters::http::{billing_router, BillingAppState};
use subhub::adapters::postgres::{
    PostgresSubscriptionStore, PostgresUserDirectory, PostgresWebhookEventRepository,
};
use subhub::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use subhub::config::{AppConfig, PaymentConfig};
use subhub::domain::billing::{
    PlanCatalog, PlanEntry, PlanType, Recurrency, WebhookVerifier,
};
use subhub::ports::WebhookEventRepository;

/// Webhook audit rows older than this are swept daily.
const WEBHOOK_RETENTION_DAYS: i64 = 30;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("subhub exited with error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    init_tracing(&config);
    info!(environment = ?config.server.environment, "configuration loaded");

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await
        .context("failed to connect to postgres")?;
    info!("postgres connection established");

    if config.database.run_migrations {
        sqlx::migrate!()
            .run(&pool)
            .await
            .context("failed to run migrations")?;
        info!("migrations applied");
    }

    let catalog = plan_catalog(&config.payment);
    let verifier = WebhookVerifier::new(config.payment.stripe_webhook_secret.clone())
        .require_livemode(config.payment.require_livemode);

    let webhook_events: Arc<dyn WebhookEventRepository> =
        Arc::new(PostgresWebhookEventRepository::new(pool.clone()));
    tokio::spawn(retention_sweep(webhook_events.clone()));

    let state = BillingAppState {
        users: Arc::new(PostgresUserDirectory::new(pool.clone())),
        store: Arc::new(PostgresSubscriptionStore::new(pool.clone())),
        provider: Arc::new(StripePaymentAdapter::new(StripeConfig::new(
            config.payment.stripe_api_key.clone(),
        ))),
        mailer: Arc::new(ResendSender::new(ResendConfig::new(
            config.email.resend_api_key.clone(),
            config.email.from_header(),
        ))),
        webhook_events,
        verifier: Arc::new(verifier),
        catalog,
        ops_email: config.email.ops_email.clone(),
    };

    let app = Router::new()
        .nest("/api", billing_router())
        .with_state(state)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "server is running");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Build the plan catalog from whichever price ids are configured.
fn plan_catalog(payment: &PaymentConfig) -> PlanCatalog {
    let configured = [
        (PlanType::Basic, Recurrency::Month, &payment.price_basic_month),
        (PlanType::Basic, Recurrency::Year, &payment.price_basic_year),
        (PlanType::Pro, Recurrency::Month, &payment.price_pro_month),
        (PlanType::Pro, Recurrency::Year, &payment.price_pro_year),
    ];

    PlanCatalog::new(
        configured
            .into_iter()
            .filter_map(|(plan, recurrency, price_id)| {
                price_id.as_ref().map(|price_id| PlanEntry {
                    plan,
                    recurrency,
                    price_id: price_id.clone(),
                })
            })
            .collect(),
    )
}

/// Daily sweep of old webhook audit rows.
async fn retention_sweep(repository: Arc<dyn WebhookEventRepository>) {
    let mut interval = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
    loop {
        interval.tick().await;
        let cutoff = chrono::Utc::now() - chrono::Duration::days(WEBHOOK_RETENTION_DAYS);
        match repository.delete_before(cutoff).await {
            Ok(deleted) if deleted > 0 => {
                info!(deleted, "swept old webhook events");
            }
            Ok(_) => {}
            Err(error) => error!(%error, "webhook event sweep failed"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!("failed to install ctrl+c handler: {error}");
        }
    };

    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl+c signal"),
        _ = terminate => info!("received terminate signal"),
    }
}
