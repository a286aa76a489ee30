use esim_payments::config::AppConfig;
use esim_payments::gateways::HttpAdapterFactory;
use esim_payments::http::routes::build_router;
use esim_payments::repo::gateways_repo::GatewaysRepo;
use esim_payments::repo::orders_repo::OrdersRepo;
use esim_payments::repo::storefront_repo::StorefrontRepo;
use esim_payments::repo::webhook_repo::WebhookRepo;
use esim_payments::service::webhook_dispatcher::WebhookDispatcher;
use esim_payments::{AppState, Collaborators};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let client = reqwest::Client::new();
    let callbacks = cfg.callback_urls();

    let webhook_dispatcher = WebhookDispatcher {
        webhook_repo: WebhookRepo { pool: pool.clone() },
        client: client.clone(),
        timeout_ms: cfg.gateway_timeout_ms,
    };
    let adapters = HttpAdapterFactory {
        client,
        endpoints: cfg.endpoints.clone(),
        callbacks: callbacks.clone(),
        timeout_ms: cfg.gateway_timeout_ms,
    };

    let state = AppState::assemble(Collaborators {
        gateways: Arc::new(GatewaysRepo { pool: pool.clone() }),
        storefront: Arc::new(StorefrontRepo { pool: pool.clone() }),
        orders: Arc::new(OrdersRepo { pool: pool.clone() }),
        events: Arc::new(webhook_dispatcher),
        adapters: Arc::new(adapters),
        callbacks,
    });

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
