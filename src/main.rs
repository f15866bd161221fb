mod config;
mod db;
mod models;
mod pricing;
mod responses;
mod routes;
mod services;
mod state;
mod utils;
mod worker;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::Config;
use db::postgres_price_update_repository::PostgresPriceUpdateRepository;
use db::price_update_repository::PriceUpdateRepository;
use responses::JsonResponse;
use routes::prices::get_prices;
use services::ticket_provider::{SkypickerProvider, TicketProvider};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_env().context("invalid configuration")?;

    let global_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(config.rate_limit_ms)
            .burst_size(config.rate_limit_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .context("invalid rate limiter settings")?,
    );

    // Drop idle client entries from the limiter map.
    let governor_limiter = global_governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let pg_pool = establish_connection(&config.database_url).await?;
    let price_updates = Arc::new(PostgresPriceUpdateRepository {
        pool: pg_pool.clone(),
    }) as Arc<dyn PriceUpdateRepository>;

    let ticket_provider = Arc::new(
        SkypickerProvider::from_settings(config.skypicker.clone())
            .context("failed to build ticket provider client")?,
    ) as Arc<dyn TicketProvider>;

    let bind_addr = config.bind_addr;
    let state = AppState {
        price_updates,
        ticket_provider,
        config: Arc::new(config),
    };

    worker::start_background_workers(state.clone()).await;

    let app = Router::new()
        .route("/", get(root))
        .route("/prices", get(get_prices))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: global_governor_conf,
        });

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(%bind_addr, "listening");
    axum::serve(listener, make_service).await?;
    Ok(())
}

/// A simple root route.
async fn root() -> Response {
    JsonResponse::success("Farewatch is running").into_response()
}

/// Connect, verify the connection and bring the schema up to date.
async fn establish_connection(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to the database")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("failed to verify database connection")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    info!("connected to the database");
    Ok(pool)
}
