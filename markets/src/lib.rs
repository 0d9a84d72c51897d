//! # markets: read-only query service for prediction markets
//!
//! `markets` exposes two JSON endpoints over a catalogue of prediction markets:
//!
//! - `GET /v1/api/markets` lists markets, filtered by status and creator, sorted by creation or
//!   resolution time and paged with `limit`/`offset`
//! - `GET /v1/api/markets/{market_id}` fetches a single market
//!
//! ## Architecture
//!
//! Requests flow through three layers:
//!
//! - [`api`]: axum handlers turn raw query/path parameters into typed filters or identifiers and
//!   map results and failures onto HTTP status codes and JSON bodies
//! - [`markets::use_cases`]: `GetMarkets` and `GetMarketById` apply paging defaults and decide
//!   what counts as "not found"
//! - [`markets::store`]: the `MarketStore` trait with an in-memory backend (optionally seeded from
//!   a JSON file) and a PostgreSQL backend
//!
//! Handlers hold the use cases as trait objects in [`AppState`], so tests swap in mocks without
//! touching a store.
//!
//! ## Ambient concerns
//!
//! Configuration is loaded by [`config`] (YAML plus `MARKETS_` environment overrides), logging and
//! optional OTLP export are set up by [`telemetry`], and every error response is produced by
//! [`errors::Error`]. The router also serves `/healthz`, the OpenAPI document and, when enabled,
//! Prometheus metrics at `/internal/metrics`.

pub mod api;
pub mod config;
pub mod errors;
pub mod markets;
mod openapi;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use axum::{
    Json, Router,
    http::{self, HeaderValue},
    routing::get,
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use config::{CorsOrigin, StoreConfig};
use markets::{
    store::{InMemoryMarketStore, MarketStore, PostgresMarketStore},
    use_cases::{GetMarketById, GetMarketByIdUseCase, GetMarkets, GetMarketsUseCase},
};
use openapi::ApiDoc;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .get_markets(Arc::new(GetMarkets::new(store.clone())))
///     .get_market_by_id(Arc::new(GetMarketById::new(store)))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub get_markets: Arc<dyn GetMarketsUseCase>,
    pub get_market_by_id: Arc<dyn GetMarketByIdUseCase>,
}

/// Get the markets database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    // tower-http refuses "*" inside an origin list
    let allow_origin = if config.cors.allowed_origins.contains(&CorsOrigin::Wildcard) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Url renders a trailing slash on bare origins, which browsers never send
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([http::Method::GET, http::Method::OPTIONS])
        .allow_credentials(config.cors.allow_credentials);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: the market API nested under `/v1/api`, its OpenAPI document
/// and docs UI, `/healthz`, and optionally `/internal/metrics`.
///
/// # Errors
///
/// Returns an error if a configured CORS origin is not a valid header value.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route("/markets", get(api::handlers::markets::list_markets))
        // A trailing slash with no ID is a client error, not an unknown route
        .route("/markets/", get(api::handlers::markets::get_market_without_id))
        .route("/markets/{market_id}", get(api::handlers::markets::get_market))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/v1/api", api_routes)
        .merge(Scalar::with_url("/v1/api/docs", ApiDoc::openapi()));

    let mut router = router.layer(create_cors_layer(&state.config)?);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route(
                "/internal/metrics",
                get(move || {
                    let handle = metric_handle.clone();
                    async move { handle.render() }
                }),
            )
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Open the configured market store. The pool is returned separately so it can be closed on
/// shutdown.
async fn setup_store(config: &Config) -> anyhow::Result<(Arc<dyn MarketStore>, Option<PgPool>)> {
    match &config.store {
        StoreConfig::Memory { seed_file: None } => {
            info!("Using empty in-memory market store");
            Ok((Arc::new(InMemoryMarketStore::new()), None))
        }
        StoreConfig::Memory { seed_file: Some(path) } => {
            let store = InMemoryMarketStore::from_seed_file(path).await?;
            info!("Loaded {} markets from {}", store.len(), path.display());
            Ok((Arc::new(store), None))
        }
        StoreConfig::Postgres { url, pool } => {
            let pg = PgPoolOptions::new()
                .max_connections(pool.max_connections)
                .min_connections(pool.min_connections)
                .acquire_timeout(pool.acquire_timeout())
                .idle_timeout(pool.idle_timeout())
                .connect(url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to market database: {}", e))?;

            migrator().run(&pg).await?;
            info!("Connected to PostgreSQL market store");

            Ok((Arc::new(PostgresMarketStore::new(pg.clone())), Some(pg)))
        }
    }
}

/// A configured, not yet listening, markets service.
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Open the store, wire the use cases and build the router.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting markets service with configuration: {:#?}", config);

        let (store, pool) = setup_store(&config).await?;

        let state = AppState::builder()
            .config(config.clone())
            .get_markets(Arc::new(GetMarkets::new(store.clone())))
            .get_market_by_id(Arc::new(GetMarketById::new(store)))
            .build();

        let router = build_router(&state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Serve until `shutdown` resolves, then release the store and flush telemetry.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Markets service listening on http://{}", bind_addr);

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
