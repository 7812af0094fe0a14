#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web dashboard server for the visitor map.
//!
//! Serves the single-page map at `/` and a small JSON API the page calls:
//! boundary upload, render, and dashboard settings. Each upload opens a
//! session whose token the page sends back with every render, so uploaded
//! boundaries are never shared between visitors.

pub mod config;
pub mod dashboard;
mod handlers;
pub mod interactive;
pub mod sessions;

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use visitor_map_population::{HourlyCache, PopulationFetcher, SeoulOpenApi};

pub use config::{ConfigError, ServerConfig};
pub use dashboard::{Dashboard, DashboardError, RenderOutcome, RenderRequest};
pub use sessions::BoundarySessions;

/// Largest accepted boundary upload.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared application state.
pub struct AppState {
    /// District settings and the population fetcher.
    pub dashboard: Dashboard,
    /// Uploaded boundary sets, one per page session.
    pub sessions: BoundarySessions,
}

impl AppState {
    /// Creates state with no open sessions.
    #[must_use]
    pub fn new(dashboard: Dashboard) -> Self {
        Self {
            dashboard,
            sessions: BoundarySessions::default(),
        }
    }

    /// Builds the state for `config`, wiring the open-data client into a
    /// cached fetcher.
    ///
    /// # Errors
    ///
    /// Returns a [`reqwest::Error`] if the HTTP client cannot be built.
    pub fn from_config(config: ServerConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let district = config.district;
        let source = SeoulOpenApi::new(client, config.api_key, district.api.clone());
        let fetcher = PopulationFetcher::new(
            Arc::new(source),
            district.tract_prefixes.clone(),
            district.api.service.clone(),
            HourlyCache::new(Duration::from_secs(district.api.cache_ttl_secs)),
        );

        Ok(Self::new(Dashboard::new(district, fetcher)))
    }
}

/// Registers the page and API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
        .app_data(web::QueryConfig::default().error_handler(handlers::query_error))
        .route("/", web::get().to(handlers::index))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(handlers::health))
                .route("/config", web::get().to(handlers::dashboard_config))
                .route("/boundaries", web::post().to(handlers::upload_boundaries))
                .route("/boundaries", web::delete().to(handlers::clear_boundaries))
                .route("/render", web::get().to(handlers::render)),
        );
}

/// Starts the visitor map server.
///
/// Reads [`ServerConfig`] from the environment, builds the open-data
/// client, and starts the Actix-Web HTTP server. The caller provides the
/// async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration is invalid, the
/// HTTP client cannot be built, or the server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {e}");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;
    let bind_addr = config.bind_addr.clone();
    let port = config.port;

    log::info!(
        "Serving district '{}' ({} tract prefixes) from {}",
        config.district.name,
        config.district.tract_prefixes.len(),
        config.district.api.host
    );

    let state = web::Data::new(AppState::from_config(config).map_err(|e| {
        log::error!("Failed to build HTTP client: {e}");
        std::io::Error::other(e)
    })?);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
