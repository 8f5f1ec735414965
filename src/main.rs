use dotenvy::dotenv;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use siteserver::api_router::configure_api_routes;
use siteserver::config::AppConfig;
use siteserver::drive::init_drive;
use siteserver::shared::state::AppState;
use siteserver::shared::utils::create_conn;
use siteserver::site;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let pool = create_conn(&config.database_url())
        .map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?;

    let drive = match init_drive(&config.drive).await {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("Failed to initialize drive storage: {}", e);
            None
        }
    };

    let state = Arc::new(AppState {
        conn: pool,
        drive,
        bucket_name: config.drive.bucket.clone(),
        config: config.clone(),
        http: reqwest::Client::new(),
    });

    let app = axum::Router::new()
        .merge(site::configure_site_routes())
        .merge(site::embedded::configure_portal_routes())
        .merge(configure_api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
