mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use ragguard_api::auth::bootstrap_admin;
use ragguard_api::storage::Storage;
use ragguard_api::{AppState, AppStateInner};
use ragguard_db::Database;
use ragguard_scan::{ReputationLookup, UnconfiguredLookup, VirusTotalClient};

use config::ServerConfig;

/// Used when `RUST_LOG` is unset. Every workspace crate is listed; a target
/// missing here is silent by default.
const DEFAULT_LOG_FILTER: &str =
    "ragguard=debug,ragguard_api=debug,ragguard_scan=debug,ragguard_db=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            std::process::exit(1);
        }
    };

    // Init DB and storage
    let db = Database::open(&config.db_path)?;
    if let Some(admin) = &config.admin {
        if !bootstrap_admin(&db, &admin.email, &admin.password)? {
            info!("Administrator account {} already exists", admin.email);
        }
    }
    let storage = Storage::new(config.upload_dir.clone()).await?;

    let scanner: Arc<dyn ReputationLookup> = match config.virustotal {
        Some(vt) => {
            info!("VirusTotal scanning enabled ({})", vt.base_url);
            Arc::new(VirusTotalClient::new(vt)?)
        }
        None => {
            warn!("RAGGUARD_VT_API_KEY is not set; complaints with attachments will be refused");
            Arc::new(UnconfiguredLookup)
        }
    };

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret,
        storage,
        scanner,
    });

    let app = ragguard_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("RagGuard server listening on {}", config.addr);
    info!("Uploads stored in {}", config.upload_dir.display());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_covers_every_crate() {
        assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
        for target in ["ragguard=", "ragguard_api=", "ragguard_scan=", "ragguard_db="] {
            assert!(DEFAULT_LOG_FILTER.contains(target), "{target} missing");
        }
    }
}
