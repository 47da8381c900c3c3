use std::{net::SocketAddr, sync::Arc, time::Duration};
use timed_counter::{records::seed_marker_types, router, AppConfig, AppState, LocalDocumentStore};
use tokio::{fs, time::interval};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = AppConfig::from_env();
    if let Some(parent) = config.data_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let store = Arc::new(LocalDocumentStore::open(&config.data_path).await);
    info!("document store at {}", config.data_path.display());
    if let Some(markers_path) = &config.markers_path {
        match seed_marker_types(store.as_ref(), markers_path).await {
            Ok(seeded) => info!("seeded {seeded} marker types from {}", markers_path.display()),
            Err(err) => error!("failed to seed marker types from {}: {err}", markers_path.display()),
        }
    }

    let port = config.port;
    let session_idle = config.session_idle;
    let state = AppState::new(store, config);

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(15).min(session_idle));
        loop {
            ticker.tick().await;
            let reaped = sessions.reap_idle(session_idle).await;
            if reaped > 0 {
                info!("closed {reaped} idle sessions");
            }
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
