//! ArtCraft WebSocket Relay Server
//!
//! Relays canvas operations between clients sharing a scope and stores
//! full-canvas snapshots.
//!
//! ## Protocol
//!
//! Messages are JSON tagged by `type`:
//! ```json
//! { "type": "join", "scope": "community-42" }
//! { "type": "broadcast", "payload": { "type": "clear", "originatorId": "u1" } }
//! { "type": "fetch_snapshot", "request_id": 1, "scope": "community-42" }
//! { "type": "save_snapshot", "request_id": 2, "scope": "community-42", "image_data": "data:image/png;base64,..." }
//! ```
//!
//! Broadcasts are never echoed back to the sender.

mod config;
mod socket;
mod state;

use artcraft_core::storage::{FileSnapshotStore, MemorySnapshotStore, SnapshotRecord, SnapshotStore};
use axum::{
    Json, Router,
    extract::{Path, State, ws::WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use config::ServerConfig;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artcraft_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let store: Arc<dyn SnapshotStore> = match &config.data_dir {
        Some(dir) => {
            info!("Storing snapshots in {}", dir.display());
            Arc::new(FileSnapshotStore::new(dir.clone())?)
        }
        None => {
            info!("Storing snapshots in memory");
            Arc::new(MemorySnapshotStore::new())
        }
    };
    let state = Arc::new(AppState::new(store, config.channel_capacity));

    let app = router(state);

    info!("ArtCraft relay server listening on {}", config.addr);
    info!("WebSocket endpoint: ws://{}/ws", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/scopes/{scope}/snapshot", get(latest_snapshot))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "ArtCraft Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// Latest snapshot of a scope, 404 when none was saved.
async fn latest_snapshot(
    Path(scope): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<SnapshotRecord>, StatusCode> {
    match state.latest(&scope).await {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to read snapshot for {}: {}", scope, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| socket::handle_socket(socket, state))
}
