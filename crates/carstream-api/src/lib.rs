//! carstream-api - WebSocket streaming layer for carstream
//!
//! A client connects to `/ws`, sends a 9-byte handshake naming its vehicle
//! model, and then receives the live snapshot as flat JSON objects, at
//! most once per publish tick and only when something changed.
//!
//! # Usage
//!
//! ```ignore
//! use carstream_api::{create_router, AppState, StateAggregator};
//!
//! let (engine, readings) = AcquisitionEngine::new(settings, default_connector());
//! let aggregator = Arc::new(StateAggregator::new());
//! aggregator.clone().spawn_consumer(readings);
//! let state = AppState::new(Arc::new(engine), aggregator, Arc::new(store));
//! let router = create_router(state);
//! ```

pub mod aggregator;
pub mod error;
pub mod protocol;
pub mod session;
pub mod state;

pub use aggregator::{SnapshotValue, StateAggregator};
pub use error::HandshakeError;
pub use protocol::{Handshake, CMD_START, HANDSHAKE_LEN};
pub use state::{AppState, SessionSettings};

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the streaming router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(session::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let engine = state.engine();
    Json(serde_json::json!({
        "status": "ok",
        "engine": engine.state(),
        "acquisition": engine.status(),
        "dropped_readings": engine.dropped_readings(),
    }))
}
