use axum::{Json, extract::State};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;

use crate::router::MazeState;

/// GET /api/health
pub async fn health(State(state): State<MazeState>) -> Json<Value> {
    let database = match state.storage.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!(error = %e, "database ping failed");
            "unavailable"
        }
    };
    Json(json!({
        "status": "healthy",
        "service": "Maze Password Manager API",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
        "database": database,
    }))
}
