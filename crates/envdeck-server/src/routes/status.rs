use crate::routes::ok;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

/// GET /api/status — service liveness and profile-API reachability.
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    ok(json!({
        "service": "envdeck",
        "profile_api": {
            "available": state.profile.is_available().await,
            "base_url": state.profile.base_url().await,
        },
        "running_environments": state.registry.len().await,
        "ai_configured": state.models.iter().any(|m| m.is_configured()),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
