use crate::routes::{fail, ok};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use envdeck_browser::BrowserHandle;
use envdeck_client::EnvironmentInfo;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub group_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoteBody {
    #[serde(default)]
    pub note: String,
}

/// Serialize a profile-manager environment enriched with local state.
async fn enriched(state: &AppState, info: &EnvironmentInfo) -> Value {
    let mut value = serde_json::to_value(info).unwrap_or_else(|_| json!({}));
    let entry = state.registry.entry(&info.user_id).await;
    if let Some(map) = value.as_object_mut() {
        map.insert("is_running".into(), json!(entry.is_some()));
        map.insert(
            "is_attached".into(),
            json!(entry.as_ref().is_some_and(|e| e.handle.is_some())),
        );
        if let Some(entry) = &entry {
            map.insert("started_at".into(), json!(entry.started_at.to_rfc3339()));
            map.insert("reconnect_count".into(), json!(entry.reconnect_count));
        }
        let note = state.notes.get(&info.user_id);
        if !note.is_empty() {
            map.insert("note".into(), json!(note));
        }
    }
    value
}

/// GET /api/environments — profile-manager list merged with local state.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Value> {
    let infos = match state
        .profile
        .list_environments(params.group_id.as_deref())
        .await
    {
        Ok(infos) => infos,
        Err(e) => {
            tracing::warn!("Environment listing failed: {}", e);
            return fail(format!("could not list environments: {e}"));
        }
    };

    let mut environments = Vec::with_capacity(infos.len());
    let mut running = 0usize;
    for info in &infos {
        if state.registry.contains(&info.user_id).await {
            running += 1;
        }
        environments.push(enriched(&state, info).await);
    }

    ok(json!({
        "environments": environments,
        "total": infos.len(),
        "running": running,
    }))
}

/// GET /api/environments/:env_id — one environment, enriched.
pub async fn details(State(state): State<AppState>, Path(env_id): Path<String>) -> Response {
    match state.profile.environment_details(&env_id).await {
        Ok(Some(info)) => {
            let environment = enriched(&state, &info).await;
            ok(json!({ "environment": environment })).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            fail(format!("environment {env_id} not found")),
        )
            .into_response(),
        Err(e) => fail(format!("could not look up environment: {e}")).into_response(),
    }
}

/// POST /api/environments/:env_id/start — launch and attach.
pub async fn start(State(state): State<AppState>, Path(env_id): Path<String>) -> Json<Value> {
    if let Some(entry) = state.registry.entry(&env_id).await {
        if entry.handle.is_some() {
            state.registry.touch(&env_id).await;
            return ok(json!({
                "message": "environment already running",
                "already_running": true,
                "has_web_socket": entry.ws_endpoint.is_some(),
                "attached": true,
            }));
        }
    }

    let started = match state.profile.start_browser(&env_id).await {
        Ok(started) => started,
        Err(e) => {
            tracing::warn!("Start of {} failed: {}", env_id, e);
            return fail(format!("could not start environment: {e}"));
        }
    };

    let Some(ws_endpoint) = started.ws_endpoint else {
        // Browser is up but uncontrollable; keep the entry so stop works.
        tracing::warn!("Environment {} started without a WebSocket endpoint", env_id);
        state.registry.insert(&env_id, None, None).await;
        return ok(json!({
            "message": "environment started, but no control endpoint was provided",
            "has_web_socket": false,
            "attached": false,
        }));
    };

    match BrowserHandle::connect(&ws_endpoint).await {
        Ok(handle) => {
            state
                .registry
                .insert(&env_id, Some(Arc::new(handle)), Some(ws_endpoint))
                .await;
            tracing::info!("Environment {} started and attached", env_id);
            ok(json!({
                "message": "environment started",
                "has_web_socket": true,
                "attached": true,
            }))
        }
        Err(e) => {
            tracing::warn!("Attach to {} failed: {}", env_id, e);
            state.registry.insert(&env_id, None, Some(ws_endpoint)).await;
            ok(json!({
                "message": format!("environment started, but attaching failed: {e}"),
                "has_web_socket": true,
                "attached": false,
            }))
        }
    }
}

/// POST /api/environments/:env_id/stop — detach and stop.
pub async fn stop(State(state): State<AppState>, Path(env_id): Path<String>) -> Response {
    let Some(entry) = state.registry.remove(&env_id).await else {
        return (
            StatusCode::NOT_FOUND,
            fail(format!("environment {env_id} was never started")),
        )
            .into_response();
    };

    if let Some(handle) = entry.handle {
        handle.disconnect();
    }

    match state.profile.stop_browser(&env_id).await {
        Ok(()) => {
            tracing::info!("Environment {} stopped", env_id);
            ok(json!({ "message": "environment stopped" })).into_response()
        }
        Err(e) => {
            tracing::warn!("Profile API stop of {} failed: {}", env_id, e);
            fail(format!("detached, but the profile API stop failed: {e}")).into_response()
        }
    }
}

/// POST /api/environments/:env_id/reconnect — re-start and re-attach.
pub async fn reconnect(State(state): State<AppState>, Path(env_id): Path<String>) -> Json<Value> {
    if let Some(entry) = state.registry.entry(&env_id).await {
        if let Some(handle) = entry.handle {
            handle.disconnect();
        }
    }

    let started = match state.profile.start_browser(&env_id).await {
        Ok(started) => started,
        Err(e) => return fail(format!("reconnect failed at the start stage: {e}")),
    };

    let Some(ws_endpoint) = started.ws_endpoint else {
        return fail("reconnect failed: no WebSocket endpoint in the start response");
    };

    let handle = match BrowserHandle::connect(&ws_endpoint).await {
        Ok(handle) => handle,
        Err(e) => return fail(format!("reconnect failed at the attach stage: {e}")),
    };

    let count = state
        .registry
        .reconnected(&env_id, Some(Arc::new(handle)), Some(ws_endpoint))
        .await;
    tracing::info!("Environment {} reconnected ({} total)", env_id, count);
    ok(json!({
        "message": "environment reconnected",
        "reconnect_count": count,
    }))
}

/// GET /api/environments/:env_id/note
pub async fn get_note(State(state): State<AppState>, Path(env_id): Path<String>) -> Json<Value> {
    ok(json!({ "note": state.notes.get(&env_id) }))
}

/// POST /api/environments/:env_id/note
pub async fn set_note(
    State(state): State<AppState>,
    Path(env_id): Path<String>,
    Json(body): Json<NoteBody>,
) -> Json<Value> {
    match state.notes.set(&env_id, &body.note) {
        Ok(()) => ok(json!({ "message": "note saved" })),
        Err(e) => {
            tracing::error!("Saving note for {} failed: {}", env_id, e);
            fail(format!("could not save note: {e}"))
        }
    }
}

/// GET /api/environments/:env_id/inspector — element inspection availability.
pub async fn inspector(State(state): State<AppState>, Path(env_id): Path<String>) -> Json<Value> {
    let available = state.registry.handle(&env_id).await.is_some();
    ok(json!({ "env_id": env_id, "available": available }))
}
