use crate::routes;
use crate::state::AppState;
use crate::{Error, Result};
use axum::routing::{get, post};
use axum::Router;

/// Assemble the full REST surface.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(routes::status::status))
        .route("/api/environments", get(routes::environments::list))
        .route("/api/environments/:env_id", get(routes::environments::details))
        .route(
            "/api/environments/:env_id/start",
            post(routes::environments::start),
        )
        .route(
            "/api/environments/:env_id/stop",
            post(routes::environments::stop),
        )
        .route(
            "/api/environments/:env_id/reconnect",
            post(routes::environments::reconnect),
        )
        .route(
            "/api/environments/:env_id/note",
            get(routes::environments::get_note).post(routes::environments::set_note),
        )
        .route(
            "/api/environments/:env_id/inspector",
            get(routes::environments::inspector),
        )
        .route(
            "/api/element-explorer/:env_id/screenshot",
            get(routes::explorer::screenshot),
        )
        .route(
            "/api/element-explorer/:env_id/url",
            get(routes::explorer::current_url),
        )
        .route(
            "/api/element-explorer/:env_id/elements",
            get(routes::explorer::elements),
        )
        .route(
            "/api/element-explorer/:env_id/tabs",
            get(routes::explorer::tabs),
        )
        .route(
            "/api/element-explorer/:env_id/switch-tab",
            post(routes::explorer::switch_tab),
        )
        .route("/api/ai/models", get(routes::ai::models))
        .route("/api/ai/status", get(routes::ai::status))
        .route("/api/ai/chat", post(routes::ai::chat))
        .route("/api/ai/execute", post(routes::ai::execute))
        .with_state(state)
}

/// Bind and run the REST service until the process is stopped.
pub async fn serve(state: AppState) -> Result<()> {
    let port = state.config.port;

    // Probe in the background so startup never blocks on a missing desktop app.
    let profile = state.profile.clone();
    tokio::spawn(async move {
        let _ = profile.probe().await;
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| Error::Server(format!("could not bind port {port}: {e}")))?;
    tracing::info!("envdeck listening on http://localhost:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
