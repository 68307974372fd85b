use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use envdeck_ai::ChatModel;
use envdeck_client::{EnvironmentInfo, GroupInfo, ProfileApi, StartedBrowser};
use envdeck_core::{Config, NoteStore};
use envdeck_server::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Profile API stub: two environments, starts succeed but never hand out a
/// control WebSocket (so no real browser is needed).
struct StubProfileApi {
    environments: Vec<EnvironmentInfo>,
}

impl StubProfileApi {
    fn new() -> Self {
        let environments = [
            json!({"user_id": "env-1", "name": "shop-a", "serial_number": "1", "group_name": "retail"}),
            json!({"user_id": "env-2", "name": "shop-b", "serial_number": "2", "group_name": "retail"}),
        ]
        .into_iter()
        .filter_map(EnvironmentInfo::from_raw)
        .collect();
        Self { environments }
    }
}

#[async_trait]
impl ProfileApi for StubProfileApi {
    async fn probe(&self) -> Option<String> {
        Some("http://stub:50325/api/v1".into())
    }

    async fn base_url(&self) -> String {
        "http://stub:50325/api/v1".into()
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn list_environments(
        &self,
        _group_id: Option<&str>,
    ) -> envdeck_client::Result<Vec<EnvironmentInfo>> {
        Ok(self.environments.clone())
    }

    async fn list_groups(&self) -> envdeck_client::Result<Vec<GroupInfo>> {
        Ok(Vec::new())
    }

    async fn environment_details(
        &self,
        env_id: &str,
    ) -> envdeck_client::Result<Option<EnvironmentInfo>> {
        Ok(self
            .environments
            .iter()
            .find(|e| e.matches_id(env_id))
            .cloned())
    }

    async fn start_browser(&self, _env_id: &str) -> envdeck_client::Result<StartedBrowser> {
        Ok(StartedBrowser {
            ws_endpoint: None,
            open_tab: true,
        })
    }

    async fn stop_browser(&self, _env_id: &str) -> envdeck_client::Result<()> {
        Ok(())
    }

    async fn last_url(&self, _env_id: &str) -> envdeck_client::Result<Option<String>> {
        Ok(Some("https://example.com/last".into()))
    }
}

/// Chat model stub with a canned reply.
struct CannedModel {
    configured: bool,
    reply: String,
}

#[async_trait]
impl ChatModel for CannedModel {
    fn id(&self) -> &'static str {
        "openai"
    }

    fn display_name(&self) -> &'static str {
        "OpenAI GPT-4"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(&self, _prompt: &str) -> envdeck_ai::Result<String> {
        if !self.configured {
            return Err(envdeck_ai::Error::NotConfigured("openai".into()));
        }
        Ok(self.reply.clone())
    }
}

fn test_app(dir: &tempfile::TempDir, models: Vec<Arc<dyn ChatModel>>) -> Router {
    let state = AppState::with_parts(
        Config::default(),
        Arc::new(StubProfileApi::new()),
        Arc::new(NoteStore::open(dir.path().join("notes.json"))),
        models,
    );
    build_router(state)
}

fn unconfigured_model() -> Vec<Arc<dyn ChatModel>> {
    vec![Arc::new(CannedModel {
        configured: false,
        reply: String::new(),
    })]
}

fn canned_model(reply: &str) -> Vec<Arc<dyn ChatModel>> {
    vec![Arc::new(CannedModel {
        configured: true,
        reply: reply.to_string(),
    })]
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("request handled");
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn status_reports_profile_api_availability() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, unconfigured_model());

    let (status, body) = send(app, get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["profile_api"]["available"], true);
    assert_eq!(body["running_environments"], 0);
    assert_eq!(body["ai_configured"], false);
}

#[tokio::test]
async fn environment_list_is_enriched_with_local_state() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, unconfigured_model());

    let (_, note_body) = send(
        app.clone(),
        post_json("/api/environments/env-1/note", json!({"note": "primary"})),
    )
    .await;
    assert_eq!(note_body["success"], true);

    let (status, body) = send(app, get("/api/environments")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["running"], 0);
    let envs = body["environments"].as_array().unwrap();
    let env1 = envs.iter().find(|e| e["user_id"] == "env-1").unwrap();
    assert_eq!(env1["note"], "primary");
    assert_eq!(env1["is_running"], false);
}

#[tokio::test]
async fn unknown_environment_details_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, unconfigured_model());

    let (status, body) = send(app, get("/api/environments/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn details_match_by_serial_number() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, unconfigured_model());

    let (status, body) = send(app, get("/api/environments/2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["environment"]["user_id"], "env-2");
}

#[tokio::test]
async fn note_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, unconfigured_model());

    let (status, _) = send(
        app.clone(),
        post_json("/api/environments/env-1/note", json!({"note": "vip account"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(app, get("/api/environments/env-1/note")).await;
    assert_eq!(body["note"], "vip account");
}

#[tokio::test]
async fn start_without_websocket_still_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, unconfigured_model());

    let (status, body) = send(
        app.clone(),
        post_json("/api/environments/env-1/start", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["has_web_socket"], false);
    assert_eq!(body["attached"], false);

    // Now listed as running, but not available for inspection.
    let (_, list) = send(app.clone(), get("/api/environments")).await;
    assert_eq!(list["running"], 1);

    let (_, inspector) = send(app, get("/api/environments/env-1/inspector")).await;
    assert_eq!(inspector["available"], false);
}

#[tokio::test]
async fn stop_of_never_started_environment_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, unconfigured_model());

    let (status, body) = send(app, post_json("/api/environments/env-1/stop", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn start_then_stop_clears_the_registry() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, unconfigured_model());

    send(
        app.clone(),
        post_json("/api/environments/env-1/start", json!({})),
    )
    .await;
    let (status, body) = send(
        app.clone(),
        post_json("/api/environments/env-1/stop", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(app, post_json("/api/environments/env-1/stop", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn element_explorer_requires_an_attached_handle() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, unconfigured_model());

    let (status, body) = send(app, get("/api/element-explorer/env-1/elements")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn ai_models_report_disabled_without_keys() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, unconfigured_model());

    let (status, body) = send(app, get("/api/ai/models")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models"][0]["status"], "disabled");
    assert_eq!(body["default_model_id"], Value::Null);
}

#[tokio::test]
async fn ai_status_reflects_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, canned_model("hello"));

    let (_, body) = send(app, get("/api/ai/status")).await;
    assert_eq!(body["available"], true);
    assert_eq!(body["providers"]["openai"]["configured"], true);
    assert_eq!(body["default_provider"], "openai");
}

#[tokio::test]
async fn chat_with_unconfigured_provider_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, unconfigured_model());

    let (status, body) = send(
        app,
        post_json("/api/ai/chat", json!({"message": "hi", "model": "openai"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["needs_configuration"], true);
}

#[tokio::test]
async fn chat_returns_the_model_reply() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, canned_model("generated answer"));

    let (status, body) = send(app, post_json("/api/ai/chat", json!({"message": "hi"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "generated answer");
    assert_eq!(body["model"], "openai");
}

#[tokio::test]
async fn execute_rejects_an_empty_command() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, canned_model("x"));

    let (status, _) = send(app, post_json("/api/ai/execute", json!({"command": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn execute_without_environment_returns_the_reply_only() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, canned_model("```js\nconsole.log(1);\n```"));

    let (status, body) = send(
        app,
        post_json("/api/ai/execute", json!({"command": "log something"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["result"].as_str().unwrap().contains("console.log(1);"));
    assert!(body.get("execution").is_none());
}

#[tokio::test]
async fn execute_against_a_stopped_environment_soft_fails() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir, canned_model("x"));

    let (status, body) = send(
        app,
        post_json(
            "/api/ai/execute",
            json!({"command": "open the cart", "env_id": "env-1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn serve_reports_a_busy_port() {
    let taken = tokio::net::TcpListener::bind(("0.0.0.0", 0)).await.unwrap();
    let port = taken.local_addr().unwrap().port();

    let dir = tempfile::tempdir().unwrap();
    let state = AppState::with_parts(
        Config {
            port,
            ..Config::default()
        },
        Arc::new(StubProfileApi::new()),
        Arc::new(NoteStore::open(dir.path().join("notes.json"))),
        unconfigured_model(),
    );

    let err = envdeck_server::serve(state).await.unwrap_err();
    assert!(err
        .to_string()
        .contains(&format!("could not bind port {port}")));
}
