use crate::routes::{fail, ok};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use envdeck_ai::{build_context, extract_code_block, plan_action, wrap_script, BrowserAction};
use envdeck_browser::BrowserHandle;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub message: String,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteBody {
    #[serde(default)]
    pub command: String,
    pub env_id: Option<String>,
    pub model_id: Option<String>,
}

/// GET /api/ai/models — model descriptors with enabled/disabled status.
pub async fn models(State(state): State<AppState>) -> Json<Value> {
    let models: Vec<Value> = state
        .models
        .iter()
        .map(|m| {
            json!({
                "id": m.id(),
                "name": m.display_name(),
                "status": if m.is_configured() { "enabled" } else { "disabled" },
            })
        })
        .collect();
    ok(json!({
        "models": models,
        "default_model_id": state.default_model_id(),
    }))
}

/// GET /api/ai/status — per-provider configuration flags.
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let providers: Value = state
        .models
        .iter()
        .map(|m| (m.id().to_string(), json!({ "configured": m.is_configured() })))
        .collect::<serde_json::Map<String, Value>>()
        .into();
    ok(json!({
        "available": state.default_model_id().is_some(),
        "providers": providers,
        "default_provider": state.default_model_id(),
    }))
}

/// POST /api/ai/chat — plain generation, no execution.
pub async fn chat(State(state): State<AppState>, Json(body): Json<ChatBody>) -> Response {
    if body.message.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, fail("message must not be empty")).into_response();
    }

    let Some(model) = state.model(body.model.as_deref()) else {
        return (StatusCode::BAD_REQUEST, fail("no such model")).into_response();
    };
    if !model.is_configured() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "message": format!("{} API key not configured", model.display_name()),
                "needs_configuration": true,
            })),
        )
            .into_response();
    }

    match model.generate(&body.message).await {
        Ok(response) => ok(json!({ "response": response, "model": model.id() })).into_response(),
        Err(e) => {
            tracing::error!("Chat generation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                fail(format!("generation failed: {e}")),
            )
                .into_response()
        }
    }
}

/// POST /api/ai/execute — generate code for a command and, when an attached
/// environment is given, translate and run it there. The model reply is
/// always returned; execution failure rides along instead of failing the
/// request.
pub async fn execute(State(state): State<AppState>, Json(body): Json<ExecuteBody>) -> Response {
    if body.command.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, fail("command must not be empty")).into_response();
    }

    // The environment must already be attached when one is named.
    let handle = match &body.env_id {
        Some(env_id) => match state.registry.handle(env_id).await {
            Some(handle) => Some(handle),
            None => {
                return fail(format!("environment {env_id} is not running; start it first"))
                    .into_response()
            }
        },
        None => None,
    };

    let Some(model) = state.model(body.model_id.as_deref()) else {
        return (StatusCode::BAD_REQUEST, fail("no such model")).into_response();
    };
    if !model.is_configured() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            fail(format!("{} API key not configured", model.display_name())),
        )
            .into_response();
    }

    let last_url = match &body.env_id {
        // Best effort; a missing last URL only weakens the prompt.
        Some(env_id) => state.profile.last_url(env_id).await.ok().flatten(),
        None => None,
    };
    let prompt = build_context(body.env_id.as_deref(), last_url.as_deref(), &body.command);

    let result = match model.generate(&prompt).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Command generation failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                fail(format!("generation failed: {e}")),
            )
                .into_response();
        }
    };

    if let Some(handle) = handle {
        if let Some(code) = extract_code_block(&result) {
            let action = plan_action(&code);
            tracing::info!("Executing generated action: {:?}", action_kind(&action));
            let (executed, message) = run_action(&handle, action).await;
            let summary = if executed {
                "command executed"
            } else {
                "command generated, but execution failed"
            };
            return ok(json!({
                "result": result,
                "execution": { "success": executed, "message": message },
                "message": summary,
            }))
            .into_response();
        }
    }

    ok(json!({ "result": result, "message": "command executed" })).into_response()
}

fn action_kind(action: &BrowserAction) -> &'static str {
    match action {
        BrowserAction::Navigate { .. } => "navigate",
        BrowserAction::Click { .. } => "click",
        BrowserAction::Type { .. } => "type",
        BrowserAction::Script(_) => "script",
    }
}

async fn run_action(handle: &BrowserHandle, action: BrowserAction) -> (bool, String) {
    match action {
        BrowserAction::Navigate { url } => match handle.navigate(&url).await {
            Ok(()) => (true, format!("navigated to {url}")),
            Err(e) => (false, format!("navigation failed: {e}")),
        },
        BrowserAction::Click { selector } => match handle.click(&selector).await {
            Ok(()) => (true, format!("clicked {selector}")),
            Err(e) => (false, format!("click failed: {e}")),
        },
        BrowserAction::Type { selector, text } => {
            match handle.type_text(&selector, &text).await {
                Ok(()) => (true, format!("typed into {selector}")),
                Err(e) => (false, format!("typing failed: {e}")),
            }
        }
        BrowserAction::Script(code) => match handle.evaluate(&wrap_script(&code)).await {
            Ok(value) => {
                let succeeded = value
                    .get("success")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                let message = value
                    .get(if succeeded { "message" } else { "error" })
                    .and_then(Value::as_str)
                    .unwrap_or("script evaluated")
                    .to_string();
                (succeeded, message)
            }
            Err(e) => (false, format!("script evaluation failed: {e}")),
        },
    }
}
