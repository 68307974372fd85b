use crate::routes::{fail, ok};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use envdeck_browser::BrowserHandle;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

// Screenshot and URL reads follow the visible tab unless the caller opts
// out; element extraction stays on the handle's current tab.
const SCREENSHOT_FOLLOWS_ACTIVE_TAB: bool = true;
const URL_FOLLOWS_ACTIVE_TAB: bool = true;
const ELEMENTS_FOLLOW_ACTIVE_TAB: bool = false;

#[derive(Debug, Deserialize)]
pub struct ExplorerParams {
    #[serde(default)]
    pub force_refresh: bool,
    pub use_active_tab: Option<bool>,
    pub tab_id: Option<usize>,
}

impl ExplorerParams {
    fn follows_active_tab(&self, default_active: bool) -> bool {
        self.use_active_tab.unwrap_or(default_active)
    }
}

#[derive(Debug, Deserialize)]
pub struct SwitchTabBody {
    pub tab_id: usize,
}

async fn attached_handle(
    state: &AppState,
    env_id: &str,
) -> Result<Arc<BrowserHandle>, Json<Value>> {
    match state.registry.handle(env_id).await {
        Some(handle) => {
            state.registry.touch(env_id).await;
            Ok(handle)
        }
        None => Err(fail(format!(
            "environment {env_id} is not attached; start it first"
        ))),
    }
}

/// Apply the shared tab-selection and refresh query parameters.
async fn prepare(
    handle: &BrowserHandle,
    params: &ExplorerParams,
    default_active: bool,
) -> Result<(), Json<Value>> {
    if let Some(tab_id) = params.tab_id {
        handle
            .switch_to(tab_id)
            .await
            .map_err(|e| fail(format!("could not switch tab: {e}")))?;
    } else if params.follows_active_tab(default_active) {
        // Best effort; an unfocusable tab is not a reason to fail the call.
        if let Err(e) = handle.focus_active_tab().await {
            tracing::warn!("Active-tab detection failed: {}", e);
        }
    }
    if params.force_refresh {
        if let Err(e) = handle.reload().await {
            tracing::warn!("Reload before inspection failed: {}", e);
        }
    }
    Ok(())
}

/// GET /api/element-explorer/:env_id/screenshot — one-shot inspection bundle:
/// screenshot, URL, elements and tabs.
pub async fn screenshot(
    State(state): State<AppState>,
    Path(env_id): Path<String>,
    Query(params): Query<ExplorerParams>,
) -> Json<Value> {
    let handle = match attached_handle(&state, &env_id).await {
        Ok(handle) => handle,
        Err(resp) => return resp,
    };
    if let Err(resp) = prepare(&handle, &params, SCREENSHOT_FOLLOWS_ACTIVE_TAB).await {
        return resp;
    }

    let shot = match handle.screenshot().await {
        Ok(shot) => shot,
        Err(e) => return fail(format!("screenshot failed: {e}")),
    };
    let url = handle.current_url().await.unwrap_or_default();
    let elements = handle.page_elements(false, None).await.unwrap_or_default();
    let tabs = handle.tabs().await.unwrap_or_default();

    ok(json!({
        "screenshot": shot,
        "url": url,
        "elements": elements,
        "tabs": tabs,
    }))
}

/// GET /api/element-explorer/:env_id/url
pub async fn current_url(
    State(state): State<AppState>,
    Path(env_id): Path<String>,
    Query(params): Query<ExplorerParams>,
) -> Json<Value> {
    let handle = match attached_handle(&state, &env_id).await {
        Ok(handle) => handle,
        Err(resp) => return resp,
    };
    if let Err(resp) = prepare(&handle, &params, URL_FOLLOWS_ACTIVE_TAB).await {
        return resp;
    }
    match handle.current_url().await {
        Ok(url) => ok(json!({ "url": url })),
        Err(e) => fail(format!("could not read URL: {e}")),
    }
}

/// GET /api/element-explorer/:env_id/elements
pub async fn elements(
    State(state): State<AppState>,
    Path(env_id): Path<String>,
    Query(params): Query<ExplorerParams>,
) -> Json<Value> {
    let handle = match attached_handle(&state, &env_id).await {
        Ok(handle) => handle,
        Err(resp) => return resp,
    };
    if let Err(resp) = prepare(&handle, &params, ELEMENTS_FOLLOW_ACTIVE_TAB).await {
        return resp;
    }

    match handle.page_elements(false, None).await {
        Ok(elements) => {
            let url = handle.current_url().await.unwrap_or_default();
            ok(json!({
                "url": url,
                "count": elements.len(),
                "elements": elements,
            }))
        }
        Err(e) => fail(format!("element extraction failed: {e}")),
    }
}

/// GET /api/element-explorer/:env_id/tabs
pub async fn tabs(State(state): State<AppState>, Path(env_id): Path<String>) -> Json<Value> {
    let handle = match attached_handle(&state, &env_id).await {
        Ok(handle) => handle,
        Err(resp) => return resp,
    };
    let tabs = match handle.tabs().await {
        Ok(tabs) => tabs,
        Err(e) => return fail(format!("could not list tabs: {e}")),
    };
    let active = handle.focus_active_tab().await.ok();
    ok(json!({ "tabs": tabs, "active_tab": active }))
}

/// POST /api/element-explorer/:env_id/switch-tab
pub async fn switch_tab(
    State(state): State<AppState>,
    Path(env_id): Path<String>,
    Json(body): Json<SwitchTabBody>,
) -> Json<Value> {
    let handle = match attached_handle(&state, &env_id).await {
        Ok(handle) => handle,
        Err(resp) => return resp,
    };
    match handle.switch_to(body.tab_id).await {
        Ok(tab) => ok(json!({ "tab": tab })),
        Err(e) => fail(format!("could not switch tab: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_params() -> ExplorerParams {
        ExplorerParams {
            force_refresh: false,
            use_active_tab: None,
            tab_id: None,
        }
    }

    #[test]
    fn test_url_reads_follow_active_tab_by_default() {
        assert!(bare_params().follows_active_tab(URL_FOLLOWS_ACTIVE_TAB));
        assert!(bare_params().follows_active_tab(SCREENSHOT_FOLLOWS_ACTIVE_TAB));
    }

    #[test]
    fn test_element_reads_stay_on_current_tab_by_default() {
        assert!(!bare_params().follows_active_tab(ELEMENTS_FOLLOW_ACTIVE_TAB));
    }

    #[test]
    fn test_explicit_flag_overrides_the_default() {
        let mut params = bare_params();
        params.use_active_tab = Some(false);
        assert!(!params.follows_active_tab(URL_FOLLOWS_ACTIVE_TAB));
        params.use_active_tab = Some(true);
        assert!(params.follows_active_tab(ELEMENTS_FOLLOW_ACTIVE_TAB));
    }
}
