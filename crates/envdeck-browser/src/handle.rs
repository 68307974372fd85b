use crate::elements::{prioritize_elements, PageElement, ELEMENT_SCAN_JS};
use crate::{Error, Result};
use base64::Engine;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// How long click/type wait for their selector before giving up.
const SELECTOR_TIMEOUT: Duration = Duration::from_secs(10);
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

const SCREENSHOT_JPEG_QUALITY: i64 = 70;

/// One open tab, as reported to the REST surface.
#[derive(Debug, Clone, Serialize)]
pub struct TabInfo {
    pub id: usize,
    pub url: String,
    pub title: String,
}

/// A live CDP attachment to one launched profile browser.
///
/// The profile manager launches the browser process and hands out a CDP
/// WebSocket endpoint; this handle attaches to it without owning the process.
/// Stopping the browser stays the profile manager's job, so dropping the
/// handle only closes the WebSocket.
pub struct BrowserHandle {
    browser: Browser,
    page: Mutex<Page>,
    ws_endpoint: String,
    handler_task: JoinHandle<()>,
}

impl BrowserHandle {
    /// Attach to a launched browser over its CDP WebSocket endpoint.
    ///
    /// The browser may not accept connections immediately after launch, so
    /// the connection is retried a few times before failing.
    pub async fn connect(ws_endpoint: &str) -> Result<Self> {
        tracing::info!("Attaching to browser at {}", ws_endpoint);

        let (browser, mut handler) = {
            let mut retries = CONNECT_ATTEMPTS;
            loop {
                tracing::debug!("Attempting CDP connection to {}...", ws_endpoint);
                match Browser::connect(ws_endpoint).await {
                    Ok(result) => {
                        tracing::info!("CDP connection established");
                        break result;
                    }
                    Err(e) => {
                        retries -= 1;
                        if retries == 0 {
                            return Err(Error::Cdp(format!(
                                "Failed to connect to browser after {CONNECT_ATTEMPTS} attempts: {e}"
                            )));
                        }
                        tracing::info!(
                            "CDP connection attempt failed, retrying... ({} left)",
                            retries
                        );
                        tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                    }
                }
            }
        };

        // The handler task must run before any other CDP command can complete.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    // Some CDP events are not fully parseable; keep going.
                    tracing::debug!("CDP handler event error (continuing): {}", e);
                }
            }
        });

        // Give the browser a moment to register its initial page.
        tokio::time::sleep(Duration::from_millis(500)).await;

        let page = if let Some(page) = browser.pages().await?.first() {
            tracing::debug!("Using existing page");
            page.clone()
        } else {
            tracing::debug!("No existing pages, creating one");
            browser.new_page("about:blank").await?
        };

        spawn_dialog_dismisser(&page).await;

        Ok(Self {
            browser,
            page: Mutex::new(page),
            ws_endpoint: ws_endpoint.to_string(),
            handler_task,
        })
    }

    pub fn ws_endpoint(&self) -> &str {
        &self.ws_endpoint
    }

    /// Detach from the browser without stopping it.
    pub fn disconnect(&self) {
        tracing::info!("Detaching from browser at {}", self.ws_endpoint);
        self.handler_task.abort();
    }

    /// Navigate the current tab and wait for the load to settle.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.page.lock().await;
        tracing::info!("Navigating to {}", url);
        page.goto(url).await?.wait_for_navigation().await?;
        Ok(())
    }

    /// Reload the current tab.
    pub async fn reload(&self) -> Result<()> {
        let page = self.page.lock().await;
        page.reload().await?;
        Ok(())
    }

    /// URL of the current tab.
    pub async fn current_url(&self) -> Result<String> {
        let page = self.page.lock().await;
        Ok(page.url().await?.unwrap_or_default())
    }

    /// Viewport screenshot of the current tab as a JPEG data URI.
    pub async fn screenshot(&self) -> Result<String> {
        let page = self.page.lock().await;
        let bytes = page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Jpeg)
                    .quality(SCREENSHOT_JPEG_QUALITY)
                    .full_page(false)
                    .build(),
            )
            .await?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        Ok(format!("data:image/jpeg;base64,{encoded}"))
    }

    /// Click the first element matching `selector`, waiting for it to appear.
    pub async fn click(&self, selector: &str) -> Result<()> {
        let page = self.page.lock().await;
        tracing::info!("Clicking {}", selector);
        let element = wait_for_element(&page, selector).await?;
        element.click().await?;
        Ok(())
    }

    /// Type text into the first element matching `selector`. The element is
    /// clicked first to take focus.
    pub async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let page = self.page.lock().await;
        tracing::info!("Typing into {}", selector);
        let element = wait_for_element(&page, selector).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    /// Evaluate a script in the current tab and return its JSON value.
    pub async fn evaluate(&self, script: &str) -> Result<Value> {
        let page = self.page.lock().await;
        let result = page.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    /// Scan the current tab for interactive elements, visually ordered and
    /// capped. Optionally refocuses the visible tab or a specific tab first.
    pub async fn page_elements(
        &self,
        use_active_tab: bool,
        tab_index: Option<usize>,
    ) -> Result<Vec<PageElement>> {
        if let Some(index) = tab_index {
            self.switch_to(index).await?;
        } else if use_active_tab {
            self.focus_active_tab().await?;
        }

        let page = self.page.lock().await;
        let elements: Vec<PageElement> = page
            .evaluate(ELEMENT_SCAN_JS)
            .await?
            .into_value()
            .map_err(|e| Error::Cdp(format!("element scan returned malformed data: {e}")))?;
        tracing::debug!("Page scan found {} elements", elements.len());
        Ok(prioritize_elements(elements))
    }

    /// All open tabs, in browser order. URL and title are best-effort; a tab
    /// mid-navigation reports empty strings rather than failing the listing.
    pub async fn tabs(&self) -> Result<Vec<TabInfo>> {
        let pages = self.browser.pages().await?;
        let mut tabs = Vec::with_capacity(pages.len());
        for (id, page) in pages.iter().enumerate() {
            let url = page.url().await.ok().flatten().unwrap_or_default();
            let title = page.get_title().await.ok().flatten().unwrap_or_default();
            tabs.push(TabInfo { id, url, title });
        }
        Ok(tabs)
    }

    /// Switch the handle's current tab by index and bring it to the front.
    pub async fn switch_to(&self, index: usize) -> Result<TabInfo> {
        let pages = self.browser.pages().await?;
        if pages.is_empty() {
            return Err(Error::Browser("no open tabs".into()));
        }
        let Some(target) = pages.get(index) else {
            return Err(Error::Browser(format!(
                "tab index {index} out of range 0-{}",
                pages.len() - 1
            )));
        };

        if let Err(e) = target.bring_to_front().await {
            // The page object is still usable even if focusing failed.
            tracing::warn!("Could not bring tab {} to front: {}", index, e);
        }
        spawn_dialog_dismisser(target).await;
        *self.page.lock().await = target.clone();

        let url = target.url().await.ok().flatten().unwrap_or_default();
        let title = target.get_title().await.ok().flatten().unwrap_or_default();
        tracing::info!("Switched to tab {}: {}", index, url);
        Ok(TabInfo {
            id: index,
            url,
            title,
        })
    }

    /// Find the visible tab and make it current. Falls back to the current
    /// tab, then the first one, when no tab reports itself visible.
    pub async fn focus_active_tab(&self) -> Result<TabInfo> {
        let pages = self.browser.pages().await?;

        let mut active: Option<(usize, Page)> = None;
        for (id, page) in pages.iter().enumerate() {
            let visible = page
                .evaluate("document.visibilityState === 'visible' || document.hasFocus()")
                .await
                .ok()
                .and_then(|r| r.into_value::<bool>().ok())
                .unwrap_or(false);
            if visible {
                active = Some((id, page.clone()));
                break;
            }
        }

        let (id, page) = match active {
            Some(found) => found,
            None => {
                let current = self.page.lock().await.clone();
                let current_index = pages
                    .iter()
                    .position(|p| p.target_id() == current.target_id());
                match fallback_tab(current_index, pages.len()) {
                    Some(id) => (id, pages[id].clone()),
                    None => return Err(Error::Browser("no open tabs".into())),
                }
            }
        };

        *self.page.lock().await = page.clone();
        let url = page.url().await.ok().flatten().unwrap_or_default();
        let title = page.get_title().await.ok().flatten().unwrap_or_default();
        Ok(TabInfo { id, url, title })
    }
}

impl Drop for BrowserHandle {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

/// Tab to use when no tab reports itself visible: the handle's current tab
/// when it is still open, otherwise the first one.
fn fallback_tab(current: Option<usize>, tab_count: usize) -> Option<usize> {
    current.or(if tab_count > 0 { Some(0) } else { None })
}

/// Poll for a selector until it appears or the wait times out.
async fn wait_for_element<'a>(
    page: &'a Page,
    selector: &str,
) -> Result<chromiumoxide::element::Element> {
    let deadline = tokio::time::Instant::now() + SELECTOR_TIMEOUT;
    loop {
        match page.find_element(selector).await {
            Ok(element) => return Ok(element),
            Err(_) if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
            Err(_) => return Err(Error::ElementNotFound(selector.to_string())),
        }
    }
}

/// Auto-dismiss JavaScript dialogs so alerts cannot wedge automation.
async fn spawn_dialog_dismisser(page: &Page) {
    match page.event_listener::<EventJavascriptDialogOpening>().await {
        Ok(mut dialogs) => {
            let page = page.clone();
            tokio::spawn(async move {
                while let Some(dialog) = dialogs.next().await {
                    tracing::info!(
                        "Dismissing page dialog {:?}: {}",
                        dialog.r#type,
                        dialog.message
                    );
                    let _ = page
                        .execute(HandleJavaScriptDialogParams::new(false))
                        .await;
                }
            });
        }
        Err(e) => tracing::warn!("Could not subscribe to dialog events: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_info_serializes_flat() {
        let tab = TabInfo {
            id: 2,
            url: "https://example.com".into(),
            title: "Example".into(),
        };
        let json = serde_json::to_value(&tab).unwrap();
        assert_eq!(json["id"], 2);
        assert_eq!(json["url"], "https://example.com");
    }

    #[test]
    fn test_fallback_prefers_the_current_tab() {
        assert_eq!(fallback_tab(Some(2), 3), Some(2));
        assert_eq!(fallback_tab(None, 3), Some(0));
        assert_eq!(fallback_tab(None, 0), None);
    }

    // Attachment paths need a live browser and are covered by manual runs
    // against a local profile manager.
}
