use crate::envelope::ApiEnvelope;
use crate::types::{ActiveBrowser, EnvironmentInfo, GroupInfo, StartedBrowser};
use crate::{Error, ProfileApi, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;

/// Paths tried against each candidate base URL when probing. The first one
/// that answers with a success envelope wins.
const PROBE_PATHS: &[&str] = &["/user/list", "/group/list", "/status"];

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Page size floor for environment listings. Small pages make the flaky API
/// chattier than it needs to be.
const MIN_PAGE_SIZE: u32 = 200;

#[derive(Debug, Clone)]
pub struct ProfileApiConfig {
    /// Local API port of the profile-manager application.
    pub port: u16,
    /// Explicit base URL to try before the generated candidates.
    pub base_url: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries for network errors, timeouts and 5xx responses.
    pub max_retries: u32,
}

impl Default for ProfileApiConfig {
    fn default() -> Self {
        Self {
            port: 50325,
            base_url: None,
            timeout: Duration::from_secs(15),
            max_retries: 3,
        }
    }
}

struct Connection {
    base_url: String,
    available: bool,
}

/// Client for the profile-manager local HTTP API. The desktop application is
/// treated as flaky: the base URL is probed from a candidate list and every
/// request runs under a bounded retry-with-backoff schedule.
pub struct ProfileApiClient {
    http: reqwest::Client,
    candidates: Vec<String>,
    connection: RwLock<Connection>,
    max_retries: u32,
}

/// Backoff before retry `attempt` (1-based) after a transport failure.
pub(crate) fn retry_delay(attempt: u32) -> Duration {
    let ms = 1000u64.saturating_mul(1 << (attempt.saturating_sub(1)).min(10));
    Duration::from_millis(ms.min(10_000))
}

/// Longer schedule for rate-limit responses.
pub(crate) fn rate_limit_delay(attempt: u32) -> Duration {
    let ms = 2000u64.saturating_mul(1 << attempt.min(10));
    Duration::from_millis(ms.min(15_000))
}

/// Candidate base URLs for the local API, most likely first. Covers the host
/// aliases the desktop application binds and the known path prefixes.
pub(crate) fn candidate_base_urls(port: u16, explicit: Option<&str>) -> Vec<String> {
    let mut urls = Vec::new();
    if let Some(url) = explicit {
        urls.push(url.trim_end_matches('/').to_string());
    }
    for host in ["localhost", "local.adspower.net", "127.0.0.1"] {
        urls.push(format!("http://{host}:{port}/api/v1"));
    }
    for host in ["localhost", "127.0.0.1"] {
        urls.push(format!("http://{host}:{port}"));
        urls.push(format!("http://{host}:{port}/api"));
    }
    urls.dedup();
    urls
}

impl ProfileApiClient {
    pub fn new(config: ProfileApiConfig) -> Self {
        let candidates = candidate_base_urls(config.port, config.base_url.as_deref());
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        let initial = candidates
            .first()
            .cloned()
            .unwrap_or_else(|| format!("http://localhost:{}/api/v1", config.port));
        Self {
            http,
            candidates,
            connection: RwLock::new(Connection {
                base_url: initial,
                available: false,
            }),
            max_retries: config.max_retries,
        }
    }

    /// One GET against the current base URL with the bounded retry schedule.
    /// Non-rate-limit API errors are returned as envelopes, not retried.
    async fn request(&self, path: &str, params: &[(&str, String)]) -> Result<ApiEnvelope> {
        let base = self.connection.read().await.base_url.clone();
        let url = format!("{base}{path}");
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = retry_delay(attempt);
                tracing::info!(
                    "Retrying profile API request ({}/{}): {} after {:?}",
                    attempt,
                    self.max_retries,
                    path,
                    delay
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.http.get(&url).query(params).send().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Profile API request failed: {}", e);
                    last_err = Some(Error::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.is_server_error() {
                tracing::warn!("Profile API returned {}, retrying", status);
                last_err = Some(Error::Api(format!("server error: {status}")));
                continue;
            }

            let envelope: ApiEnvelope = match response.json().await {
                Ok(env) => env,
                Err(e) => {
                    last_err = Some(Error::Http(e));
                    continue;
                }
            };

            if envelope.is_rate_limited() && attempt < self.max_retries {
                let delay = rate_limit_delay(attempt);
                tracing::warn!("Profile API rate limited, waiting {:?} before retry", delay);
                tokio::time::sleep(delay).await;
                continue;
            }

            return Ok(envelope);
        }

        Err(last_err.unwrap_or_else(|| Error::Unreachable(url)))
    }

    /// Re-probe when no request has succeeded yet.
    async fn ensure_available(&self) {
        if !self.connection.read().await.available {
            let _ = self.probe().await;
        }
    }

    async fn active_browsers(&self, env_id: &str) -> Result<Vec<ActiveBrowser>> {
        let envelope = self
            .request("/browser/active", &[("user_id", env_id.to_string())])
            .await?;
        if !envelope.is_ok() {
            return Err(Error::Api(envelope.message()));
        }
        Ok(envelope
            .list_items()
            .into_iter()
            .filter_map(|raw| serde_json::from_value(raw).ok())
            .collect())
    }
}

#[async_trait]
impl ProfileApi for ProfileApiClient {
    async fn probe(&self) -> Option<String> {
        for base in &self.candidates {
            for path in PROBE_PATHS {
                let url = format!("{base}{path}");
                tracing::debug!("Probing profile API at {}", url);
                let response = self
                    .http
                    .get(&url)
                    .query(&[("page", "1"), ("page_size", "1")])
                    .timeout(PROBE_TIMEOUT)
                    .send()
                    .await;
                let Ok(response) = response else { continue };
                let Ok(envelope) = response.json::<ApiEnvelope>().await else {
                    continue;
                };
                if envelope.is_ok() {
                    tracing::info!("Found working profile API at {}", base);
                    let mut conn = self.connection.write().await;
                    conn.base_url = base.clone();
                    conn.available = true;
                    return Some(base.clone());
                }
            }
        }
        tracing::warn!(
            "No reachable profile API among {} candidates; is the desktop application running with its local API enabled?",
            self.candidates.len()
        );
        None
    }

    async fn base_url(&self) -> String {
        self.connection.read().await.base_url.clone()
    }

    async fn is_available(&self) -> bool {
        self.connection.read().await.available
    }

    async fn list_environments(&self, group_id: Option<&str>) -> Result<Vec<EnvironmentInfo>> {
        self.ensure_available().await;

        let mut params = vec![
            ("page", "1".to_string()),
            ("page_size", MIN_PAGE_SIZE.to_string()),
        ];
        // "all" is a UI pseudo-group meaning no filter.
        if let Some(group) = group_id.filter(|g| !g.is_empty() && *g != "all") {
            params.push(("group_id", group.to_string()));
        }

        let envelope = self.request("/user/list", &params).await?;
        if !envelope.is_ok() {
            return Err(Error::Api(envelope.message()));
        }

        let environments: Vec<EnvironmentInfo> = envelope
            .list_items()
            .into_iter()
            .filter_map(EnvironmentInfo::from_raw)
            .collect();
        tracing::debug!("Profile API reported {} environments", environments.len());
        Ok(environments)
    }

    async fn list_groups(&self) -> Result<Vec<GroupInfo>> {
        let envelope = self.request("/group/list", &[]).await?;
        if !envelope.is_ok() {
            return Err(Error::Api(envelope.message()));
        }
        Ok(envelope
            .list_items()
            .into_iter()
            .filter_map(|raw| serde_json::from_value(raw).ok())
            .collect())
    }

    async fn environment_details(&self, env_id: &str) -> Result<Option<EnvironmentInfo>> {
        let environments = self.list_environments(None).await?;
        Ok(environments.into_iter().find(|e| e.matches_id(env_id)))
    }

    async fn start_browser(&self, env_id: &str) -> Result<StartedBrowser> {
        let launch_args = serde_json::to_string(&["--no-sandbox"]).unwrap_or_default();
        let envelope = self
            .request(
                "/browser/start",
                &[
                    ("user_id", env_id.to_string()),
                    ("launch_args", launch_args),
                ],
            )
            .await?;
        if !envelope.is_ok() {
            return Err(Error::Api(envelope.message()));
        }
        let open_tab = envelope
            .data
            .get("open_tab")
            .map(|v| !matches!(v, Value::Null))
            .unwrap_or(false);
        Ok(StartedBrowser {
            ws_endpoint: envelope.ws_endpoint(),
            open_tab,
        })
    }

    async fn stop_browser(&self, env_id: &str) -> Result<()> {
        let envelope = self
            .request("/browser/stop", &[("user_id", env_id.to_string())])
            .await?;
        if !envelope.is_ok() {
            return Err(Error::Api(envelope.message()));
        }
        Ok(())
    }

    async fn last_url(&self, env_id: &str) -> Result<Option<String>> {
        let browsers = self.active_browsers(env_id).await?;
        Ok(browsers
            .into_iter()
            .find(|b| b.user_id == env_id)
            .and_then(|b| b.last_url)
            .filter(|url| !url.is_empty()))
    }
}
