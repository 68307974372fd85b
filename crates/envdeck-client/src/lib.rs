// Client for the profile-manager local HTTP API.

mod client;
mod envelope;
mod error;
mod types;

pub use client::{ProfileApiClient, ProfileApiConfig};
pub use envelope::ApiEnvelope;
pub use error::{Error, Result};
pub use types::{ActiveBrowser, EnvironmentInfo, GroupInfo, StartedBrowser};

use async_trait::async_trait;

/// Seam between the REST handlers and the flaky external desktop API. The
/// server depends on this trait so tests can stub the profile manager out.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// Probe for a reachable base URL. Returns the working URL, if any.
    async fn probe(&self) -> Option<String>;

    /// Base URL currently in use.
    async fn base_url(&self) -> String;

    /// Whether a probe has succeeded since startup.
    async fn is_available(&self) -> bool;

    /// Paged environment listing, optionally filtered by group.
    async fn list_environments(&self, group_id: Option<&str>) -> Result<Vec<EnvironmentInfo>>;

    /// Group listing.
    async fn list_groups(&self) -> Result<Vec<GroupInfo>>;

    /// Details for one environment, matched by user id, raw id or serial number.
    async fn environment_details(&self, env_id: &str) -> Result<Option<EnvironmentInfo>>;

    /// Launch the environment's browser; returns endpoints for attaching.
    async fn start_browser(&self, env_id: &str) -> Result<StartedBrowser>;

    /// Stop the environment's browser.
    async fn stop_browser(&self, env_id: &str) -> Result<()>;

    /// Last known URL of a running environment, when the API reports one.
    async fn last_url(&self, env_id: &str) -> Result<Option<String>>;
}
