use chrono::{DateTime, Utc};
use envdeck_browser::BrowserHandle;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One known-started environment. `handle` is `None` when the profile manager
/// launched the browser but no control WebSocket was available to attach to.
#[derive(Clone)]
pub struct EnvironmentEntry {
    pub handle: Option<Arc<BrowserHandle>>,
    pub ws_endpoint: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub reconnect_count: u32,
}

impl EnvironmentEntry {
    fn new(handle: Option<Arc<BrowserHandle>>, ws_endpoint: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            handle,
            ws_endpoint,
            started_at: now,
            last_activity: now,
            reconnect_count: 0,
        }
    }
}

/// In-memory map from environment id to its connection entry. Last write
/// wins; this is single-process state, rebuilt from scratch on restart.
#[derive(Default)]
pub struct EnvironmentRegistry {
    entries: RwLock<HashMap<String, EnvironmentEntry>>,
}

impl EnvironmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly started environment, replacing any previous entry.
    pub async fn insert(
        &self,
        env_id: &str,
        handle: Option<Arc<BrowserHandle>>,
        ws_endpoint: Option<String>,
    ) {
        let mut entries = self.entries.write().await;
        entries.insert(env_id.to_string(), EnvironmentEntry::new(handle, ws_endpoint));
    }

    /// Drop the entry, returning it so the caller can detach the handle.
    pub async fn remove(&self, env_id: &str) -> Option<EnvironmentEntry> {
        self.entries.write().await.remove(env_id)
    }

    pub async fn contains(&self, env_id: &str) -> bool {
        self.entries.read().await.contains_key(env_id)
    }

    /// Attached automation handle, when this environment has one.
    pub async fn handle(&self, env_id: &str) -> Option<Arc<BrowserHandle>> {
        self.entries
            .read()
            .await
            .get(env_id)
            .and_then(|entry| entry.handle.clone())
    }

    pub async fn entry(&self, env_id: &str) -> Option<EnvironmentEntry> {
        self.entries.read().await.get(env_id).cloned()
    }

    /// Bump `last_activity`; called on every operation routed to the entry.
    pub async fn touch(&self, env_id: &str) {
        if let Some(entry) = self.entries.write().await.get_mut(env_id) {
            entry.last_activity = Utc::now();
        }
    }

    /// Replace the handle after a reconnect, preserving `started_at` and
    /// counting the reconnect. Creates the entry if it was dropped meanwhile.
    pub async fn reconnected(
        &self,
        env_id: &str,
        handle: Option<Arc<BrowserHandle>>,
        ws_endpoint: Option<String>,
    ) -> u32 {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(env_id.to_string())
            .or_insert_with(|| EnvironmentEntry::new(None, None));
        entry.handle = handle;
        entry.ws_endpoint = ws_endpoint;
        entry.last_activity = Utc::now();
        entry.reconnect_count += 1;
        entry.reconnect_count
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let registry = EnvironmentRegistry::new();
        registry.insert("env-1", None, Some("ws://x".into())).await;
        assert!(registry.contains("env-1").await);
        assert_eq!(registry.len().await, 1);

        let entry = registry.entry("env-1").await.unwrap();
        assert_eq!(entry.ws_endpoint.as_deref(), Some("ws://x"));
        assert_eq!(entry.reconnect_count, 0);
        assert!(entry.handle.is_none());
    }

    #[tokio::test]
    async fn test_remove_returns_entry() {
        let registry = EnvironmentRegistry::new();
        registry.insert("env-1", None, None).await;
        assert!(registry.remove("env-1").await.is_some());
        assert!(registry.remove("env-1").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_reconnect_counts_and_preserves_start_time() {
        let registry = EnvironmentRegistry::new();
        registry.insert("env-1", None, None).await;
        let started = registry.entry("env-1").await.unwrap().started_at;

        assert_eq!(registry.reconnected("env-1", None, Some("ws://y".into())).await, 1);
        assert_eq!(registry.reconnected("env-1", None, Some("ws://z".into())).await, 2);

        let entry = registry.entry("env-1").await.unwrap();
        assert_eq!(entry.started_at, started);
        assert_eq!(entry.ws_endpoint.as_deref(), Some("ws://z"));
    }

    #[tokio::test]
    async fn test_reconnect_creates_missing_entry() {
        let registry = EnvironmentRegistry::new();
        assert_eq!(registry.reconnected("env-9", None, None).await, 1);
        assert!(registry.contains("env-9").await);
    }

    #[tokio::test]
    async fn test_handle_absent_without_attachment() {
        let registry = EnvironmentRegistry::new();
        registry.insert("env-1", None, Some("ws://x".into())).await;
        assert!(registry.handle("env-1").await.is_none());
    }
}
