use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One environment (browser profile) as reported by `/user/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    /// Primary identifier. Some builds report it as `id` instead.
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub create_time: Option<i64>,
    /// Anything the API reported that we do not model explicitly.
    #[serde(flatten)]
    pub extra: Value,
}

impl EnvironmentInfo {
    /// Normalize a raw list entry: fill `user_id` from `id` when missing.
    pub fn from_raw(mut raw: Value) -> Option<Self> {
        if raw.get("user_id").and_then(Value::as_str).is_none() {
            if let Some(id) = raw.get("id").and_then(Value::as_str).map(str::to_string) {
                raw["user_id"] = Value::String(id);
            }
        }
        let info: EnvironmentInfo = serde_json::from_value(raw).ok()?;
        if info.user_id.is_empty() {
            return None;
        }
        Some(info)
    }

    /// Whether any of the identifiers the UI may hold matches `needle`.
    pub fn matches_id(&self, needle: &str) -> bool {
        self.user_id == needle || self.serial_number == needle
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupInfo {
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub group_name: String,
}

/// Endpoints returned by `/browser/start`.
#[derive(Debug, Clone)]
pub struct StartedBrowser {
    /// CDP WebSocket endpoint, when the API handed one out.
    pub ws_endpoint: Option<String>,
    /// Whether the API reported an already-open tab without control endpoint.
    pub open_tab: bool,
}

/// One entry of `/browser/active`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActiveBrowser {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub last_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_raw_with_user_id() {
        let info = EnvironmentInfo::from_raw(json!({
            "user_id": "k1",
            "name": "shop-a",
            "serial_number": "17",
            "group_name": "retail"
        }))
        .unwrap();
        assert_eq!(info.user_id, "k1");
        assert_eq!(info.group_name, "retail");
    }

    #[test]
    fn test_from_raw_falls_back_to_id() {
        let info = EnvironmentInfo::from_raw(json!({"id": "k2", "name": "shop-b"})).unwrap();
        assert_eq!(info.user_id, "k2");
    }

    #[test]
    fn test_from_raw_without_any_id() {
        assert!(EnvironmentInfo::from_raw(json!({"name": "orphan"})).is_none());
    }

    #[test]
    fn test_matches_serial_number() {
        let info = EnvironmentInfo::from_raw(json!({"user_id": "k3", "serial_number": "42"})).unwrap();
        assert!(info.matches_id("k3"));
        assert!(info.matches_id("42"));
        assert!(!info.matches_id("k4"));
    }

    #[test]
    fn test_extra_fields_preserved() {
        let info = EnvironmentInfo::from_raw(json!({"user_id": "k5", "remark": "vip"})).unwrap();
        assert_eq!(info.extra["remark"], "vip");
    }
}
