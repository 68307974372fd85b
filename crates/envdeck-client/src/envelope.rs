use serde::Deserialize;
use serde_json::Value;

/// Rate-limit code some profile-manager builds return alongside the generic
/// "Too many request" message.
const RATE_LIMIT_CODE: i64 = 10002;

/// The `code`/`data`/`msg` JSON envelope every profile-manager response uses.
/// `code == 0` means success; anything else carries a message in `msg`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Value,
    /// Some builds hoist the websocket block to the envelope top level.
    #[serde(default)]
    pub ws: Value,
}

impl ApiEnvelope {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    pub fn message(&self) -> String {
        self.msg.clone().unwrap_or_else(|| "unknown error".into())
    }

    /// Whether this response signals API rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        if self.code == RATE_LIMIT_CODE {
            return true;
        }
        if self.code != 0 {
            if let Some(msg) = &self.msg {
                let msg = msg.to_ascii_lowercase();
                return msg.contains("too many request") || msg.contains("rate limit");
            }
        }
        false
    }

    /// Extract the environment list, tolerating the formats observed in the
    /// wild: `data.list`, a bare array in `data`, or a single object.
    pub fn list_items(&self) -> Vec<Value> {
        match &self.data {
            Value::Array(items) => items.clone(),
            Value::Object(map) => match map.get("list") {
                Some(Value::Array(items)) => items.clone(),
                _ => vec![self.data.clone()],
            },
            _ => Vec::new(),
        }
    }

    /// Extract the CDP WebSocket endpoint from a `/browser/start` response.
    /// The `ws` block may sit under `data` or at the envelope top level, and
    /// the endpoint itself may be the `puppeteer` field or a plain string.
    pub fn ws_endpoint(&self) -> Option<String> {
        extract_ws(&self.data).or_else(|| extract_ws_block(&self.ws))
    }
}

fn extract_ws(data: &Value) -> Option<String> {
    extract_ws_block(data.get("ws")?)
}

fn extract_ws_block(ws: &Value) -> Option<String> {
    match ws {
        Value::String(url) if !url.is_empty() => Some(url.clone()),
        Value::Object(map) => map
            .get("puppeteer")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}
