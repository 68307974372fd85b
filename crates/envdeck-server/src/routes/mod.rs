pub mod ai;
pub mod environments;
pub mod explorer;
pub mod status;

use axum::Json;
use serde_json::{json, Value};

/// Success envelope with extra fields merged in.
pub(crate) fn ok(extra: Value) -> Json<Value> {
    let mut body = json!({ "success": true });
    if let (Some(map), Value::Object(extra)) = (body.as_object_mut(), extra) {
        map.extend(extra);
    }
    Json(body)
}

/// Soft-failure envelope. Callers decide the status code; most of the surface
/// reports failures as 200s with `success: false`.
pub(crate) fn fail(message: impl Into<String>) -> Json<Value> {
    Json(json!({ "success": false, "message": message.into() }))
}
