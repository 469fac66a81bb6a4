//! Best-effort JSON extraction from free-form model output.

use serde_json::Value;

/// Parse `text` as a JSON object.
///
/// Tries a strict parse first, then the substring between the first `{` and
/// the last `}` to tolerate commentary or code fences around the object.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed)
        && value.is_object()
    {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&trimmed[start..=end])
        .ok()
        .filter(Value::is_object)
}
