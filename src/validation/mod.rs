//! Parameter-shape validation (§4.5 gate 6). Style grounded on
//! `security.rs`'s hand-rolled validators in the teacher; the device-name
//! pattern uses `regex`/`once_cell::sync::Lazy` the way the rest of the
//! pack reaches for a compiled-once regex.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

static DEVICE_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^camera[0-9]+$").unwrap());

fn device_name(params: &Value) -> Result<String, ValidationError> {
    let device = params
        .get("device")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::new("device", "missing required field"))?;
    if !DEVICE_NAME_RE.is_match(device) {
        return Err(ValidationError::new(
            "device",
            format!("'{device}' does not match ^camera[0-9]+$"),
        ));
    }
    Ok(device.to_string())
}

fn pagination(params: &Value) -> Result<(u32, u32), ValidationError> {
    let limit = match params.get("limit") {
        None => 50,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| ValidationError::new("limit", "must be a non-negative integer"))?
            as u32,
    };
    if limit == 0 || limit > 500 {
        return Err(ValidationError::new("limit", "must be between 1 and 500"));
    }
    let offset = match params.get("offset") {
        None => 0,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| ValidationError::new("offset", "must be a non-negative integer"))?
            as u32,
    };
    Ok((limit, offset))
}

fn topics_array(params: &Value) -> Result<(), ValidationError> {
    let Some(topics) = params.get("topics") else {
        // subscribe_events requires topics; unsubscribe_events treats a
        // missing/absent list as "unsubscribe from everything".
        return Ok(());
    };
    let arr = topics
        .as_array()
        .ok_or_else(|| ValidationError::new("topics", "must be an array of strings"))?;
    for entry in arr {
        if entry.as_str().is_none() {
            return Err(ValidationError::new(
                "topics",
                "every entry must be a string",
            ));
        }
    }
    Ok(())
}

fn retention_policy(params: &Value) -> Result<(), ValidationError> {
    let days = params
        .get("retention_days")
        .and_then(Value::as_u64)
        .ok_or_else(|| ValidationError::new("retention_days", "must be a positive integer"))?;
    if days == 0 || days > 3650 {
        return Err(ValidationError::new(
            "retention_days",
            "must be between 1 and 3650",
        ));
    }
    Ok(())
}

fn external_stream(params: &Value) -> Result<(), ValidationError> {
    for field in ["id", "name", "url"] {
        if params.get(field).and_then(Value::as_str).is_none() {
            return Err(ValidationError::new(field, "missing required field"));
        }
    }
    Ok(())
}

/// Validate a method's params according to its shape, returning the
/// params unchanged on success (handlers still read fields directly; this
/// gate's job is to reject early, not to reshape).
pub fn validate(method: &str, params: &Value) -> Result<Value, ValidationError> {
    match method {
        "get_camera_status"
        | "take_snapshot"
        | "start_recording"
        | "stop_recording"
        | "get_stream_url"
        | "get_stream_status" => {
            device_name(params)?;
        }
        "list_recordings" => {
            pagination(params)?;
        }
        "subscribe_events" | "unsubscribe_events" => {
            topics_array(params)?;
        }
        "set_retention_policy" => {
            retention_policy(params)?;
        }
        "add_external_stream" => {
            external_stream(params)?;
        }
        "remove_external_stream" => {
            if params.get("id").and_then(Value::as_str).is_none() {
                return Err(ValidationError::new("id", "missing required field"));
            }
        }
        _ => {}
    }
    Ok(params.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn device_name_must_match_pattern() {
        let ok = json!({"device": "camera0"});
        assert!(validate("get_camera_status", &ok).is_ok());

        let bad = json!({"device": "not-a-camera"});
        assert!(validate("get_camera_status", &bad).is_err());
    }

    #[test]
    fn pagination_rejects_oversized_limit() {
        let bad = json!({"limit": 10000});
        assert!(validate("list_recordings", &bad).is_err());
    }

    #[test]
    fn pagination_defaults_when_absent() {
        let empty = json!({});
        assert!(validate("list_recordings", &empty).is_ok());
    }

    #[test]
    fn subscribe_rejects_non_string_topics() {
        let bad = json!({"topics": [1, 2]});
        assert!(validate("subscribe_events", &bad).is_err());
    }

    proptest::proptest! {
        #[test]
        fn pagination_accepts_every_value_in_range(limit in 1u32..=500, offset in 0u32..10_000) {
            let params = json!({"limit": limit, "offset": offset});
            prop_assert!(pagination(&params).is_ok());
        }

        #[test]
        fn pagination_rejects_every_value_out_of_range(limit in 501u32..100_000) {
            let params = json!({"limit": limit});
            prop_assert!(pagination(&params).is_err());
        }
    }
}
