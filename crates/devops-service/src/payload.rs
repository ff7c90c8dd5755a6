//! Shape and type checks for the `/DevOps` request body.

use serde_json::{Map, Value};

use crate::error::ServiceError;

pub const TIME_TO_LIFE_FIELD: &str = "timeTol.ffeSec";

/// Required keys, in the order they are reported when missing.
pub const REQUIRED_FIELDS: [&str; 4] = ["message", "to", "from", TIME_TO_LIFE_FIELD];

/// A validated `/DevOps` request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevOpsMessage {
    pub message: String,
    pub to: String,
    pub from: String,
    /// `timeTol.ffeSec`
    pub time_to_life_sec: i64,
}

impl DevOpsMessage {
    /// The success text returned to the caller.
    pub fn confirmation(&self) -> String {
        format!("Hello {} your message will be send", self.to)
    }
}

/// `application/json` or any `application/*+json` type, parameters ignored.
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// Parse and validate a request body.
pub fn parse_message(body: &[u8]) -> Result<DevOpsMessage, ServiceError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ServiceError::Validation("Invalid JSON payload".to_string()))?;

    let Value::Object(fields) = value else {
        return Err(ServiceError::Validation(
            "JSON payload must be an object".to_string(),
        ));
    };

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|f| !fields.contains_key(*f))
        .collect();
    if !missing.is_empty() {
        return Err(ServiceError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let time_to_life_sec = match &fields[TIME_TO_LIFE_FIELD] {
        Value::Number(n) if n.is_i64() || n.is_u64() => n.as_i64().ok_or_else(|| {
            ServiceError::Validation(format!("{TIME_TO_LIFE_FIELD} is out of range"))
        })?,
        _ => {
            return Err(ServiceError::Validation(format!(
                "{TIME_TO_LIFE_FIELD} must be an integer"
            )))
        }
    };

    Ok(DevOpsMessage {
        message: string_field(&fields, "message")?,
        to: string_field(&fields, "to")?,
        from: string_field(&fields, "from")?,
        time_to_life_sec,
    })
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Result<String, ServiceError> {
    match &fields[name] {
        Value::String(s) => Ok(s.clone()),
        _ => Err(ServiceError::Validation(format!("{name} must be a string"))),
    }
}
