//! Response normalization.
//!
//! The backend's reply envelope has changed shape across versions. This module
//! turns whatever came back into display text by walking an ordered list of
//! shape checks, most specific nested shape first, generic dump last.
//!
//! The order is part of the contract: a payload carrying both `data.data` and
//! `error` resolves to the `data.data` string.

use serde_json::Value;

/// Prefix marking a backend-reported (or client-formatted) error.
pub const ERROR_PREFIX: &str = "Error: ";

/// Classified reply extracted from a raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Plain agent text.
    Text(String),
    /// An `error` field was present. Holds the error description without prefix.
    Error(String),
    /// Nothing recognizable; pretty-printed JSON of the whole payload.
    Raw(String),
}

impl Reply {
    /// Whether this reply should flip the session into the error state.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Display text for the reply. Errors carry [`ERROR_PREFIX`].
    pub fn into_text(self) -> String {
        match self {
            Reply::Text(text) | Reply::Raw(text) => text,
            Reply::Error(message) => format!("{ERROR_PREFIX}{message}"),
        }
    }
}

/// Classify a payload according to the resolution order.
pub fn classify(payload: &Value) -> Reply {
    // 1. Already a string.
    if let Value::String(text) = payload {
        return Reply::Text(text.clone());
    }

    if let Value::Object(map) = payload {
        let data = map.get("data");

        // 2. Wrapped wrapper: {data: {data: "..."}}
        if let Some(text) = data
            .and_then(|d| d.get("data"))
            .and_then(non_empty_str)
        {
            return Reply::Text(text.to_string());
        }

        // 3. {data: "..."}
        if let Some(text) = data.and_then(non_empty_str) {
            return Reply::Text(text.to_string());
        }

        // 4. {response: {data: "..."}}
        if let Some(text) = map
            .get("response")
            .and_then(|r| r.get("data"))
            .and_then(non_empty_str)
        {
            return Reply::Text(text.to_string());
        }

        // 5. {error: ...}
        if let Some(error) = map.get("error").filter(|e| is_truthy(e)) {
            let message = match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Reply::Error(message);
        }
    }

    // 6. Fallback: show the whole thing.
    Reply::Raw(pretty(payload))
}

/// Extract display text from a raw backend payload. Never fails.
pub fn normalize(payload: &Value) -> String {
    classify(payload).into_text()
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

// Mirrors how the old clients tested envelope fields: null, false, 0 and ""
// don't count as present.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn pretty(payload: &Value) -> String {
    serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
}

// ============================================================================
// TESTS
// ============================================================================
