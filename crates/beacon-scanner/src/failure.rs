//! Normalization of failure causes into result error messages.

use serde_json::Value;

/// Message used when a failure carries no usable information.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// Whatever a failed scan step reported.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureCause {
    /// A plain message, used verbatim
    Text(String),
    /// An error value; its message is used
    Error(String),
    /// A structured payload, e.g. a rejected script promise
    Json(Value),
    /// Nothing was reported
    Unknown,
}

impl FailureCause {
    /// Capture an error's message.
    pub fn error(err: &dyn std::error::Error) -> Self {
        Self::Error(err.to_string())
    }

    /// The error message to record for this cause.
    #[must_use]
    pub fn message(&self) -> String {
        normalize_error_message(self)
    }
}

impl From<&str> for FailureCause {
    fn from(message: &str) -> Self {
        Self::Text(message.to_string())
    }
}

impl From<String> for FailureCause {
    fn from(message: String) -> Self {
        Self::Text(message)
    }
}

impl From<Value> for FailureCause {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Option<FailureCause>> for FailureCause {
    fn from(cause: Option<FailureCause>) -> Self {
        cause.unwrap_or(Self::Unknown)
    }
}

impl From<&beacon_browser::BrowserError> for FailureCause {
    fn from(err: &beacon_browser::BrowserError) -> Self {
        Self::error(err)
    }
}

impl From<&crate::error::ScanError> for FailureCause {
    fn from(err: &crate::error::ScanError) -> Self {
        Self::error(err)
    }
}

/// Turn a failure cause into the message stored on a failed result.
///
/// Text is kept verbatim and errors contribute their message. JSON objects
/// with a string `message` contribute that message; `null` and missing
/// causes give [`UNKNOWN_ERROR_MESSAGE`]; any other JSON is stringified.
#[must_use]
pub fn normalize_error_message(cause: &FailureCause) -> String {
    match cause {
        FailureCause::Text(message) | FailureCause::Error(message) => message.clone(),
        FailureCause::Json(value) => normalize_json(value),
        FailureCause::Unknown => UNKNOWN_ERROR_MESSAGE.to_string(),
    }
}

fn normalize_json(value: &Value) -> String {
    match value {
        Value::Null => UNKNOWN_ERROR_MESSAGE.to_string(),
        Value::String(message) => message.clone(),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_is_verbatim() {
        assert_eq!(FailureCause::from("boom").message(), "boom");
    }

    #[test]
    fn test_error_contributes_message() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "x");
        assert_eq!(FailureCause::error(&err).message(), "x");
    }

    #[test]
    fn test_object_with_message() {
        assert_eq!(FailureCause::from(json!({"message": "y"})).message(), "y");
    }

    #[test]
    fn test_other_object_is_stringified() {
        assert_eq!(
            FailureCause::from(json!({"foo": "bar"})).message(),
            r#"{"foo":"bar"}"#
        );
    }

    #[test]
    fn test_object_with_non_string_message_is_stringified() {
        assert_eq!(
            FailureCause::from(json!({"message": 7})).message(),
            r#"{"message":7}"#
        );
    }

    #[test]
    fn test_missing_cause_uses_fallback() {
        assert_eq!(FailureCause::Unknown.message(), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(FailureCause::from(Value::Null).message(), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(FailureCause::from(None).message(), UNKNOWN_ERROR_MESSAGE);
    }

    #[test]
    fn test_browser_error_message() {
        let err = beacon_browser::BrowserError::Audit("axe is not defined".to_string());
        assert_eq!(
            FailureCause::from(&err).message(),
            "audit failed: axe is not defined"
        );
    }
}
