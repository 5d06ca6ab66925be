//! Failure normalization.
//!
//! Errors reach the user from several directions: typed Rust errors,
//! plain strings relayed from an upstream service, and JSON error bodies
//! such as `{"message": "...", "code": "..."}`. [`message_of`] and
//! [`code_of`] collapse all of them into one human-readable message and an
//! optional machine code. Neither function panics.

use std::error::Error as StdError;

use serde_json::Value;

/// Message used when a failure carries nothing printable.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Machine-readable code attached to a typed error.
pub trait ErrorCode {
    fn code(&self) -> Option<&'static str>;
}

/// A borrowed view of any failure value.
#[derive(Clone, Copy)]
pub enum Failure<'a> {
    /// A typed error, optionally carrying a code.
    Native {
        error: &'a (dyn StdError + 'a),
        code: Option<&'static str>,
    },
    /// A plain message.
    Text(&'a str),
    /// A structured (JSON) error value.
    Structured(&'a Value),
    /// Nothing at all.
    Absent,
}

impl<'a> Failure<'a> {
    /// Wrap a typed error without a code.
    pub fn native(error: &'a (dyn StdError + 'a)) -> Self {
        Self::Native { error, code: None }
    }

    /// Wrap a typed error that reports its own code.
    pub fn coded<E>(error: &'a E) -> Self
    where
        E: StdError + ErrorCode + 'a,
    {
        Self::Native {
            error,
            code: error.code(),
        }
    }
}

impl<'a> From<&'a str> for Failure<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a Value> for Failure<'a> {
    fn from(value: &'a Value) -> Self {
        Self::Structured(value)
    }
}

impl<'a, T> From<Option<T>> for Failure<'a>
where
    T: Into<Self>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

/// Human-readable message for any failure value.
pub fn message_of<'a>(failure: impl Into<Failure<'a>>) -> String {
    match failure.into() {
        Failure::Native { error, .. } => non_empty(error.to_string()),
        Failure::Text(text) => non_empty(text.to_string()),
        Failure::Structured(value) => structured_message(value),
        Failure::Absent => UNKNOWN_ERROR.to_string(),
    }
}

/// Machine code for a failure value, when one is carried.
pub fn code_of<'a>(failure: impl Into<Failure<'a>>) -> Option<String> {
    match failure.into() {
        Failure::Native { code, .. } => code.map(str::to_string),
        Failure::Structured(Value::Object(map)) => match map.get("code") {
            Some(Value::String(code)) => Some(code.clone()),
            _ => None,
        },
        Failure::Structured(_) | Failure::Text(_) | Failure::Absent => None,
    }
}

/// Message for a raw response body: JSON bodies are inspected for a
/// `message` (or `error`) field, anything else is used verbatim.
pub fn message_of_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value @ (Value::Object(_) | Value::String(_))) => ["message", "error"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str).filter(|m| !m.is_empty()))
            .map_or_else(|| structured_message(&value), str::to_string),
        _ => non_empty(body.trim().to_string()),
    }
}

fn structured_message(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => UNKNOWN_ERROR.to_string(),
        Value::String(text) => non_empty(text.clone()),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(message)) if !message.is_empty() => message.clone(),
            _ => stringify(value),
        },
        Value::Bool(true) | Value::Number(_) | Value::Array(_) => stringify(value),
    }
}

fn stringify(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| UNKNOWN_ERROR.to_string())
}

fn non_empty(message: String) -> String {
    if message.is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        message
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, thiserror::Error)]
    #[error("row missing")]
    struct Missing;

    impl ErrorCode for Missing {
        fn code(&self) -> Option<&'static str> {
            Some("row_not_found")
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("")]
    struct Silent;

    #[test]
    fn native_error_uses_display() {
        let err = std::io::Error::other("disk on fire");
        assert_eq!(message_of(Failure::native(&err)), "disk on fire");
        assert_eq!(code_of(Failure::native(&err)), None);
    }

    #[test]
    fn native_error_with_empty_display_is_unknown() {
        assert_eq!(message_of(Failure::native(&Silent)), UNKNOWN_ERROR);
    }

    #[test]
    fn coded_error_reports_code() {
        assert_eq!(code_of(Failure::coded(&Missing)), Some("row_not_found".into()));
        assert_eq!(message_of(Failure::coded(&Missing)), "row missing");
    }

    #[test]
    fn string_is_returned_as_is() {
        assert_eq!(message_of("plain failure"), "plain failure");
        assert_eq!(message_of(""), UNKNOWN_ERROR);
        assert_eq!(code_of("plain failure"), None);
    }

    #[test]
    fn structured_message_and_code() {
        let value = json!({"message": "JWT expired", "code": "PGRST301"});
        assert_eq!(message_of(&value), "JWT expired");
        assert_eq!(code_of(&value), Some("PGRST301".into()));
    }

    #[test]
    fn structured_without_message_is_stringified() {
        let value = json!({"detail": "nope"});
        assert_eq!(message_of(&value), r#"{"detail":"nope"}"#);
    }

    #[test]
    fn structured_with_empty_message_is_stringified() {
        let value = json!({"message": ""});
        assert_eq!(message_of(&value), r#"{"message":""}"#);
    }

    #[test]
    fn non_string_code_is_ignored() {
        let value = json!({"message": "bad", "code": 42});
        assert_eq!(code_of(&value), None);
    }

    #[test]
    fn absent_and_null_are_unknown() {
        assert_eq!(message_of(Failure::Absent), UNKNOWN_ERROR);
        assert_eq!(message_of(&Value::Null), UNKNOWN_ERROR);
        assert_eq!(message_of(None::<&str>), UNKNOWN_ERROR);
        assert_eq!(code_of(Failure::Absent), None);
    }

    #[test]
    fn body_message_prefers_message_then_error() {
        assert_eq!(message_of_body(r#"{"message":"rate limited"}"#), "rate limited");
        assert_eq!(message_of_body(r#"{"error":"Bad request"}"#), "Bad request");
        assert_eq!(message_of_body("upstream exploded"), "upstream exploded");
        assert_eq!(message_of_body("   "), UNKNOWN_ERROR);
    }
}
