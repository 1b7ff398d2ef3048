//! Tool argument decoding.
//!
//! Models hand over arguments as raw text. Empty text means "no
//! arguments"; anything else must be a JSON object. In lenient mode a
//! malformed payload degrades to `{}` with a warning instead of failing
//! the call.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ToolError;

pub fn decode(raw: &str, lenient: bool) -> Result<Value, ToolError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let err = match serde_json::from_str::<Value>(trimmed) {
        Ok(v @ Value::Object(_)) => return Ok(v),
        Ok(Value::Null) => return Ok(Value::Object(Map::new())),
        Ok(other) => format!("expected a JSON object, got {}", kind_of(&other)),
        Err(e) => e.to_string(),
    };

    if lenient {
        tracing::warn!(error = %err, "tool arguments undecodable, using empty object");
        Ok(Value::Object(Map::new()))
    } else {
        Err(ToolError::MalformedArguments(err))
    }
}

/// Deserialize decoded arguments into a tool's typed input.
pub fn typed<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args)
        .map_err(|e| ToolError::InvalidArgument(format!("invalid {tool} arguments: {e}")))
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_text_is_empty_object() {
        assert_eq!(decode("", false).unwrap(), json!({}));
        assert_eq!(decode("  \n", false).unwrap(), json!({}));
        assert_eq!(decode("null", false).unwrap(), json!({}));
    }

    #[test]
    fn object_passes_through() {
        assert_eq!(decode(r#"{"topic":"auth"}"#, false).unwrap(), json!({"topic": "auth"}));
    }

    #[test]
    fn malformed_is_an_error_unless_lenient() {
        assert!(matches!(decode("{oops", false), Err(ToolError::MalformedArguments(_))));
        assert_eq!(decode("{oops", true).unwrap(), json!({}));
    }

    #[test]
    fn non_object_is_rejected() {
        let err = decode("[1,2]", false).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }
}
