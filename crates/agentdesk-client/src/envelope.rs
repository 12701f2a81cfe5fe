use serde::de::DeserializeOwned;
use tracing::warn;

use crate::errors::ApiError;

const STATUS_SUCCESS: &str = "success";

/// `{status, result}` wrapper used by every non-streaming backend response.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Envelope {
    /// `"success"` or `"error"`; anything non-`success` is a failure
    /// regardless of the HTTP status code.
    pub status: String,
    /// Endpoint-specific payload; see `decode`.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl Envelope {
    /// Checks the envelope status and decodes `result` into `T`.
    ///
    /// A non-`success` status is rejected before `result` is examined. The
    /// backend is inconsistent about `result`: some endpoints inline the
    /// value, others double-encode it as a JSON string. Decoding tries the
    /// inline shape first and falls back to re-parsing a string payload, so
    /// the ambiguity stops at this boundary.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        if self.status != STATUS_SUCCESS {
            return Err(ApiError::Envelope {
                status: self.status,
            });
        }
        let result = self
            .result
            .ok_or_else(|| ApiError::parse("envelope has no result field"))?;
        decode_result(result)
    }
}

fn decode_result<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ApiError> {
    match serde_json::from_value::<T>(value.clone()) {
        Ok(decoded) => Ok(decoded),
        Err(inline_err) => match value {
            serde_json::Value::String(raw) => serde_json::from_str::<T>(&raw).map_err(|err| {
                warn!(payload = %raw, "failed to decode string-encoded result");
                ApiError::parse(err.to_string())
            }),
            other => {
                warn!(payload = %other, "failed to decode result payload");
                Err(ApiError::parse(inline_err.to_string()))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(status: &str, result: serde_json::Value) -> Envelope {
        Envelope {
            status: status.into(),
            result: Some(result),
        }
    }

    #[test]
    fn decodes_string_encoded_list() {
        let names: Vec<String> = envelope("success", serde_json::json!("[\"a\",\"b\"]"))
            .decode()
            .expect("decode");
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn decodes_inline_list() {
        let names: Vec<String> = envelope("success", serde_json::json!(["a", "b"]))
            .decode()
            .expect("decode");
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn plain_string_result_stays_a_string() {
        let content: String = envelope("success", serde_json::json!("# Title\n\nbody"))
            .decode()
            .expect("decode");
        assert_eq!(content, "# Title\n\nbody");
    }

    #[test]
    fn error_status_rejects_without_touching_result() {
        // The result is not even valid JSON text; a parse attempt would fail
        // with a different variant.
        let err = envelope("error", serde_json::json!("{not json"))
            .decode::<Vec<String>>()
            .expect_err("must reject");
        assert!(matches!(err, ApiError::Envelope { status } if status == "error"));
    }

    #[test]
    fn missing_result_is_a_parse_error() {
        let err = Envelope {
            status: "success".into(),
            result: None,
        }
        .decode::<Vec<String>>()
        .expect_err("must reject");
        assert!(matches!(err, ApiError::Parse { .. }));
    }

    #[test]
    fn undecodable_string_is_a_parse_error() {
        let err = envelope("success", serde_json::json!("{not json"))
            .decode::<Vec<String>>()
            .expect_err("must reject");
        assert!(matches!(err, ApiError::Parse { .. }));
    }
}
