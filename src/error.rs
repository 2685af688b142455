//! Request failure taxonomy.
//!
//! Four things can go wrong with a portal call: the transport fails, the
//! server answers with a non-success status, the body does not decode, or
//! the server reports an application error in the body. All of them collapse
//! into [`ApiError`]; callers treat every variant the same way (keep the
//! last-known-good collection, clear any loading state, surface the message).

use thiserror::Error;

/// Sentinel used when an error body exists but cannot be parsed.
pub const COULD_NOT_PARSE: &str = "could_not_parse_json";

/// Sentinel used when no message can be extracted at all.
pub const UNKNOWN_ERROR: &str = "unknown_error";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or protocol-level failure before a response arrived.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status.
    #[error("{message} (status {status})")]
    Status { status: u16, message: String },

    /// The response body was not the JSON we expect.
    #[error("could_not_parse_json: {0}")]
    Decode(#[source] serde_json::Error),

    /// A request path did not resolve against the configured base URL.
    #[error("invalid request path: {0}")]
    Path(#[from] url::ParseError),

    /// The server confirmed the request but the payload was unusable.
    #[error("{0}")]
    Api(String),
}

/// Best-effort message extraction from an error response body.
///
/// Prefers the body's `error` field, then the envelope `message`, then the
/// fixed sentinels.
pub fn message_from_body(body: &str) -> String {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return COULD_NOT_PARSE.to_string(),
    };

    for field in ["error", "message"] {
        if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }

    UNKNOWN_ERROR.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_error_field() {
        let body = r#"{"error": "image not found", "message": "other"}"#;
        assert_eq!(message_from_body(body), "image not found");
    }

    #[test]
    fn falls_back_to_envelope_message() {
        let body = r#"{"status_code": 406, "message": "Could not load virtual machines!", "data": null}"#;
        assert_eq!(message_from_body(body), "Could not load virtual machines!");
    }

    #[test]
    fn unparsable_body_yields_parse_sentinel() {
        assert_eq!(message_from_body("<html>502</html>"), COULD_NOT_PARSE);
    }

    #[test]
    fn empty_fields_yield_unknown_sentinel() {
        assert_eq!(message_from_body(r#"{"message": ""}"#), UNKNOWN_ERROR);
        assert_eq!(message_from_body(r#"{"data": null}"#), UNKNOWN_ERROR);
    }
}
