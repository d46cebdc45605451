//! Remote compose services — prompt-to-music generation and MIDI export.
//!
//! The editing core only sees [`ComposeService`]. The HTTP client lives behind
//! the `remote` feature so offline builds carry no network stack.

#[cfg(feature = "remote")]
pub mod http;

#[cfg(feature = "remote")]
pub use http::HttpComposeService;

use thiserror::Error;

use crate::document::{ImportError, MusicData};

/// Remote call failures. All of them leave the document untouched.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The service answered `{"error": "..."}`.
    #[error("service error: {0}")]
    Service(String),
    /// The response was not a valid music document.
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] ImportError),
}

/// Generation and export, as seen by the session.
pub trait ComposeService {
    /// Turn a free-text prompt into a music document.
    fn generate(&self, prompt: &str) -> Result<MusicData, RemoteError>;

    /// Render a packed document to a Standard MIDI File.
    fn export(&self, data: &MusicData) -> Result<Vec<u8>, RemoteError>;
}

/// Interpret a generation response body.
///
/// A top-level `"error"` string is a service-side failure; anything else must
/// validate as a music document.
pub fn parse_generate_response(value: serde_json::Value) -> Result<MusicData, RemoteError> {
    if let Some(message) = value.get("error").and_then(serde_json::Value::as_str) {
        return Err(RemoteError::Service(message.to_string()));
    }
    Ok(MusicData::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_body_is_service_error() {
        let err = parse_generate_response(json!({"error": "rate limited"})).unwrap_err();
        assert!(matches!(err, RemoteError::Service(ref m) if m == "rate limited"));
        assert_eq!(err.to_string(), "service error: rate limited");
    }

    #[test]
    fn incomplete_body_is_invalid_response() {
        let err = parse_generate_response(json!({"bpm": 120})).unwrap_err();
        assert!(matches!(
            err,
            RemoteError::InvalidResponse(ImportError::MissingField("tracks"))
        ));
    }

    #[test]
    fn valid_body_parses() {
        let data = parse_generate_response(json!({
            "bpm": 110,
            "tracks": [{"id": "t_piano", "instrument": "Piano", "type": "instrument"}],
            "clips": {},
            "arrangement": []
        }))
        .unwrap();
        assert_eq!(data.bpm, 110.0);
        assert_eq!(data.tracks.len(), 1);
    }

    #[test]
    fn status_error_display() {
        let err = RemoteError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "service returned HTTP 502: bad gateway");
    }
}
