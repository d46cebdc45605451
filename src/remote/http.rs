//! HTTP client for the compose service (`POST /api/generate`, `POST /api/export`).

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde_json::json;

use super::{parse_generate_response, ComposeService, RemoteError};
use crate::document::MusicData;

/// Blocking HTTP implementation of [`ComposeService`].
pub struct HttpComposeService {
    client: Client,
    base_url: String,
}

impl HttpComposeService {
    /// Build a client for `base_url` (e.g. `http://localhost:8000`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Map a non-success status to [`RemoteError::Status`].
fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}

impl ComposeService for HttpComposeService {
    fn generate(&self, prompt: &str) -> Result<MusicData, RemoteError> {
        let url = self.endpoint("/api/generate");
        tracing::debug!(%url, "requesting generation");

        let response = self
            .client
            .post(&url)
            .json(&json!({ "prompt": prompt }))
            .send()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let value: serde_json::Value = check_status(response)?
            .json()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        parse_generate_response(value)
    }

    fn export(&self, data: &MusicData) -> Result<Vec<u8>, RemoteError> {
        let url = self.endpoint("/api/export");
        tracing::debug!(%url, clips = data.clips.len(), "requesting export");

        let response = self
            .client
            .post(&url)
            .json(data)
            .send()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let bytes = check_status(response)?
            .bytes()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
