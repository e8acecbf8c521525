use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use super::response::ApiEnvelope;
use super::*;
use crate::BoardError;

impl BoardApiClient {
    /// Validate settings and build a client with the default timeout.
    pub fn configure(
        server_address: &str,
        board_id: &str,
        secret_key: &str,
    ) -> Result<Self, BoardError> {
        Self::configure_with_timeout(server_address, board_id, secret_key, REQUEST_TIMEOUT)
    }

    pub fn configure_with_timeout(
        server_address: &str,
        board_id: &str,
        secret_key: &str,
        timeout: Duration,
    ) -> Result<Self, BoardError> {
        let board_id = board_id.trim();
        let secret_key = secret_key.trim();
        if board_id.is_empty() || secret_key.is_empty() {
            return Err(BoardError::Config(
                "board id and secret key are required".into(),
            ));
        }

        let base_url = normalize_server_address(server_address)?;
        let headers = credential_headers(board_id, secret_key)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BoardError::Transport(format!("failed to build HTTP client: {e}")))?;

        tracing::info!(base_url = %base_url, board_id, "Board API client configured");
        Ok(Self {
            http,
            credentials: Credentials {
                base_url,
                board_id: board_id.to_string(),
                secret_key: secret_key.to_string(),
            },
            headers,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn base_url(&self) -> &str {
        &self.credentials.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.credentials.base_url)
    }

    /// Execute a GET request with credential headers and decode the envelope.
    pub(super) async fn board_get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiEnvelope, BoardError> {
        let url = self.endpoint(path);
        let resp = self
            .http
            .get(&url)
            .headers(self.headers.clone())
            .query(query)
            .send()
            .await?;
        Self::read_envelope(&url, resp).await
    }

    /// Execute a body-less POST request with credential headers.
    pub(super) async fn board_post(&self, path: &str) -> Result<ApiEnvelope, BoardError> {
        let url = self.endpoint(path);
        let resp = self
            .http
            .post(&url)
            .headers(self.headers.clone())
            .send()
            .await?;
        Self::read_envelope(&url, resp).await
    }

    async fn read_envelope(url: &str, resp: reqwest::Response) -> Result<ApiEnvelope, BoardError> {
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            tracing::debug!(url, status = status.as_u16(), "Board request failed");
            return Err(classify_status(status.as_u16(), body));
        }

        serde_json::from_str(&body)
            .map_err(|e| BoardError::Protocol(format!("invalid response from {url}: {e}")))
    }
}

/// Normalize a user-entered server address to `scheme://host[:port]`.
///
/// Addresses without an explicit scheme default to `http://`.
pub fn normalize_server_address(address: &str) -> Result<String, BoardError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(BoardError::Config("server address is empty".into()));
    }
    let with_scheme = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };

    let url = Url::parse(&with_scheme)?;
    let host = url
        .host_str()
        .ok_or_else(|| BoardError::Config(format!("server address has no host: {address}")))?;
    Ok(match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    })
}

fn credential_headers(board_id: &str, secret_key: &str) -> Result<HeaderMap, BoardError> {
    let mut headers = HeaderMap::new();
    let value = |v: &str, what: &str| {
        HeaderValue::from_str(v)
            .map_err(|_| BoardError::Config(format!("{what} contains invalid characters")))
    };
    let mut secret = value(secret_key, "secret key")?;
    secret.set_sensitive(true);
    headers.insert(
        HeaderName::from_static(HEADER_BOARD_ID),
        value(board_id, "board id")?,
    );
    headers.insert(HeaderName::from_static(HEADER_SECRET_KEY), secret);
    Ok(headers)
}

pub(super) fn classify_status(status: u16, body: String) -> BoardError {
    match status {
        401 | 403 => BoardError::Auth(format!("HTTP {status}: {body}")),
        _ => BoardError::HttpStatus {
            status,
            message: body,
        },
    }
}
