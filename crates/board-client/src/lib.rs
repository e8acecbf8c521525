//! Whiteboard service client library.
//!
//! Provides the REST API client, the Socket.IO push channel,
//! the typed domain item model, and config-link parsing.

pub mod api;
pub mod link;
pub mod models;
pub mod push;

pub use api::{BoardApiClient, ItemFilter};
pub use models::{
    BOARD_TIMESTAMP_FORMAT, DomainItem, ItemBody, ItemKey, ItemKind, parse_board_timestamp,
};

/// Server address and credentials shared by the API client and push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Normalized `scheme://host[:port]`, no trailing slash.
    pub base_url: String,
    pub board_id: String,
    pub secret_key: String,
}

/// Unified error type for the board-client crate.
///
/// Variants carry rendered messages rather than source errors so that
/// results can be cloned and forwarded between tasks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("request timed out")]
    Timeout,

    #[error("board returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed board payload: {0}")]
    Protocol(String),

    #[error("board rejected credentials: {0}")]
    Auth(String),

    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

/// Coarse error classes used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transport,
    Protocol,
    Auth,
    StateConflict,
    Configuration,
}

impl BoardError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout | Self::Transport(_) | Self::HttpStatus { .. } => ErrorClass::Transport,
            Self::Protocol(_) => ErrorClass::Protocol,
            Self::Auth(_) => ErrorClass::Auth,
            Self::StateConflict(_) => ErrorClass::StateConflict,
            Self::Config(_) => ErrorClass::Configuration,
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl From<reqwest::Error> for BoardError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Protocol(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BoardError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match e {
            WsError::Http(resp) if matches!(resp.status().as_u16(), 401 | 403) => {
                Self::Auth(format!("push channel handshake refused ({})", resp.status()))
            }
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<url::ParseError> for BoardError {
    fn from(e: url::ParseError) -> Self {
        Self::Config(format!("invalid server address: {e}"))
    }
}
