//! Whiteboard REST API client.
//!
//! Typed access to the board endpoints with automatic credential header
//! injection. Every call is bounded by a request timeout and never retries;
//! retry policy belongs to the caller.

mod items;
mod request;

pub mod response;

pub use items::ItemFilter;
pub use request::normalize_server_address;
pub use response::{Ack, HeartbeatStatus};

use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::Credentials;

const API_PREFIX: &str = "/api/whiteboard";

/// Default per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const HEADER_BOARD_ID: &str = "x-board-id";
pub const HEADER_SECRET_KEY: &str = "x-secret-key";

/// Board API client. Stateless across calls apart from its credentials.
#[derive(Debug, Clone)]
pub struct BoardApiClient {
    pub(super) http: reqwest::Client,
    pub(super) credentials: Credentials,
    pub(super) headers: HeaderMap,
}
