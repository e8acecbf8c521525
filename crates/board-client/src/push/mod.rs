//! Push channel for real-time board events.
//!
//! Connects to the board's Socket.IO endpoint over WebSocket, answers
//! Engine.IO pings, emits a heartbeat on a timer and forwards domain events.
//! One `start()` runs exactly one session: the channel never reconnects on
//! its own, the owner decides when to start again.

mod connection;
mod events;
mod protocol;

pub use events::{
    EVENT_CONNECTED, EVENT_DELETE_ANNOUNCEMENT, EVENT_DELETE_ASSIGNMENT, EVENT_DELETE_TASK,
    EVENT_HEARTBEAT, EVENT_NEW_ANNOUNCEMENT, EVENT_NEW_ASSIGNMENT, EVENT_NEW_TASK,
    EVENT_UPDATE_ASSIGNMENT,
};

use std::fmt;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use url::Url;

use crate::models::{DomainItem, ItemKey, ItemKind};
use crate::{BoardError, Credentials};

const SOCKET_IO_PATH: &str = "/socket.io/";
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const ERROR_BACKOFF: Duration = Duration::from_secs(2);

/// Default interval for the channel-level heartbeat.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
/// Upper bound on how long `stop()` waits before abandoning the task.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Push channel connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Normalized item change received from the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub change: ChangeKind,
    pub kind: ItemKind,
    pub item_id: String,
    /// Present for `Created` and `Updated`.
    pub payload: Option<DomainItem>,
}

impl PushEvent {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.kind, self.item_id.clone())
    }
}

/// Authentication acknowledgement sent by the board after connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub accepted: bool,
    pub status: String,
    pub message: Option<String>,
}

/// Everything the channel reports to its owner, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushMessage {
    State(ConnectionState),
    Auth(AuthResult),
    Event(PushEvent),
}

/// Push channel configuration.
#[derive(Debug, Clone)]
pub struct PushConfig {
    pub credentials: Credentials,
    pub heartbeat_interval: Duration,
}

impl PushConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// WebSocket URL with credentials passed as query parameters.
    pub fn socket_url(&self) -> Result<Url, BoardError> {
        let mut url = self.base_socket_url()?;
        url.query_pairs_mut()
            .append_pair("EIO", "4")
            .append_pair("transport", "websocket")
            .append_pair("board_id", &self.credentials.board_id)
            .append_pair("secret_key", &self.credentials.secret_key);
        Ok(url)
    }

    /// Same as [`socket_url`](Self::socket_url) without the secret, for logs.
    pub fn redacted_url(&self) -> String {
        self.base_socket_url()
            .map(|url| format!("{url}?board_id={}", self.credentials.board_id))
            .unwrap_or_else(|_| self.credentials.base_url.clone())
    }

    fn base_socket_url(&self) -> Result<Url, BoardError> {
        let mut url = Url::parse(&self.credentials.base_url)?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| BoardError::Config(format!("cannot use {scheme} for {url}")))?;
        url.set_path(SOCKET_IO_PATH);
        Ok(url)
    }
}

/// Publishes state transitions to both the watch channel and the event queue.
struct StatePublisher {
    state_tx: watch::Sender<ConnectionState>,
    events: mpsc::Sender<PushMessage>,
}

impl StatePublisher {
    async fn set(&self, state: ConnectionState) {
        tracing::debug!(state = %state, "Push channel state changed");
        self.state_tx.send_replace(state.clone());
        let _ = self.events.send(PushMessage::State(state)).await;
    }
}

/// Handle to a running push session.
pub struct PushHandle {
    shutdown_tx: mpsc::Sender<()>,
    state_rx: watch::Receiver<ConnectionState>,
    join: JoinHandle<()>,
}

impl PushHandle {
    pub fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the session, waiting at most [`STOP_TIMEOUT`] before aborting it.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.try_send(());
        let mut join = self.join;
        match tokio::time::timeout(STOP_TIMEOUT, &mut join).await {
            Ok(_) => tracing::info!("Push channel stopped"),
            Err(_) => {
                tracing::warn!("Push channel did not stop in time, abandoning it");
                join.abort();
            }
        }
    }
}

/// Socket.IO push channel.
pub struct PushChannel;

impl PushChannel {
    /// Spawn one push session. Messages are delivered on `events`.
    pub fn start(config: PushConfig, events: mpsc::Sender<PushMessage>) -> PushHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let publisher = StatePublisher { state_tx, events };
        let join = tokio::spawn(Self::run_session(config, publisher, shutdown_rx));
        PushHandle {
            shutdown_tx,
            state_rx,
            join,
        }
    }

    async fn run_session(
        config: PushConfig,
        publisher: StatePublisher,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        publisher.set(ConnectionState::Connecting).await;
        match Self::connect_once(&config, &publisher, &mut shutdown_rx).await {
            Ok(()) => {
                tracing::info!("Push channel closed cleanly");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Push channel failed");
                publisher.set(ConnectionState::Error(e.to_string())).await;
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Push channel shutdown requested during error backoff");
                    }
                    _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                }
            }
        }
        publisher.set(ConnectionState::Disconnected).await;
    }
}
