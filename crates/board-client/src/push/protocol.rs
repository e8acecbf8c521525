//! Minimal Engine.IO v4 / Socket.IO v4 framing for the WebSocket transport.
//!
//! Only the default namespace is used. Binary packets are not supported.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::BoardError;

/// Socket.IO CONNECT to the default namespace.
pub(crate) const NAMESPACE_CONNECT: &str = "40";
/// Socket.IO DISCONNECT from the default namespace.
pub(crate) const NAMESPACE_DISCONNECT: &str = "41";
/// Engine.IO PONG.
pub(crate) const PONG: &str = "3";

/// Engine.IO OPEN handshake data.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OpenPayload {
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

impl OpenPayload {
    /// How long the connection may stay silent before it is considered dead.
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

#[derive(Debug)]
pub(crate) enum EnginePacket {
    Open(OpenPayload),
    Close,
    Ping,
    Pong,
    Message(String),
    Other,
}

#[derive(Debug, PartialEq)]
pub(crate) enum SocketPacket {
    Connect,
    Disconnect,
    Event { name: String, data: Value },
    ConnectError(Value),
    Other,
}

pub(crate) fn parse_engine_packet(text: &str) -> Result<EnginePacket, BoardError> {
    let mut chars = text.chars();
    let Some(kind) = chars.next() else {
        return Err(BoardError::Protocol("empty engine.io packet".into()));
    };
    let rest = chars.as_str();
    Ok(match kind {
        '0' => EnginePacket::Open(serde_json::from_str(rest).map_err(|e| {
            BoardError::Protocol(format!("invalid engine.io open payload: {e}"))
        })?),
        '1' => EnginePacket::Close,
        '2' => EnginePacket::Ping,
        '3' => EnginePacket::Pong,
        '4' => EnginePacket::Message(rest.to_string()),
        _ => EnginePacket::Other,
    })
}

pub(crate) fn parse_socket_packet(payload: &str) -> Result<SocketPacket, BoardError> {
    let mut chars = payload.chars();
    let Some(kind) = chars.next() else {
        return Err(BoardError::Protocol("empty socket.io packet".into()));
    };
    let body = strip_namespace_and_ack(chars.as_str());
    Ok(match kind {
        '0' => SocketPacket::Connect,
        '1' => SocketPacket::Disconnect,
        '2' => {
            let mut parts = match serde_json::from_str::<Value>(body)? {
                Value::Array(parts) => parts.into_iter(),
                other => {
                    return Err(BoardError::Protocol(format!(
                        "socket.io event is not an array: {other}"
                    )));
                }
            };
            let name = match parts.next() {
                Some(Value::String(name)) => name,
                _ => return Err(BoardError::Protocol("socket.io event without name".into())),
            };
            SocketPacket::Event {
                name,
                data: parts.next().unwrap_or(Value::Null),
            }
        }
        '4' => SocketPacket::ConnectError(serde_json::from_str(body).unwrap_or(Value::Null)),
        _ => SocketPacket::Other,
    })
}

/// Skip an optional `/namespace,` prefix and an optional numeric ack id.
fn strip_namespace_and_ack(body: &str) -> &str {
    let body = match body.strip_prefix('/') {
        Some(rest) => rest.split_once(',').map_or("", |(_, tail)| tail),
        None => body,
    };
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

/// Encode an event for the default namespace: `42["name",data]`.
pub(crate) fn encode_event(name: &str, data: &Value) -> String {
    format!("42{}", Value::Array(vec![Value::String(name.to_string()), data.clone()]))
}
