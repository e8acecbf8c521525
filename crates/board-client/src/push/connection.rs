use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_tungstenite::tungstenite::Message as Msg;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::events::{EVENT_HEARTBEAT, Inbound, translate};
use super::protocol::{
    EnginePacket, NAMESPACE_CONNECT, NAMESPACE_DISCONNECT, OpenPayload, PONG, SocketPacket,
    encode_event, parse_engine_packet, parse_socket_packet,
};
use super::*;

type BoardSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum FrameAction {
    Continue,
    Closed(BoardError),
}

impl PushChannel {
    /// Run one connection until shutdown (`Ok`) or failure (`Err`).
    pub(super) async fn connect_once(
        config: &PushConfig,
        publisher: &StatePublisher,
        shutdown_rx: &mut mpsc::Receiver<()>,
    ) -> Result<(), BoardError> {
        let url = config.socket_url()?;
        tracing::info!(url = %config.redacted_url(), "Connecting to board push channel");

        let mut ws = tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!("Push channel shutdown during connect");
                return Ok(());
            }
            result = tokio::time::timeout(HANDSHAKE_TIMEOUT, connect_async(url.as_str())) => {
                match result {
                    Ok(connected) => connected?.0,
                    Err(_) => return Err(BoardError::Timeout),
                }
            }
        };

        let open = match tokio::time::timeout(HANDSHAKE_TIMEOUT, Self::handshake(&mut ws)).await {
            Ok(open) => open?,
            Err(_) => return Err(BoardError::Timeout),
        };
        tracing::info!(sid = %open.sid, "Push channel connected");
        publisher.set(ConnectionState::Connected).await;

        let liveness = open.liveness_window();
        let mut last_seen = Instant::now();
        let mut heartbeat = tokio::time::interval_at(
            Instant::now() + config.heartbeat_interval,
            config.heartbeat_interval,
        );
        let heartbeat_frame = encode_event(
            EVENT_HEARTBEAT,
            &json!({ "board_id": config.credentials.board_id }),
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Push channel shutdown during listen");
                    let _ = ws.send(Msg::text(NAMESPACE_DISCONNECT.to_string())).await;
                    let _ = ws.close(None).await;
                    return Ok(());
                }
                _ = heartbeat.tick() => {
                    match ws.send(Msg::text(heartbeat_frame.clone())).await {
                        Ok(()) => tracing::trace!("Push heartbeat sent"),
                        Err(e) => tracing::warn!(error = %e, "Push heartbeat failed"),
                    }
                }
                _ = sleep_until(last_seen + liveness) => {
                    tracing::warn!("Push channel liveness timeout");
                    return Err(BoardError::Timeout);
                }
                frame = ws.next() => {
                    last_seen = Instant::now();
                    match frame {
                        Some(Ok(Msg::Text(text))) => {
                            if let FrameAction::Closed(e) =
                                Self::handle_frame(&mut ws, &text, publisher).await
                            {
                                let _ = ws.close(None).await;
                                return Err(e);
                            }
                        }
                        Some(Ok(Msg::Ping(data))) => {
                            let _ = ws.send(Msg::Pong(data)).await;
                        }
                        Some(Ok(Msg::Close(_))) | None => {
                            tracing::warn!("Push channel closed by server");
                            return Err(BoardError::Transport("server closed the connection".into()));
                        }
                        Some(Err(e)) => return Err(e.into()),
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }

    /// Engine.IO OPEN followed by a Socket.IO namespace CONNECT.
    async fn handshake(ws: &mut BoardSocket) -> Result<OpenPayload, BoardError> {
        let mut open = None;
        while let Some(frame) = ws.next().await {
            let text = match frame? {
                Msg::Text(text) => text,
                Msg::Close(_) => break,
                _ => continue,
            };
            match parse_engine_packet(&text)? {
                EnginePacket::Open(payload) => {
                    open = Some(payload);
                    ws.send(Msg::text(NAMESPACE_CONNECT.to_string())).await?;
                }
                EnginePacket::Ping => {
                    ws.send(Msg::text(PONG.to_string())).await?;
                }
                EnginePacket::Message(payload) => match parse_socket_packet(&payload)? {
                    SocketPacket::Connect => {
                        return open.ok_or_else(|| {
                            BoardError::Protocol("namespace connect before open".into())
                        });
                    }
                    SocketPacket::ConnectError(data) => {
                        return Err(BoardError::Auth(connect_error_message(&data)));
                    }
                    other => tracing::debug!(packet = ?other, "Ignoring packet before connect"),
                },
                EnginePacket::Close => break,
                EnginePacket::Pong | EnginePacket::Other => {}
            }
        }
        Err(BoardError::Transport(
            "connection closed during handshake".into(),
        ))
    }

    async fn handle_frame(
        ws: &mut BoardSocket,
        text: &str,
        publisher: &StatePublisher,
    ) -> FrameAction {
        let packet = match parse_engine_packet(text) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed engine.io frame");
                return FrameAction::Continue;
            }
        };
        match packet {
            EnginePacket::Ping => {
                if let Err(e) = ws.send(Msg::text(PONG.to_string())).await {
                    return FrameAction::Closed(e.into());
                }
                FrameAction::Continue
            }
            EnginePacket::Close => {
                FrameAction::Closed(BoardError::Transport("server closed the session".into()))
            }
            EnginePacket::Message(payload) => Self::handle_socket_packet(&payload, publisher).await,
            EnginePacket::Open(_) | EnginePacket::Pong | EnginePacket::Other => {
                FrameAction::Continue
            }
        }
    }

    async fn handle_socket_packet(payload: &str, publisher: &StatePublisher) -> FrameAction {
        let packet = match parse_socket_packet(payload) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed socket.io packet");
                return FrameAction::Continue;
            }
        };
        match packet {
            SocketPacket::Event { name, data } => match translate(&name, data) {
                Ok(Inbound::Item(event)) => {
                    tracing::debug!(event = %name, key = %event.key(), "Push event received");
                    let _ = publisher.events.send(PushMessage::Event(event)).await;
                    FrameAction::Continue
                }
                Ok(Inbound::Auth(auth)) => {
                    tracing::info!(
                        status = %auth.status,
                        message = auth.message.as_deref().unwrap_or(""),
                        "Board authentication result"
                    );
                    let accepted = auth.accepted;
                    let reason = auth
                        .message
                        .clone()
                        .unwrap_or_else(|| auth.status.clone());
                    let _ = publisher.events.send(PushMessage::Auth(auth)).await;
                    if accepted {
                        FrameAction::Continue
                    } else {
                        FrameAction::Closed(BoardError::Auth(reason))
                    }
                }
                Ok(Inbound::Ignored) => {
                    tracing::debug!(event = %name, "Unhandled push event");
                    FrameAction::Continue
                }
                Err(e) => {
                    tracing::warn!(event = %name, error = %e, "Dropping malformed push event");
                    FrameAction::Continue
                }
            },
            SocketPacket::Disconnect => FrameAction::Closed(BoardError::Transport(
                "server disconnected the namespace".into(),
            )),
            SocketPacket::ConnectError(data) => {
                FrameAction::Closed(BoardError::Auth(connect_error_message(&data)))
            }
            SocketPacket::Connect | SocketPacket::Other => FrameAction::Continue,
        }
    }
}

fn connect_error_message(data: &serde_json::Value) -> String {
    data.get("message")
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| format!("connection refused: {data}"))
}
