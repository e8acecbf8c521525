use std::collections::HashMap;
use std::time::Duration;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use board_client::push::{
    ChangeKind, ConnectionState, PushChannel, PushConfig, PushMessage, STOP_TIMEOUT,
};
use board_client::{Credentials, ItemKey};
use tokio::sync::mpsc;

const OPEN: &str = r#"0{"sid":"s1","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;
const SILENT_OPEN: &str = r#"0{"sid":"s2","upgrades":[],"pingInterval":100,"pingTimeout":100}"#;

/// What the mock board does after the namespace handshake.
#[derive(Clone, Copy)]
enum Script {
    Talk,
    Silent,
}

#[derive(Clone)]
struct Board {
    received: mpsc::UnboundedSender<String>,
    script: Script,
}

async fn upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    State(board): State<Board>,
) -> Response {
    let authorized = query.get("secret_key").is_some_and(|k| k == "k1")
        && query.get("board_id").is_some_and(|b| b == "b1");
    ws.on_upgrade(move |socket| session(socket, board, authorized))
}

async fn send(socket: &mut WebSocket, text: &str) {
    let _ = socket.send(Message::Text(text.to_string().into())).await;
}

async fn session(mut socket: WebSocket, board: Board, authorized: bool) {
    let open = match board.script {
        Script::Talk => OPEN,
        Script::Silent => SILENT_OPEN,
    };
    send(&mut socket, open).await;

    // Wait for the namespace CONNECT.
    while let Some(Ok(msg)) = socket.recv().await {
        if let Message::Text(text) = msg {
            let text = text.to_string();
            let _ = board.received.send(text.clone());
            if text == "40" {
                break;
            }
        }
    }

    if !authorized {
        send(&mut socket, r#"44{"message":"invalid credentials"}"#).await;
        return;
    }
    send(&mut socket, r#"40{"sid":"n1"}"#).await;

    if let Script::Talk = board.script {
        send(&mut socket, r#"42["connected",{"status":"success"}]"#).await;
        send(&mut socket, r#"42["new_task",{"id":"t1","title":"Hello","priority":1}]"#).await;
        send(&mut socket, r#"42["delete_announcement",{"announcement_id":4}]"#).await;
        send(&mut socket, "2").await;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let _ = board.received.send(text.to_string());
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

async fn start_board(script: Script) -> (String, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .route("/socket.io/", get(upgrade))
        .with_state(Board {
            received: tx,
            script,
        });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), rx)
}

fn config(base_url: &str, secret_key: &str) -> PushConfig {
    PushConfig::new(Credentials {
        base_url: base_url.to_string(),
        board_id: "b1".to_string(),
        secret_key: secret_key.to_string(),
    })
    .with_heartbeat_interval(Duration::from_millis(100))
}

async fn next(rx: &mut mpsc::Receiver<PushMessage>) -> PushMessage {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for push message")
        .expect("push channel dropped its sender")
}

async fn wait_for_frame(rx: &mut mpsc::UnboundedReceiver<String>, expected: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(frame) = rx.recv().await {
            if frame == expected {
                return;
            }
        }
        panic!("board connection ended before {expected}");
    })
    .await
    .unwrap_or_else(|_| panic!("board never received {expected}"));
}

#[tokio::test]
async fn session_delivers_events_and_heartbeats() {
    let (base_url, mut received) = start_board(Script::Talk).await;
    let (tx, mut rx) = mpsc::channel(32);
    let handle = PushChannel::start(config(&base_url, "k1"), tx);

    assert_eq!(next(&mut rx).await, PushMessage::State(ConnectionState::Connecting));
    assert_eq!(next(&mut rx).await, PushMessage::State(ConnectionState::Connected));
    match next(&mut rx).await {
        PushMessage::Auth(auth) => assert!(auth.accepted),
        other => panic!("expected auth result, got {other:?}"),
    }
    match next(&mut rx).await {
        PushMessage::Event(event) => {
            assert_eq!(event.change, ChangeKind::Created);
            assert_eq!(event.key(), ItemKey::task("t1"));
            assert_eq!(event.payload.unwrap().title(), "Hello");
        }
        other => panic!("expected created event, got {other:?}"),
    }
    match next(&mut rx).await {
        PushMessage::Event(event) => {
            assert_eq!(event.change, ChangeKind::Deleted);
            assert_eq!(event.item_id, "4");
        }
        other => panic!("expected deleted event, got {other:?}"),
    }
    assert_eq!(handle.state(), ConnectionState::Connected);

    wait_for_frame(&mut received, "3").await;
    wait_for_frame(&mut received, r#"42["heartbeat",{"board_id":"b1"}]"#).await;

    let state = handle.subscribe();
    let started = tokio::time::Instant::now();
    handle.stop().await;
    assert!(started.elapsed() <= STOP_TIMEOUT + Duration::from_millis(500));
    assert_eq!(*state.borrow(), ConnectionState::Disconnected);
    wait_for_frame(&mut received, "41").await;
}

#[tokio::test]
async fn rejected_credentials_end_in_auth_error() {
    let (base_url, _received) = start_board(Script::Talk).await;
    let (tx, mut rx) = mpsc::channel(32);
    let handle = PushChannel::start(config(&base_url, "wrong"), tx);

    assert_eq!(next(&mut rx).await, PushMessage::State(ConnectionState::Connecting));
    match next(&mut rx).await {
        PushMessage::State(ConnectionState::Error(reason)) => {
            assert!(reason.contains("invalid credentials"), "{reason}");
        }
        other => panic!("expected error state, got {other:?}"),
    }

    handle.stop().await;
    assert_eq!(next(&mut rx).await, PushMessage::State(ConnectionState::Disconnected));
}

#[tokio::test]
async fn silent_board_fails_liveness_check() {
    let (base_url, _received) = start_board(Script::Silent).await;
    let (tx, mut rx) = mpsc::channel(32);
    let handle = PushChannel::start(
        config(&base_url, "k1").with_heartbeat_interval(Duration::from_secs(60)),
        tx,
    );

    assert_eq!(next(&mut rx).await, PushMessage::State(ConnectionState::Connecting));
    assert_eq!(next(&mut rx).await, PushMessage::State(ConnectionState::Connected));
    assert!(matches!(
        next(&mut rx).await,
        PushMessage::State(ConnectionState::Error(_))
    ));
    // The session ends on its own after the error backoff.
    assert_eq!(next(&mut rx).await, PushMessage::State(ConnectionState::Disconnected));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(handle.is_finished());
}

#[tokio::test]
async fn unreachable_board_reports_error_then_disconnects() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (tx, mut rx) = mpsc::channel(32);
    let handle = PushChannel::start(config(&format!("http://{addr}"), "k1"), tx);

    assert_eq!(next(&mut rx).await, PushMessage::State(ConnectionState::Connecting));
    assert!(matches!(
        next(&mut rx).await,
        PushMessage::State(ConnectionState::Error(_))
    ));
    handle.stop().await;
}
