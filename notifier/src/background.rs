//! Background task loops: authoritative polling and API heartbeat.

use std::sync::Arc;
use std::time::{Duration, Instant};

use board_client::BoardApiClient;
use tokio::sync::{Notify, mpsc};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::AppMessage;

/// Scheduling granularity of the polling loop.
pub const POLL_TICK: Duration = Duration::from_secs(1);
/// Wait before retrying a failed poll.
pub const FAILURE_RETRY_DELAY: Duration = Duration::from_secs(5);

pub(crate) async fn sleep_or_cancel(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}

/// Wakes the polling loop early, e.g. after a push event.
#[derive(Clone, Default)]
pub struct RefreshTrigger {
    notify: Arc<Notify>,
}

impl RefreshTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.notify.notify_one();
    }

    async fn requested(&self) {
        self.notify.notified().await;
    }
}

/// Periodically fetch every item and hand the list to the dispatcher.
///
/// The first fetch happens immediately. After that a fetch is due when
/// `interval` has passed since the last success, when the last attempt
/// failed at least [`FAILURE_RETRY_DELAY`] ago, or when a refresh is
/// requested.
pub async fn polling_loop(
    api: BoardApiClient,
    interval: Duration,
    refresh: RefreshTrigger,
    tx: mpsc::Sender<AppMessage>,
    token: CancellationToken,
) {
    let mut last_success: Option<Instant> = None;
    let mut last_failure: Option<Instant> = None;
    let mut requested = true;

    loop {
        let due = requested
            || match (last_success, last_failure) {
                (_, Some(failed)) => failed.elapsed() >= FAILURE_RETRY_DELAY,
                (Some(ok), None) => ok.elapsed() >= interval,
                (None, None) => true,
            };

        if due {
            requested = false;
            let result = tokio::select! {
                _ = token.cancelled() => break,
                result = api.fetch_all(None) => result,
            };
            match result {
                Ok(items) => {
                    tracing::debug!(count = items.len(), "Poll succeeded");
                    last_success = Some(Instant::now());
                    last_failure = None;
                    let msg = AppMessage::FullResync {
                        items,
                        fetched_at: chrono::Local::now().naive_local(),
                    };
                    if tx.send(msg).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Poll failed");
                    last_failure = Some(Instant::now());
                    if tx.send(AppMessage::PollFailed(e)).await.is_err() {
                        break;
                    }
                }
            }
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = refresh.requested() => requested = true,
            _ = sleep(POLL_TICK) => {}
        }
    }
    tracing::info!("Polling loop stopped");
}

/// Periodic API heartbeat. Results go to the dispatcher; no retry.
pub async fn heartbeat_loop(
    api: BoardApiClient,
    interval: Duration,
    tx: mpsc::Sender<AppMessage>,
    token: CancellationToken,
) {
    loop {
        let result = tokio::select! {
            _ = token.cancelled() => break,
            result = api.heartbeat() => result,
        };
        match &result {
            Ok(status) => tracing::debug!(success = status.success, "Heartbeat sent"),
            Err(e) => tracing::warn!(error = %e, "Heartbeat failed"),
        }
        if tx.send(AppMessage::Heartbeat(result)).await.is_err() {
            break;
        }
        if sleep_or_cancel(&token, interval).await {
            break;
        }
    }
    tracing::info!("Heartbeat loop stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::extract::State;
    use axum::routing::{get, post};
    use serde_json::json;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use super::*;

    const LONG_INTERVAL: Duration = Duration::from_secs(60);

    async fn serve_board(hits: Arc<AtomicUsize>) -> BoardApiClient {
        let app = Router::new()
            .route(
                "/api/whiteboard/all",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    axum::Json(json!({"success": true, "data": [
                        {"id": "t1", "type": "task", "title": "Sweep"}
                    ]}))
                }),
            )
            .route(
                "/api/whiteboard/heartbeat",
                post(|| async { axum::Json(json!({"success": true, "message": "alive"})) }),
            )
            .with_state(hits);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        BoardApiClient::configure(&addr.to_string(), "b1", "k1").unwrap()
    }

    async fn unreachable_board() -> BoardApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        BoardApiClient::configure(&addr.to_string(), "b1", "k1").unwrap()
    }

    async fn next(rx: &mut mpsc::Receiver<AppMessage>, within: Duration) -> AppMessage {
        timeout(within, rx.recv())
            .await
            .expect("no message in time")
            .expect("queue closed")
    }

    async fn assert_stops(handle: JoinHandle<()>, token: &CancellationToken, within: Duration) {
        token.cancel();
        timeout(within, handle)
            .await
            .expect("loop did not stop in time")
            .unwrap();
    }

    #[tokio::test]
    async fn polling_loop_polls_immediately_and_stops_within_a_tick() {
        let api = serve_board(Arc::new(AtomicUsize::new(0))).await;
        let (tx, mut rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let handle = tokio::spawn(polling_loop(
            api,
            LONG_INTERVAL,
            RefreshTrigger::new(),
            tx,
            token.clone(),
        ));

        match next(&mut rx, Duration::from_secs(3)).await {
            AppMessage::FullResync { items, .. } => assert_eq!(items.len(), 1),
            other => panic!("unexpected message: {other:?}"),
        }
        assert_stops(handle, &token, POLL_TICK).await;
    }

    #[tokio::test]
    async fn refresh_request_polls_early() {
        let hits = Arc::new(AtomicUsize::new(0));
        let api = serve_board(hits.clone()).await;
        let refresh = RefreshTrigger::new();
        let (tx, mut rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let handle = tokio::spawn(polling_loop(
            api,
            LONG_INTERVAL,
            refresh.clone(),
            tx,
            token.clone(),
        ));

        assert!(matches!(
            next(&mut rx, Duration::from_secs(3)).await,
            AppMessage::FullResync { .. }
        ));
        refresh.request();
        assert!(matches!(
            next(&mut rx, Duration::from_secs(3)).await,
            AppMessage::FullResync { .. }
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_stops(handle, &token, POLL_TICK).await;
    }

    #[tokio::test]
    async fn failed_poll_is_reported_and_retried() {
        let api = unreachable_board().await;
        let (tx, mut rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let handle = tokio::spawn(polling_loop(
            api,
            LONG_INTERVAL,
            RefreshTrigger::new(),
            tx,
            token.clone(),
        ));

        assert!(matches!(
            next(&mut rx, Duration::from_secs(3)).await,
            AppMessage::PollFailed(_)
        ));
        let started = Instant::now();
        assert!(matches!(
            next(&mut rx, FAILURE_RETRY_DELAY + Duration::from_secs(3)).await,
            AppMessage::PollFailed(_)
        ));
        assert!(started.elapsed() >= FAILURE_RETRY_DELAY - POLL_TICK);
        assert_stops(handle, &token, POLL_TICK).await;
    }

    #[tokio::test]
    async fn heartbeat_loop_reports_and_stops_promptly() {
        let api = serve_board(Arc::new(AtomicUsize::new(0))).await;
        let (tx, mut rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let handle = tokio::spawn(heartbeat_loop(api, LONG_INTERVAL, tx, token.clone()));

        match next(&mut rx, Duration::from_secs(3)).await {
            AppMessage::Heartbeat(Ok(status)) => assert!(status.success),
            other => panic!("unexpected message: {other:?}"),
        }
        assert_stops(handle, &token, Duration::from_millis(500)).await;
    }

    #[tokio::test]
    async fn sleep_or_cancel_returns_on_cancel() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(sleep_or_cancel(&token, LONG_INTERVAL).await);
        assert!(!sleep_or_cancel(&CancellationToken::new(), Duration::from_millis(1)).await);
    }
}
