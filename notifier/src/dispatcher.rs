//! Single owner of the window set.
//!
//! Every producer (push channel, polling loop, heartbeat loop, user actions)
//! posts an [`AppMessage`]; the dispatcher applies them one at a time to the
//! [`WindowSetReconciler`], so the renderer is only ever driven from here.

use std::sync::Arc;

use board_client::api::{Ack, HeartbeatStatus};
use board_client::push::{ConnectionState, PushMessage};
use board_client::{BoardApiClient, BoardError, DomainItem, ItemKey};
use chrono::NaiveDateTime;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::ClientConfig;
use crate::notification;
use crate::reconcile::{TaskAction, WindowSetReconciler};

pub type ActionReply = oneshot::Sender<Result<(), BoardError>>;

/// Everything the dispatcher reacts to.
#[derive(Debug)]
pub enum AppMessage {
    /// Authoritative item list from the polling loop.
    FullResync {
        items: Vec<DomainItem>,
        fetched_at: NaiveDateTime,
    },
    PollFailed(BoardError),
    Heartbeat(Result<HeartbeatStatus, BoardError>),
    Push(PushMessage),
    /// Button press on a task window.
    UserAction {
        key: ItemKey,
        action: TaskAction,
        reply: Option<ActionReply>,
    },
    /// Network result of a [`AppMessage::UserAction`].
    ActionFinished {
        /// Configuration generation the action was sent under.
        generation: u64,
        key: ItemKey,
        action: TaskAction,
        result: Result<Ack, BoardError>,
        reply: Option<ActionReply>,
    },
    /// The user closed a window on screen.
    WindowClosed(ItemKey),
    /// New configuration; `api` is `None` when the board is not configured.
    Configure {
        api: Option<BoardApiClient>,
        config: Arc<ClientConfig>,
    },
    Shutdown,
}

/// Connectivity snapshot published for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellStatus {
    pub board_configured: bool,
    #[serde(serialize_with = "serialize_state")]
    pub connection: ConnectionState,
    pub last_poll: Option<NaiveDateTime>,
    pub last_poll_error: Option<String>,
    pub heartbeat_ok: Option<bool>,
    pub visible: usize,
}

impl Default for ShellStatus {
    fn default() -> Self {
        Self {
            board_configured: false,
            connection: ConnectionState::Disconnected,
            last_poll: None,
            last_poll_error: None,
            heartbeat_ok: None,
            visible: 0,
        }
    }
}

fn serialize_state<S: serde::Serializer>(
    state: &ConnectionState,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(state)
}

pub struct Dispatcher {
    reconciler: WindowSetReconciler,
    api: Option<BoardApiClient>,
    rx: mpsc::Receiver<AppMessage>,
    /// Used by spawned action tasks to report back.
    tx: mpsc::Sender<AppMessage>,
    status_tx: watch::Sender<ShellStatus>,
    /// Set after the first failure of a streak so it is reported once.
    poll_failing: bool,
    /// Bumped on every `Configure`; results of older actions are stale.
    generation: u64,
}

impl Dispatcher {
    pub fn new(
        reconciler: WindowSetReconciler,
        rx: mpsc::Receiver<AppMessage>,
        tx: mpsc::Sender<AppMessage>,
    ) -> (Self, watch::Receiver<ShellStatus>) {
        let (status_tx, status_rx) = watch::channel(ShellStatus::default());
        let dispatcher = Self {
            reconciler,
            api: None,
            rx,
            tx,
            status_tx,
            poll_failing: false,
            generation: 0,
        };
        (dispatcher, status_rx)
    }

    /// Process messages until [`AppMessage::Shutdown`] or until every sender is gone.
    pub async fn run(mut self) {
        tracing::info!("Dispatcher started");
        while let Some(msg) = self.rx.recv().await {
            if !self.handle(msg) {
                break;
            }
        }
        self.reconciler.close_all();
        self.publish_visible();
        tracing::info!("Dispatcher stopped");
    }

    /// Apply one message. Returns `false` when the dispatcher should stop.
    fn handle(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::FullResync { items, fetched_at } => {
                self.reconciler.full_resync(&items, fetched_at);
                if self.poll_failing {
                    tracing::info!("Polling recovered");
                }
                self.poll_failing = false;
                self.status_tx.send_modify(|s| {
                    s.last_poll = Some(fetched_at);
                    s.last_poll_error = None;
                });
            }
            AppMessage::PollFailed(e) => {
                if !self.poll_failing {
                    self.reconciler
                        .notify(&notification::error_notice("Refresh failed", &e));
                    self.poll_failing = true;
                }
                self.status_tx
                    .send_modify(|s| s.last_poll_error = Some(e.to_string()));
            }
            AppMessage::Heartbeat(result) => {
                let ok = matches!(result, Ok(HeartbeatStatus { success: true, .. }));
                self.status_tx.send_modify(|s| s.heartbeat_ok = Some(ok));
            }
            AppMessage::Push(msg) => self.on_push(msg),
            AppMessage::UserAction { key, action, reply } => self.on_user_action(key, action, reply),
            AppMessage::ActionFinished {
                generation,
                key,
                action,
                result,
                reply,
            } => {
                if generation == self.generation {
                    self.on_action_finished(key, action, result, reply);
                } else {
                    tracing::info!(
                        %key,
                        action = action.as_str(),
                        "Dropping result from a previous configuration"
                    );
                    if let Some(reply) = reply {
                        let _ = reply.send(result.map(|_| ()));
                    }
                }
            }
            AppMessage::WindowClosed(key) => self.reconciler.window_closed(&key),
            AppMessage::Configure { api, config } => {
                tracing::info!(configured = api.is_some(), "Applying configuration");
                self.api = api;
                self.poll_failing = false;
                self.generation += 1;
                self.reconciler.reconfigure(config.reconciler_settings());
                let configured = self.api.is_some();
                self.status_tx.send_modify(|s| {
                    *s = ShellStatus {
                        board_configured: configured,
                        ..ShellStatus::default()
                    }
                });
            }
            AppMessage::Shutdown => return false,
        }
        self.publish_visible();
        true
    }

    fn on_push(&mut self, msg: PushMessage) {
        match msg {
            PushMessage::State(state) => {
                self.reconciler.connectivity(&state);
                self.status_tx.send_modify(|s| s.connection = state);
            }
            PushMessage::Auth(auth) if auth.accepted => {
                tracing::info!(status = %auth.status, "Push channel authenticated");
            }
            PushMessage::Auth(auth) => {
                let reason = auth.message.unwrap_or(auth.status);
                tracing::warn!(%reason, "Push channel authentication rejected");
                self.reconciler.notify(&notification::error_notice(
                    "Push connection rejected",
                    &BoardError::Auth(reason),
                ));
            }
            PushMessage::Event(event) => {
                tracing::debug!(key = %event.key(), change = ?event.change, "Push event");
                self.reconciler.apply_event(&event, local_now());
            }
        }
    }

    fn on_user_action(&mut self, key: ItemKey, action: TaskAction, reply: Option<ActionReply>) {
        let checked = self.reconciler.check_action(&key, action).and_then(|()| {
            self.api
                .clone()
                .ok_or_else(|| BoardError::Config("board is not configured".into()))
        });
        let api = match checked {
            Ok(api) => api,
            Err(e) => {
                tracing::warn!(%key, action = action.as_str(), error = %e, "Action rejected");
                self.fail_action(action, &e);
                if let Some(reply) = reply {
                    let _ = reply.send(Err(e));
                }
                return;
            }
        };

        tracing::info!(%key, action = action.as_str(), "Sending task action");
        let tx = self.tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let result = match action {
                TaskAction::Acknowledge => api.acknowledge(&key.id).await,
                TaskAction::Complete => api.complete(&key.id).await,
            };
            let _ = tx
                .send(AppMessage::ActionFinished {
                    generation,
                    key,
                    action,
                    result,
                    reply,
                })
                .await;
        });
    }

    fn on_action_finished(
        &mut self,
        key: ItemKey,
        action: TaskAction,
        result: Result<Ack, BoardError>,
        reply: Option<ActionReply>,
    ) {
        let outcome = match result {
            Ok(_) => {
                tracing::info!(%key, action = action.as_str(), "Task action succeeded");
                self.reconciler.action_succeeded(&key, action, local_now());
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%key, action = action.as_str(), error = %e, "Task action failed");
                self.fail_action(action, &e);
                Err(e)
            }
        };
        if let Some(reply) = reply {
            let _ = reply.send(outcome);
        }
    }

    fn fail_action(&mut self, action: TaskAction, error: &BoardError) {
        let context = format!("Could not {} task", action.as_str());
        self.reconciler
            .notify(&notification::error_notice(&context, error));
    }

    fn publish_visible(&self) {
        let visible = self.reconciler.len();
        self.status_tx.send_if_modified(|s| {
            let changed = s.visible != visible;
            s.visible = visible;
            changed
        });
    }
}

/// Board timestamps are local wall-clock times.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
