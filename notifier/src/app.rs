//! Application shell: owns the dispatcher and the background services.
//!
//! Configuration is immutable while services run. Applying new settings
//! means stop services, load a fresh [`ClientConfig`], hand it to the
//! dispatcher, start services again.

use std::sync::Arc;
use std::time::Duration;

use board_client::api::HeartbeatStatus;
use board_client::push::{PushChannel, PushHandle, PushMessage};
use board_client::{BoardApiClient, BoardError, ItemKey};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::background::{self, RefreshTrigger};
use crate::config::{ClientConfig, SettingsManager};
use crate::dispatcher::{AppMessage, Dispatcher, ShellStatus};
use crate::push_handler;
use crate::reconcile::{TaskAction, WindowSetReconciler};
use crate::window::WindowRenderer;

const QUEUE_CAPACITY: usize = 256;
const PUSH_QUEUE_CAPACITY: usize = 64;
/// Upper bound on waiting for a background task to notice cancellation.
const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Tasks tied to one configuration.
struct Services {
    token: CancellationToken,
    push: Option<PushSession>,
    tasks: Vec<JoinHandle<()>>,
    api: BoardApiClient,
}

/// A push channel and the task forwarding its messages; replaced together.
struct PushSession {
    handle: PushHandle,
    forwarder: JoinHandle<()>,
}

impl PushSession {
    async fn stop(self) {
        self.handle.stop().await;
        // The forwarder ends once the channel task drops its sender.
        join_or_abort(self.forwarder, "Push forwarder").await;
    }
}

pub struct AppShell {
    settings: SettingsManager,
    config: Arc<ClientConfig>,
    tx: mpsc::Sender<AppMessage>,
    status_rx: watch::Receiver<ShellStatus>,
    refresh: RefreshTrigger,
    services: Option<Services>,
    dispatcher: JoinHandle<()>,
}

impl AppShell {
    /// Load the configuration, spawn the dispatcher and start services.
    pub async fn start(
        settings: SettingsManager,
        renderer: Box<dyn WindowRenderer>,
    ) -> Result<Self, anyhow::Error> {
        let config = Arc::new(ClientConfig::load(&settings)?);
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let reconciler = WindowSetReconciler::new(renderer, config.reconciler_settings());
        let (dispatcher, status_rx) = Dispatcher::new(reconciler, rx, tx.clone());
        let dispatcher = tokio::spawn(dispatcher.run());

        let mut shell = Self {
            settings,
            config,
            tx,
            status_rx,
            refresh: RefreshTrigger::new(),
            services: None,
            dispatcher,
        };
        shell.start_services().await?;
        Ok(shell)
    }

    pub fn handle(&self) -> ShellHandle {
        ShellHandle {
            tx: self.tx.clone(),
            refresh: self.refresh.clone(),
        }
    }

    pub fn status(&self) -> ShellStatus {
        self.status_rx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ShellStatus> {
        self.status_rx.clone()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn settings(&self) -> &SettingsManager {
        &self.settings
    }

    /// Stop services, reload settings and start again.
    pub async fn reconfigure(&mut self) -> Result<(), anyhow::Error> {
        tracing::info!("Reconfiguring");
        self.stop_services().await;
        self.config = Arc::new(ClientConfig::load(&self.settings)?);
        self.start_services().await
    }

    /// Replace the push session, e.g. after it ended with an error.
    pub async fn reconnect_push(&mut self) -> Result<(), anyhow::Error> {
        let Some(services) = self.services.as_mut() else {
            anyhow::bail!("board is not configured");
        };
        if let Some(old) = services.push.take() {
            old.stop().await;
        }
        services.push = Some(spawn_push(&self.config, &services.api, &self.tx, &self.refresh));
        tracing::info!("Push channel restarted");
        Ok(())
    }

    /// One API heartbeat against candidate settings.
    pub async fn test_connection(config: &ClientConfig) -> Result<HeartbeatStatus, BoardError> {
        let api = config.api_client()?;
        api.heartbeat().await
    }

    /// Stop everything and close all windows.
    pub async fn shutdown(mut self) {
        tracing::info!("Shutdown sequence started");
        self.stop_services().await;
        let _ = self.tx.send(AppMessage::Shutdown).await;
        join_or_abort(self.dispatcher, "Dispatcher").await;
        tracing::info!("Shutdown sequence completed");
    }

    async fn start_services(&mut self) -> Result<(), anyhow::Error> {
        let api = if self.config.is_board_configured() {
            match self.config.api_client() {
                Ok(api) => Some(api),
                Err(e) => {
                    tracing::warn!(error = %e, "Board settings are invalid, staying idle");
                    None
                }
            }
        } else {
            tracing::info!("Board not configured, staying idle");
            None
        };

        self.tx
            .send(AppMessage::Configure {
                api: api.clone(),
                config: self.config.clone(),
            })
            .await
            .map_err(|_| anyhow::anyhow!("dispatcher is not running"))?;

        let Some(api) = api else {
            return Ok(());
        };

        let token = CancellationToken::new();
        let tasks = vec![
            tokio::spawn(background::polling_loop(
                api.clone(),
                self.config.poll_interval,
                self.refresh.clone(),
                self.tx.clone(),
                token.clone(),
            )),
            tokio::spawn(background::heartbeat_loop(
                api.clone(),
                self.config.heartbeat_interval,
                self.tx.clone(),
                token.clone(),
            )),
        ];
        let push = spawn_push(&self.config, &api, &self.tx, &self.refresh);

        tracing::info!(base_url = api.base_url(), "Services started");
        self.services = Some(Services {
            token,
            push: Some(push),
            tasks,
            api,
        });
        Ok(())
    }

    async fn stop_services(&mut self) {
        let Some(services) = self.services.take() else {
            return;
        };
        services.token.cancel();
        if let Some(push) = services.push {
            push.stop().await;
        }
        for task in services.tasks {
            join_or_abort(task, "Background task").await;
        }
        tracing::info!("Services stopped");
    }
}

fn spawn_push(
    config: &ClientConfig,
    api: &BoardApiClient,
    tx: &mpsc::Sender<AppMessage>,
    refresh: &RefreshTrigger,
) -> PushSession {
    let (push_tx, push_rx) = mpsc::channel::<PushMessage>(PUSH_QUEUE_CAPACITY);
    let handle = PushChannel::start(config.push_config(api), push_tx);
    let refresh = config.refresh_on_push.then(|| refresh.clone());
    let forwarder = tokio::spawn(push_handler::forward(push_rx, tx.clone(), refresh));
    PushSession { handle, forwarder }
}

async fn join_or_abort(mut task: JoinHandle<()>, name: &str) {
    if tokio::time::timeout(TASK_STOP_TIMEOUT, &mut task).await.is_err() {
        tracing::warn!(task = name, "Task did not stop in time, aborting it");
        task.abort();
    }
}

/// Cloneable entry point for UI code: window buttons, tray menu, and similar.
#[derive(Clone)]
pub struct ShellHandle {
    tx: mpsc::Sender<AppMessage>,
    refresh: RefreshTrigger,
}

impl ShellHandle {
    pub async fn acknowledge(&self, key: ItemKey) -> Result<(), BoardError> {
        self.action(key, TaskAction::Acknowledge).await
    }

    pub async fn complete(&self, key: ItemKey) -> Result<(), BoardError> {
        self.action(key, TaskAction::Complete).await
    }

    async fn action(&self, key: ItemKey, action: TaskAction) -> Result<(), BoardError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let msg = AppMessage::UserAction {
            key,
            action,
            reply: Some(reply_tx),
        };
        let stopped = || BoardError::StateConflict("notifier is shutting down".into());
        self.tx.send(msg).await.map_err(|_| stopped())?;
        reply_rx.await.map_err(|_| stopped())?
    }

    /// Report that the user closed a window.
    pub async fn window_closed(&self, key: ItemKey) {
        let _ = self.tx.send(AppMessage::WindowClosed(key)).await;
    }

    /// Ask for an immediate full refresh.
    pub fn refresh(&self) {
        self.refresh.request();
    }
}
