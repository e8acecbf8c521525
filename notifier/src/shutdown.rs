//! Process signal handling.

/// What the process was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Ctrl+C or SIGTERM.
    Terminate,
    /// SIGHUP: reload settings and restart services.
    Reload,
}

#[cfg(unix)]
pub async fn wait_for_signal() -> ShutdownSignal {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    fn install(kind: SignalKind, name: &str) -> Option<Signal> {
        match signal(kind) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!("Failed to install {name} handler: {e}");
                None
            }
        }
    }

    async fn recv(signal: &mut Option<Signal>) {
        match signal {
            Some(s) => {
                s.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    let mut terminate = install(SignalKind::terminate(), "SIGTERM");
    let mut hangup = install(SignalKind::hangup(), "SIGHUP");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => ShutdownSignal::Terminate,
        _ = recv(&mut terminate) => ShutdownSignal::Terminate,
        _ = recv(&mut hangup) => ShutdownSignal::Reload,
    }
}

#[cfg(not(unix))]
pub async fn wait_for_signal() -> ShutdownSignal {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    ShutdownSignal::Terminate
}
