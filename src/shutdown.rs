use crate::sink::Sink;
use std::sync::Arc;
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Installs the best-effort process-exit hook: on SIGTERM or ctrl-c the
/// sink performs its final drain before the hosting process exits.
///
/// The returned handle completes once the drain finishes; the host can
/// await it before exiting.
pub fn install_shutdown_hook(sink: Arc<dyn Sink>) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received, draining sink");
        sink.shutdown().await;
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    match unix_signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                result = signal::ctrl_c() => {
                    if let Err(err) = result {
                        error!(error = %err, "failed to listen for SIGINT");
                    }
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM");
                }
            }
        }
        Err(err) => {
            error!(error = %err, "failed to install SIGTERM handler");
            if let Err(err) = signal::ctrl_c().await {
                error!(error = %err, "failed to listen for SIGINT");
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!(error = %err, "failed to listen for SIGINT");
    }
}
