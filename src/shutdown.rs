use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

use crate::scheduler::Scheduler;

/// Install a shutdown handler that listens for SIGTERM and SIGINT.
///
/// On either signal the scheduler is shut down (bots cancelled, queue closed)
/// and the returned token is cancelled so the command reader can stop.
pub fn install_shutdown_handler(scheduler: Arc<Scheduler>) -> std::io::Result<CancellationToken> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
            _ = token_clone.cancelled() => return,
        }

        scheduler.shutdown().await;
        token_clone.cancel();
    });

    Ok(token)
}
