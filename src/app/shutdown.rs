//! Graceful shutdown handling.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancels `cancel` on the first Ctrl-C.
///
/// In-flight sites then wind down to `ABORTED` and are still exported. The
/// listener ends on its own once the token is cancelled by anyone else.
pub fn spawn_interrupt_listener(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    log::warn!("Interrupt received, cancelling batch (partial results are kept)");
                    cancel.cancel();
                }
                Err(e) => log::warn!("Failed to listen for Ctrl-C: {e}"),
            },
        }
    })
}

/// Stops the interrupt listener and waits for it to exit.
pub async fn shutdown_gracefully(listener: JoinHandle<()>) {
    listener.abort();
    let _ = listener.await;
}
