use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Install a handler that cancels the returned token on SIGTERM or SIGINT.
///
/// Cancellation is the dispatch loop's only way out besides claiming a slot;
/// it has no cooperative termination of its own.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, abandoning dispatch");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, abandoning dispatch");
            }
        }

        token_clone.cancel();
    });

    token
}
