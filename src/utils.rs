//utils for graceful shutdown, shared by the binary and the simulation
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A token that is cancelled on ctrl-c. Must be called from within a tokio runtime.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let tc = token.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            // without a handler the run can only end on its own timer
            warn!("failed to install ctrl-c handler: {}", e);
            return;
        }
        info!("received ctrl-c, shutting down");
        tc.cancel();
    });
    token
}
