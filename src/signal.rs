//! OS shutdown signals.

use tokio::signal;

/// Completes on Ctrl+C or, on unix, SIGTERM.
///
/// A signal whose handler cannot be installed is logged and never fires.
///
/// # Example
///
/// ```rust,no_run
/// use modrouter::{HttpTransport, signal::shutdown_signal};
///
/// # async fn run(transport: HttpTransport) -> modrouter::Result<()> {
/// transport.listen_until("0.0.0.0:8080", shutdown_signal()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
