//! Signal handling for graceful server shutdown.

use tokio::signal;
use tracing::info;

/// Waits until the process is asked to terminate.
///
/// Handles SIGINT and SIGTERM on Unix and Ctrl+C on Windows.
pub async fn setup_signal_handlers() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("📡 Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("📡 Received SIGTERM");
            }
        }
    }

    #[cfg(windows)]
    {
        signal::ctrl_c().await?;
        info!("📡 Received Ctrl+C");
    }

    Ok(())
}
