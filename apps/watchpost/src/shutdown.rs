use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Resolve on SIGINT/SIGTERM (Ctrl-C elsewhere) and raise `stop`.
pub async fn shutdown_signal(stop: Arc<AtomicBool>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("shutdown signal received (SIGTERM)"),
                    _ = sigint.recv() => tracing::info!("shutdown signal received (SIGINT)"),
                }
            }
            _ => {
                tracing::warn!("unix signal handlers unavailable; falling back to Ctrl-C");
                wait_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_ctrl_c().await;

    stop.store(true, Ordering::Relaxed);
}

async fn wait_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received (Ctrl-C)"),
        Err(err) => {
            tracing::warn!(%err, "failed to listen for Ctrl-C; stop with the frame limit");
            std::future::pending::<()>().await;
        }
    }
}
