//! Cross-platform OS signal handling.
//!
//! Provides [`wait_for_shutdown_signal`], an async helper that completes
//! when the process receives a termination signal. Used by
//! [`EventRouter::run_until_signal`](crate::EventRouter::run_until_signal)
//! to trigger the same graceful shutdown a direct `shutdown()` call would.
//!
//! ## Signals
//! **Unix:** `SIGINT` (Ctrl-C), `SIGTERM` (systemd/Kubernetes),
//! `SIGQUIT`. **Other platforms:** Ctrl-C via [`tokio::signal::ctrl_c`].

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners. Returns `Ok(())` when
/// any signal is received, or `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners. Returns `Ok(())` when
/// any signal is received, or `Err` if signal registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
