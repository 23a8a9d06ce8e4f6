//! OS signal handling for the host process.
//!
//! # Responsibilities
//! - Translate SIGTERM/SIGINT into a shutdown request
//! - Translate SIGHUP into a property reload request
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP never shuts the platform down
//! - Non-unix targets only observe Ctrl-C

use std::io;

/// What the host should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    Shutdown,
    Reload,
}

/// Wait for the next signal the host cares about.
#[cfg(unix)]
pub async fn next_signal() -> io::Result<HostSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("SIGINT received");
            Ok(HostSignal::Shutdown)
        }
        _ = terminate.recv() => {
            tracing::info!("SIGTERM received");
            Ok(HostSignal::Shutdown)
        }
        _ = hangup.recv() => {
            tracing::info!("SIGHUP received");
            Ok(HostSignal::Reload)
        }
    }
}

#[cfg(not(unix))]
pub async fn next_signal() -> io::Result<HostSignal> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl-C received");
    Ok(HostSignal::Shutdown)
}
