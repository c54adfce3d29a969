use tokio::signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShutdownSignal {
    CtrlC,
    Terminate,
}

impl ShutdownSignal {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ShutdownSignal::CtrlC => "ctrl_c",
            ShutdownSignal::Terminate => "sigterm",
        }
    }
}

async fn ctrl_c() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Resolves on the first shutdown signal. In-flight requests (and their open
/// transactions) are drained by `axum::serve` afterwards.
pub(crate) async fn shutdown_signal() {
    let received = tokio::select! {
        _ = ctrl_c() => ShutdownSignal::CtrlC,
        _ = terminate() => ShutdownSignal::Terminate,
    };

    tracing::info!(signal = received.as_str(), "Shutdown signal received, draining requests");
}
