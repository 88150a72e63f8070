//! Server setup with graceful shutdown

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::create_app;
use crate::state::AppState;

/// Run the server until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run_server(config: &ServerConfig, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Map sync server listening on {}", listener.local_addr()?);

    serve(listener, state, config.shutdown_timeout, shutdown_signal()).await
}

/// Serve on a bound listener until `signal` resolves.
///
/// In-flight requests get `drain_timeout` to finish; connections still open
/// after that are dropped.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    drain_timeout: Duration,
    signal: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_app(state);

    let draining = Arc::new(Notify::new());
    let started = draining.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        signal.await;
        info!("Shutting down the API server");
        started.notify_one();
    });

    let deadline = async move {
        draining.notified().await;
        tokio::time::sleep(drain_timeout).await;
    };

    tokio::select! {
        result = server.into_future() => result,
        () = deadline => {
            warn!(timeout_secs = drain_timeout.as_secs(), "Drain timeout elapsed, dropping open connections");
            Ok(())
        }
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
