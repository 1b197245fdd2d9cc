use crate::config::Config;
use crate::error::StockError;
use crate::router::{StockState, stock_router};
use crate::service::StockConnectionManager;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Open the shared connection, serve until a shutdown signal, then close it.
pub async fn run(cfg: &Config, manager: Arc<StockConnectionManager>) -> Result<(), StockError> {
    run_until(cfg, manager, shutdown_signal()).await
}

/// Like [`run`], stopping when `shutdown` completes.
///
/// A failed open aborts startup before anything is bound. A failed close is
/// logged and shutdown carries on.
pub async fn run_until<F>(
    cfg: &Config,
    manager: Arc<StockConnectionManager>,
    shutdown: F,
) -> Result<(), StockError>
where
    F: Future<Output = ()> + Send + 'static,
{
    manager.open().await?;

    let state = StockState::new(Arc::clone(&manager));
    let app = stock_router(state);

    let addr = cfg.server.bind_addr();
    let served = match TcpListener::bind(&addr).await {
        Ok(listener) => {
            info!("HTTP server listening on {}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = manager.close().await {
        error!(error = %e, "failed to release database connection during shutdown");
    }
    served?;
    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
