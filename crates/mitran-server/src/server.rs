use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

use crate::routes::{build_router, AppState};

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn run_server(
    state: AppState,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Server shutting down signal received");
        })
        .await?;

    Ok(())
}
