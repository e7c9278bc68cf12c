//! Listener setup and graceful shutdown.

use std::future::Future;

use chainwatch_core::QueryFacade;

use crate::routes::router;

/// Bind `addr` and serve the API until `shutdown` completes.
pub async fn serve<F>(addr: &str, facade: QueryFacade, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP API listening");

    axum::serve(listener, router(facade))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("HTTP API stopped");
    Ok(())
}
