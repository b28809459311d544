pub mod cors;
pub mod handler;

use std::future::Future;

use axum::{extract::Request, middleware::Next, response::Response, Router};
use tokio::net::TcpListener;

pub use handler::build_router;

/// Access log line per request.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::info!(target: "http_access", "{} {} {}", method, uri, response.status());
    response
}

pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    match listener.local_addr() {
        Ok(addr) => tracing::info!("Print agent listening on http://{addr}"),
        Err(e) => tracing::warn!("Print agent listening (address unknown: {e})"),
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
