//! HTTP front end for jardoc.
//!
//! [`RequestRouter`] turns `/<version>/<path>` requests into reads from the cached
//! javadoc archive for that version; [`serve`] runs it behind a hyper accept loop until
//! a [`CancellationToken`] fires.

mod files;
mod path;
mod range;
mod response;
mod router;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub use router::{RequestRouter, DEFAULT_FETCH_TIMEOUT, MAX_BROWSER_CACHE};

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to prepare listener: {0}")]
    Listener(#[from] std::io::Error),
    #[error("http server error: {0}")]
    Http(#[from] hyper::Error),
}

/// Serve `router` on `listener` until `shutdown` is cancelled, then drain in-flight
/// requests and return.
pub async fn serve(
    listener: std::net::TcpListener,
    router: Arc<RequestRouter>,
    shutdown: CancellationToken,
) -> Result<(), ServeError> {
    listener.set_nonblocking(true)?;
    let local_addr = listener.local_addr()?;

    let make_svc = make_service_fn(move |conn: &AddrStream| {
        let router = Arc::clone(&router);
        let remote = conn.remote_addr();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let router = Arc::clone(&router);
                async move { Ok::<_, Infallible>(handle(router, remote, req).await) }
            }))
        }
    });

    tracing::info!(target = "jardoc.server", addr = %local_addr, "listening");
    Server::from_tcp(listener)?
        .serve(make_svc)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    tracing::info!(target = "jardoc.server", addr = %local_addr, "server stopped");
    Ok(())
}

async fn handle(
    router: Arc<RequestRouter>,
    remote: SocketAddr,
    request: hyper::Request<hyper::Body>,
) -> hyper::Response<hyper::Body> {
    let span = tracing::info_span!(
        target: "jardoc.server",
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        %remote,
    );
    async move {
        let started = std::time::Instant::now();
        let response = router.handle(request).await;
        tracing::info!(
            target = "jardoc.server",
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "handled request"
        );
        response
    }
    .instrument(span)
    .await
}
