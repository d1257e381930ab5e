use crate::error::P0fSynError;
use crate::metrics::SynMetrics;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

const TEXT_FORMAT: &str = "text/plain; version=0.0.4";

/// Serves `GET /metrics` until the listener fails to bind.
pub async fn serve_metrics(addr: SocketAddr, metrics: Arc<SynMetrics>) -> Result<(), P0fSynError> {
    let listener = TcpListener::bind(addr).await?;
    info!(?addr, "Metrics server started");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Metrics server: accept error");
                continue;
            }
        };

        let metrics = metrics.clone();
        tokio::spawn(async move {
            let svc = service_fn(move |req: Request<Incoming>| {
                let metrics = metrics.clone();
                async move { Ok::<_, Infallible>(metrics_response(req.uri().path(), &metrics)) }
            });

            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), svc)
                .await
            {
                warn!(?peer, error = %e, "Metrics server: serve_connection error");
            }
        });
    }
}

/// Runs [`serve_metrics`] on a dedicated thread with its own runtime.
pub fn spawn_metrics_server(
    addr: SocketAddr,
    metrics: Arc<SynMetrics>,
) -> Result<thread::JoinHandle<()>, P0fSynError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;

    let handle = thread::Builder::new()
        .name("p0f-metrics".to_string())
        .spawn(move || {
            if let Err(e) = runtime.block_on(serve_metrics(addr, metrics)) {
                error!("Metrics server stopped: {}", e);
            }
        })?;

    Ok(handle)
}

/// Response for one request path.
pub fn metrics_response(path: &str, metrics: &SynMetrics) -> Response<Full<Bytes>> {
    if path != "/metrics" {
        return text_response(StatusCode::NOT_FOUND, "Not Found".to_string());
    }

    match metrics.render() {
        Ok(body) => text_response(StatusCode::OK, body),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            )
        }
    }
}

fn text_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_FORMAT));
    response
}
