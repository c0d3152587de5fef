//! HTTP surface: the A2A route plus health and metrics endpoints

use crate::a2a::A2aAdapter;
use crate::observability::metrics;
use crate::protocol::protocol_timestamp;
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use warp::http::header::{HeaderMap, HeaderValue};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::Filter;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    agents: Vec<String>,
    timestamp: String,
}

/// CORS headers attached to every reply
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("Content-Type"),
    );
    headers
}

fn with_adapter(
    adapter: Arc<A2aAdapter>,
) -> impl Filter<Extract = (Arc<A2aAdapter>,), Error = Infallible> + Clone {
    warp::any().map(move || adapter.clone())
}

async fn handle_a2a(
    agent_id: String,
    body: Bytes,
    adapter: Arc<A2aAdapter>,
) -> Result<impl warp::Reply, Infallible> {
    let response = adapter.handle(&body, &agent_id).await;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok(warp::reply::with_status(
        warp::reply::json(&response.body),
        status,
    ))
}

#[derive(Debug, Serialize)]
struct RejectionBody {
    code: u16,
    message: &'static str,
}

/// JSON reply for a rejected request; mounted inside the CORS wrapper
async fn handle_rejection(err: warp::Rejection) -> Result<impl warp::Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large")
    } else {
        warn!(rejection = ?err, "Unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&RejectionBody {
            code: status.as_u16(),
            message,
        }),
        status,
    ))
}

/// All routes, ready to hand to `warp::serve` or `warp::test`
pub fn routes(
    adapter: Arc<A2aAdapter>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    let a2a = warp::path!("a2a" / "agent" / String)
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_adapter(adapter.clone()))
        .and_then(handle_a2a);

    let preflight = warp::path!("a2a" / "agent" / String)
        .and(warp::options())
        .map(|_agent_id: String| warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT));

    let health = warp::path!("health")
        .and(warp::get())
        .and(with_adapter(adapter))
        .map(|adapter: Arc<A2aAdapter>| {
            warp::reply::json(&HealthResponse {
                status: "healthy",
                agents: adapter.registry().ids(),
                timestamp: protocol_timestamp(),
            })
        });

    let metrics_route = warp::path!("metrics")
        .and(warp::get())
        .map(|| warp::reply::json(&metrics().snapshot()));

    a2a.or(preflight)
        .or(health)
        .or(metrics_route)
        .recover(handle_rejection)
        .with(warp::reply::with::headers(cors_headers()))
        .with(warp::trace::request())
}

/// Bind and serve until `shutdown` resolves
pub async fn serve(
    adapter: Arc<A2aAdapter>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), warp::Error> {
    let (bound, server) =
        warp::serve(routes(adapter)).try_bind_with_graceful_shutdown(addr, shutdown)?;
    info!(address = %bound, "HTTP server listening");
    server.await;
    info!("HTTP server stopped");
    Ok(())
}
