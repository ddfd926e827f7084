//! HTTP surface: Solana Pay endpoint, metrics and health checks
//!
//! Routes:
//! - `GET|POST /api/mint` and `GET|POST /api/mint/{key}`
//! - `GET /metrics` (Prometheus text format)
//! - `GET /health`
//!
//! Every failure on the mint endpoint, including unsupported methods and
//! unreadable bodies, is answered with the 400 error payload so wallets
//! always receive something they can render.
//!
//! POST bodies must declare a `Content-Length` of at most 16 KiB. Chunked
//! bodies get 411 and oversized ones 413, both still carrying the error
//! payload.

use crate::metrics::metrics;
use crate::solana_pay::{ErrorResponse, Responder, TransactionRequest};
use anyhow::Result;
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};
use warp::http::StatusCode;
use warp::reject::{LengthRequired, PayloadTooLarge};
use warp::{Filter, Rejection, Reply};

/// Largest accepted POST body
const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn with_responder(
    responder: Arc<Responder>,
) -> impl Filter<Extract = (Arc<Responder>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&responder))
}

/// `/api/mint` with an optional item key segment
fn mint_path() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    let bare = warp::path!("api" / "mint").map(|| None);
    let keyed = warp::path!("api" / "mint" / String).map(Some);
    bare.or(keyed).unify()
}

fn json_reply<T: Serialize>(body: &T, status: StatusCode) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

async fn handle_display(
    key: Option<String>,
    query: HashMap<String, String>,
    responder: Arc<Responder>,
) -> Result<warp::reply::Response, Infallible> {
    let full = query.contains_key("full");
    Ok(match responder.display(key.as_deref(), full) {
        Ok(body) => json_reply(&body, StatusCode::OK),
        Err(_) => json_reply(&responder.error_response(), StatusCode::BAD_REQUEST),
    })
}

async fn handle_transaction(
    key: Option<String>,
    body: Bytes,
    responder: Arc<Responder>,
) -> Result<warp::reply::Response, Infallible> {
    // Unreadable bodies fall through as a missing account
    let request: TransactionRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
        debug!(error = %e, "Unparsable transaction request body");
        TransactionRequest::default()
    });

    Ok(
        match responder
            .transaction(key.as_deref(), request.account.as_deref())
            .await
        {
            Ok(body) => json_reply(&body, StatusCode::OK),
            Err(_) => json_reply(&responder.error_response(), StatusCode::BAD_REQUEST),
        },
    )
}

fn render_metrics() -> warp::reply::Response {
    let (body, status) = match metrics().render() {
        Ok(text) => (text, StatusCode::OK),
        Err(e) => (
            format!("failed to encode metrics: {}", e),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    };
    warp::reply::with_header(
        warp::reply::with_status(body, status),
        "content-type",
        "text/plain; version=0.0.4",
    )
    .into_response()
}

/// Build every route
pub fn routes(
    responder: Arc<Responder>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let display = mint_path()
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_responder(Arc::clone(&responder)))
        .and_then(handle_display);

    let transaction = mint_path()
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::bytes())
        .and(with_responder(Arc::clone(&responder)))
        .and_then(handle_transaction);

    let metrics_route = warp::path!("metrics").and(warp::get()).map(render_metrics);

    let health = warp::path!("health")
        .and(warp::get())
        .map(|| json_reply(&HealthResponse { status: "ok" }, StatusCode::OK));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_header("content-type");

    let icon = responder.icon().to_string();
    display
        .or(transaction)
        .unify()
        .or(metrics_route)
        .unify()
        .or(health)
        .unify()
        .with(cors)
        .recover(move |rejection: Rejection| {
            let icon = icon.clone();
            async move { Ok::<_, Infallible>(recover(rejection, &icon)) }
        })
        .with(warp::log::custom(|info| {
            debug!(
                method = %info.method(),
                path = %info.path(),
                status = info.status().as_u16(),
                elapsed_ms = info.elapsed().as_millis() as u64,
                "HTTP request"
            );
        }))
}

fn recover(rejection: Rejection, icon: &str) -> warp::reply::Response {
    let status = if rejection.is_not_found() {
        StatusCode::NOT_FOUND
    } else if rejection.find::<LengthRequired>().is_some() {
        StatusCode::LENGTH_REQUIRED
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        StatusCode::PAYLOAD_TOO_LARGE
    } else {
        StatusCode::BAD_REQUEST
    };
    debug!(?rejection, status = status.as_u16(), "Rejected request");
    if status != StatusCode::NOT_FOUND {
        metrics().record_failure("validation");
    }
    json_reply(&ErrorResponse::new(icon), status)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(responder: Arc<Responder>, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (bound, server) =
        warp::serve(routes(responder)).try_bind_with_graceful_shutdown(addr, shutdown)?;
    info!(addr = %bound, "Payment-request endpoint listening");
    server.await;
    info!("Endpoint server shut down gracefully");
    Ok(())
}
