//! SOAP over HTTP handlers.
//!
//! Responsibilities:
//! - POST: read the body (bounded), run the request pipeline under the request timeout
//! - GET: `?wsdl` descriptor retrieval, anything else is a canned fault
//! - Always answer 200 with exactly one envelope; the body tells success from failure

use std::time::Duration;

use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;
use crate::transport::codec::{content_type, mime_headers, SoapReply};

// --------------------
// POST
// --------------------
pub async fn soap_post(State(app): State<AppState>, headers: HeaderMap, body: Body) -> Response {
    let pipeline = app.pipeline();
    let server = &app.cfg().server;

    let bytes = match axum::body::to_bytes(body, server.max_body_bytes).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "unable to read request body");
            return SoapReply(pipeline.unreadable_body()).into_response();
        }
    };

    let mime = mime_headers(&headers);
    tracing::debug!(headers = ?mime, "request headers");

    let timeout = Duration::from_millis(server.request_timeout_ms);
    let frame = match tokio::time::timeout(
        timeout,
        pipeline.process_post(bytes, content_type(&headers), &mime),
    )
    .await
    {
        Ok(frame) => frame,
        Err(_) => {
            tracing::error!(timeout_ms = server.request_timeout_ms, "request processing timed out");
            pipeline.timed_out()
        }
    };

    SoapReply(frame).into_response()
}

// --------------------
// GET
// --------------------
pub async fn soap_get(State(app): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let frame = app.pipeline().process_get(query.as_deref()).await;
    SoapReply(frame).into_response()
}

// --------------------
// Metrics
// --------------------
pub async fn metrics(State(app): State<AppState>) -> String {
    app.metrics().render()
}
