//! Axum router wiring.
//!
//! Mounts the SOAP endpoint (POST envelopes, GET `?wsdl`) on the configured
//! path, plus `/metrics`.

use axum::{routing::get, Router};

use crate::{app_state::AppState, transport};

pub fn build_router(state: AppState) -> Router {
    let path = state.cfg().server.path.clone();
    Router::new()
        .route(
            &path,
            get(transport::http::soap_get).post(transport::http::soap_post),
        )
        .route("/metrics", get(transport::http::metrics))
        .with_state(state)
}
