//! End-to-end HTTP tests through the axum router.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]


use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use soapwire_core::protocol::envelope::check_namespaces;
use soapwire_core::protocol::fault::{
    MSG_GET_NOT_SUPPORTED, MSG_INTERNAL_ERROR, MSG_INVALID_MESSAGE,
};
use soapwire_core::{Envelope, FaultDescriptor, ServiceRequest, ServiceResponse};
use soapwire_server::config::{self, AdapterConfig};
use soapwire_server::services::EchoService;
use soapwire_server::{app_state::AppState, router, HandlerError, ServiceHandler};

use fixtures::{MemoryStore, ECHO_REQUEST, SCOPED_NS_REQUEST, WSDL_DOCUMENT};

fn app(cfg: AdapterConfig, handler: Arc<dyn ServiceHandler>) -> Router {
    let state =
        AppState::with_store(cfg, handler, MemoryStore::with_document(WSDL_DOCUMENT)).unwrap();
    router::build_router(state)
}

fn echo_app() -> Router {
    app(AdapterConfig::default(), Arc::new(EchoService::new("echo.wsdl")))
}

fn soap_post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "text/xml; charset=UTF-8")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, String, String) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let content_type = res
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

fn fault_string(body: &str) -> String {
    let env = Envelope::parse(body).unwrap();
    FaultDescriptor::from_envelope(&env).expect("fault expected").string
}

#[tokio::test]
async fn post_echo_returns_200_with_response_envelope() {
    let (status, ct, body) = send(echo_app(), soap_post("/", ECHO_REQUEST)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ct, "text/xml; charset=UTF-8");
    assert!(body.contains("<echoResponse><ts1:echo><ts1:message>hello</ts1:message></ts1:echo></echoResponse>"));
    assert!(body.contains("<xrd:protocolVersion>4.0</xrd:protocolVersion>"));
}

#[tokio::test]
async fn faults_are_still_http_200() {
    let req = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, ct, body) = send(echo_app(), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ct, "text/xml; charset=UTF-8");
    assert!(fault_string(&body).contains("application/json"));
}

#[tokio::test]
async fn oversized_body_is_invalid_message() {
    let mut cfg = AdapterConfig::default();
    cfg.server.max_body_bytes = 1024;
    let app = app(cfg, Arc::new(EchoService::new("echo.wsdl")));

    let big = format!("{ECHO_REQUEST}{}", " ".repeat(4096));
    let (status, _, body) = send(app, soap_post("/", big)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(fault_string(&body), MSG_INVALID_MESSAGE);
}

#[tokio::test]
async fn get_wsdl_returns_document() {
    let (status, ct, body) = send(echo_app(), get("/?wsdl")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ct, "text/xml; charset=UTF-8");
    assert_eq!(body, WSDL_DOCUMENT);
}

#[tokio::test]
async fn plain_get_is_fault() {
    let (status, _, body) = send(echo_app(), get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(fault_string(&body), MSG_GET_NOT_SUPPORTED);
}

#[tokio::test]
async fn endpoint_follows_configured_path() {
    let cfg = config::load_from_str("version: 1\nserver:\n  path: \"/soap\"\n").unwrap();
    let app = app(cfg, Arc::new(EchoService::new("echo.wsdl")));

    let (status, _, body) = send(app.clone(), soap_post("/soap", ECHO_REQUEST)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<echoResponse>"));

    let (status, _, _) = send(app, soap_post("/", ECHO_REQUEST)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

struct SlowHandler;

#[async_trait]
impl ServiceHandler for SlowHandler {
    async fn handle(
        &self,
        request: &ServiceRequest,
    ) -> Result<Option<ServiceResponse>, HandlerError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Some(ServiceResponse::success(request, "<late/>")))
    }

    fn descriptor_path(&self) -> String {
        "slow.wsdl".into()
    }
}

#[tokio::test]
async fn timed_out_request_is_internal_error() {
    let mut cfg = AdapterConfig::default();
    cfg.server.request_timeout_ms = 100;
    let app = app(cfg, Arc::new(SlowHandler));

    let (status, _, body) = send(app.clone(), soap_post("/", ECHO_REQUEST)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fault_string(&body), MSG_INTERNAL_ERROR);

    let (_, _, metrics) = send(app, get("/metrics")).await;
    assert!(metrics.contains(r#"soapwire_faults_total{kind="INTERNAL"} 1"#));
}

#[tokio::test]
async fn scoped_declarations_are_echoed_in_the_response() {
    let (status, _, body) = send(echo_app(), soap_post("/", SCOPED_NS_REQUEST)).await;
    assert_eq!(status, StatusCode::OK);

    check_namespaces(&body).unwrap();
    assert!(body.contains(r#"<SOAP-ENV:Body xmlns:ts1="http://test.x-road.fi/producer"><echoResponse><ts1:echo>"#));
    assert!(body.contains(r#"<SOAP-ENV:Header xmlns:xrd="http://x-road.eu/xsd/xroad.xsd" xmlns:id="http://x-road.eu/xsd/identifiers">"#));
}

#[tokio::test]
async fn metrics_count_requests_and_faults() {
    let app = echo_app();
    send(app.clone(), soap_post("/", ECHO_REQUEST)).await;
    send(app.clone(), get("/")).await;

    let (status, _, body) = send(app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"soapwire_requests_total{method="POST"} 1"#));
    assert!(body.contains(r#"soapwire_requests_total{method="GET"} 1"#));
    assert!(body.contains(r#"soapwire_faults_total{kind="METHOD_NOT_SUPPORTED"} 1"#));
    assert!(body.contains("soapwire_pipeline_duration_micros_count"));
}

#[test]
fn invalid_config_is_rejected_at_startup() {
    let mut cfg = AdapterConfig::default();
    cfg.server.path = "soap".into();
    let res = AppState::new(cfg, Arc::new(EchoService::new("echo.wsdl")));
    assert!(res.is_err());
}
