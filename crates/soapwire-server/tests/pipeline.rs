//! Request pipeline behavior: one response frame per request, the right fault per tier.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]


use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;

use soapwire_core::codec::TEXT_XML_UTF8;
use soapwire_core::error::Result;
use soapwire_core::protocol::fault::{
    FAULT_CODE_CLIENT, MSG_GET_NOT_SUPPORTED, MSG_INTERNAL_ERROR, MSG_INVALID_MESSAGE,
    MSG_UNKNOWN_SERVICE, MSG_UNPARSABLE_REQUEST, MSG_WSDL_NOT_FOUND,
};
use soapwire_core::protocol::mime;
use soapwire_core::{
    Attachment, Envelope, FaultDescriptor, MimeHeaders, RequestDeserializer, ServiceRequest,
    TransportFrame, XRoadDeserializer,
};
use soapwire_server::bootstrap::FaultBodies;
use soapwire_server::dispatch::{DescriptorStore, RequestPipeline, ServiceHandler};
use soapwire_server::obs::AdapterMetrics;
use soapwire_server::services::EchoService;

use fixtures::{
    Behavior, MemoryStore, StubHandler, ECHO_REQUEST, FAULT_BODY_REQUEST, PLAIN_SOAP_REQUEST,
    WSDL_DOCUMENT,
};

const XML: Option<&str> = Some("text/xml; charset=UTF-8");

fn pipeline_with(
    handler: Arc<dyn ServiceHandler>,
    deserializer: Arc<dyn RequestDeserializer>,
    store: Arc<dyn DescriptorStore>,
) -> (RequestPipeline, Arc<AdapterMetrics>) {
    let metrics = Arc::new(AdapterMetrics::default());
    let pipeline = RequestPipeline::new(
        handler,
        deserializer,
        store,
        Arc::new(FaultBodies::precompute().unwrap()),
        PathBuf::from("/srv/adapter"),
        Arc::clone(&metrics),
    );
    (pipeline, metrics)
}

fn pipeline(handler: Arc<dyn ServiceHandler>) -> (RequestPipeline, Arc<AdapterMetrics>) {
    pipeline_with(
        handler,
        Arc::new(XRoadDeserializer::new()),
        MemoryStore::with_document(WSDL_DOCUMENT),
    )
}

async fn post(pipeline: &RequestPipeline, body: &str, content_type: Option<&str>) -> TransportFrame {
    pipeline
        .process_post(Bytes::from(body.to_string()), content_type, &MimeHeaders::new())
        .await
}

fn fault_of(frame: &TransportFrame) -> FaultDescriptor {
    assert_eq!(frame.content_type, TEXT_XML_UTF8);
    let env = Envelope::parse(std::str::from_utf8(&frame.body).unwrap()).unwrap();
    FaultDescriptor::from_envelope(&env).expect("response must be a fault")
}

fn fault_count(metrics: &AdapterMetrics, kind: &str) -> u64 {
    metrics.faults.get(&[("kind", kind)])
}

// --------------------
// POST
// --------------------

#[tokio::test]
async fn echo_request_returns_payload_with_request_header() {
    let handler = StubHandler::new(Behavior::Echo);
    let (p, metrics) = pipeline(handler.clone());

    let frame = post(&p, ECHO_REQUEST, XML).await;
    assert_eq!(frame.content_type, TEXT_XML_UTF8);

    let env = Envelope::parse(std::str::from_utf8(&frame.body).unwrap()).unwrap();
    assert_eq!(env.prefix(), Some("SOAP-ENV"));
    assert!(env.header().unwrap().contains("<xrd:id>ID11234</xrd:id>"));
    assert!(env.body().contains("<echoResponse><ts1:echo>"));
    assert!(FaultDescriptor::from_envelope(&env).is_none());

    assert_eq!(handler.calls(), 1);
    assert_eq!(metrics.requests.get(&[("method", "POST")]), 1);
}

#[tokio::test]
async fn unsupported_content_type_is_client_fault_with_detail() {
    let handler = StubHandler::new(Behavior::Echo);
    let (p, metrics) = pipeline(handler.clone());

    let frame = post(&p, r#"{"hello":"world"}"#, Some("application/json")).await;
    let fault = fault_of(&frame);

    assert_eq!(fault.code, FAULT_CODE_CLIENT);
    assert!(fault.string.contains("application/json"));
    assert_eq!(fault.detail.as_deref(), Some("application/json"));
    assert_eq!(handler.calls(), 0);
    assert_eq!(fault_count(&metrics, "UNSUPPORTED_CONTENT_TYPE"), 1);
}

#[tokio::test]
async fn missing_content_type_is_unsupported() {
    let handler = StubHandler::new(Behavior::Echo);
    let (p, _) = pipeline(handler.clone());

    let fault = fault_of(&post(&p, ECHO_REQUEST, None).await);
    assert_eq!(fault.string, r#"Unsupported content type : ""."#);
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn malformed_xml_is_invalid_message() {
    let handler = StubHandler::new(Behavior::Echo);
    let (p, metrics) = pipeline(handler.clone());

    let fault = fault_of(&post(&p, "<SOAP-ENV:Envelope", XML).await);
    assert_eq!(fault.string, MSG_INVALID_MESSAGE);
    assert_eq!(fault.code, FAULT_CODE_CLIENT);
    assert_eq!(handler.calls(), 0);
    assert_eq!(fault_count(&metrics, "DECODE"), 1);
}

#[tokio::test]
async fn soap_without_xroad_header_is_unparsable() {
    let handler = StubHandler::new(Behavior::Echo);
    let (p, metrics) = pipeline(handler.clone());

    let fault = fault_of(&post(&p, PLAIN_SOAP_REQUEST, XML).await);
    assert_eq!(fault.string, MSG_UNPARSABLE_REQUEST);
    assert_eq!(handler.calls(), 0);
    assert_eq!(fault_count(&metrics, "DESERIALIZATION"), 1);
}

struct PanickingDeserializer;

impl RequestDeserializer for PanickingDeserializer {
    fn deserialize(&self, _envelope: Envelope) -> Result<ServiceRequest> {
        panic!("deserializer bug");
    }
}

#[tokio::test]
async fn deserializer_panic_is_unparsable() {
    let handler = StubHandler::new(Behavior::Echo);
    let (p, _) = pipeline_with(
        handler.clone(),
        Arc::new(PanickingDeserializer),
        MemoryStore::with_document(WSDL_DOCUMENT),
    );

    let fault = fault_of(&post(&p, ECHO_REQUEST, XML).await);
    assert_eq!(fault.string, MSG_UNPARSABLE_REQUEST);
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn unknown_service_when_handler_declines() {
    let handler = StubHandler::new(Behavior::Unknown);
    let (p, metrics) = pipeline(handler.clone());

    let fault = fault_of(&post(&p, ECHO_REQUEST, XML).await);
    assert_eq!(fault.string, MSG_UNKNOWN_SERVICE);
    assert_eq!(fault.code, FAULT_CODE_CLIENT);
    assert_eq!(handler.calls(), 1);
    assert_eq!(fault_count(&metrics, "UNKNOWN_SERVICE"), 1);
}

#[tokio::test]
async fn application_error_reraises_request_error() {
    let (p, metrics) = pipeline(Arc::new(EchoService::new("echo.wsdl")));

    let fault = fault_of(&post(&p, FAULT_BODY_REQUEST, XML).await);
    assert_eq!(fault.code, "SOAP-ENV:Server.ServiceFailed");
    assert_eq!(fault.string, "Upstream refused the call");
    assert_eq!(fault.actor.as_deref(), Some("urn:producer"));
    assert_eq!(fault.detail.as_deref(), Some("quota exceeded"));
    assert_eq!(fault_count(&metrics, "APPLICATION"), 1);
}

#[tokio::test]
async fn application_error_without_request_error_is_internal() {
    let handler = StubHandler::new(Behavior::Application);
    let (p, metrics) = pipeline(handler.clone());

    let fault = fault_of(&post(&p, ECHO_REQUEST, XML).await);
    assert_eq!(fault.string, MSG_INTERNAL_ERROR);
    assert_eq!(fault_count(&metrics, "INTERNAL"), 1);
}

#[tokio::test]
async fn transport_error_is_internal_even_with_request_error() {
    let handler = StubHandler::new(Behavior::Transport);
    let (p, _) = pipeline(handler.clone());

    let fault = fault_of(&post(&p, FAULT_BODY_REQUEST, XML).await);
    assert_eq!(fault.string, MSG_INTERNAL_ERROR);
    assert_eq!(fault.code, FAULT_CODE_CLIENT);
}

#[tokio::test]
async fn handler_panic_is_internal() {
    let handler = StubHandler::new(Behavior::Panic);
    let (p, _) = pipeline(handler.clone());

    let fault = fault_of(&post(&p, ECHO_REQUEST, XML).await);
    assert_eq!(fault.string, MSG_INTERNAL_ERROR);
    assert_eq!(handler.calls(), 1);
}

#[tokio::test]
async fn malformed_handler_payload_is_internal() {
    let handler = StubHandler::new(Behavior::Payload("<broken>".into()));
    let (p, _) = pipeline(handler);

    let fault = fault_of(&post(&p, ECHO_REQUEST, XML).await);
    assert_eq!(fault.string, MSG_INTERNAL_ERROR);
}

#[tokio::test]
async fn encode_failure_falls_back_to_canned_internal_error() {
    let bad = Attachment::new("text/plain\r\nX-Injected: 1", Bytes::from_static(b"data"));
    let handler = StubHandler::new(Behavior::EchoWithAttachment(bad));
    let (p, metrics) = pipeline(handler);

    let frame = post(&p, ECHO_REQUEST, XML).await;
    assert_eq!(frame, p.faults().internal_error());
    assert_eq!(fault_of(&frame).string, MSG_INTERNAL_ERROR);
    assert_eq!(fault_count(&metrics, "INTERNAL"), 1);
}

#[tokio::test]
async fn attachments_produce_multipart_response() {
    let attachment = Attachment::new("image/png", Bytes::from_static(b"\x89PNG-bytes"))
        .with_content_id("image-1");
    let handler = StubHandler::new(Behavior::EchoWithAttachment(attachment));
    let (p, _) = pipeline(handler);

    let frame = post(&p, ECHO_REQUEST, XML).await;
    assert!(frame.is_multipart());

    let boundary = mime::param(&frame.content_type, "boundary").unwrap();
    assert!(frame.body.starts_with(format!("--{boundary}\r\n").as_bytes()));
    assert!(frame.content_type.contains(r#"type="text/xml""#));

    let parts = mime::parse(&frame.body, &frame.content_type).unwrap();
    assert_eq!(parts.attachments.len(), 1);
    assert_eq!(parts.attachments[0].content_id.as_deref(), Some("image-1"));
    assert_eq!(&parts.attachments[0].data[..], b"\x89PNG-bytes");
}

#[tokio::test]
async fn multipart_request_round_trips_through_echo_service() {
    let (p, _) = pipeline(Arc::new(EchoService::new("echo.wsdl")));

    let attachment = Attachment::new("application/octet-stream", Bytes::from_static(b"\x00\x01\x02"))
        .with_content_id("blob-1");
    let body = mime::render(ECHO_REQUEST, &[attachment], "test-boundary").unwrap();
    let content_type = r#"multipart/related; type="text/xml"; boundary="test-boundary""#;

    let mut headers = MimeHeaders::new();
    headers.insert("Content-Type", content_type);
    let frame = p.process_post(body, Some(content_type), &headers).await;

    assert!(frame.is_multipart());
    let parts = mime::parse(&frame.body, &frame.content_type).unwrap();
    assert!(parts.root.contains("<echoResponse>"));
    assert_eq!(parts.attachments.len(), 1);
    assert_eq!(&parts.attachments[0].data[..], b"\x00\x01\x02");
}

#[tokio::test]
async fn unreadable_body_is_invalid_message() {
    let (p, metrics) = pipeline(StubHandler::new(Behavior::Echo));

    let fault = fault_of(&p.unreadable_body());
    assert_eq!(fault.string, MSG_INVALID_MESSAGE);
    assert_eq!(fault_count(&metrics, "DECODE"), 1);
}

// --------------------
// GET
// --------------------

#[tokio::test]
async fn wsdl_marker_serves_document_verbatim() {
    let store = MemoryStore::with_document(WSDL_DOCUMENT);
    let (p, _) = pipeline_with(
        StubHandler::new(Behavior::Echo),
        Arc::new(XRoadDeserializer::new()),
        store.clone(),
    );

    let frame = p.process_get(Some("wsdl")).await;
    assert_eq!(frame.content_type, TEXT_XML_UTF8);
    assert_eq!(&frame.body[..], WSDL_DOCUMENT.as_bytes());
    assert_eq!(store.reads(), vec![PathBuf::from("/srv/adapter/service.wsdl")]);
}

#[tokio::test]
async fn descriptor_path_with_directories_is_used_as_is() {
    let store = MemoryStore::with_document(WSDL_DOCUMENT);
    let (p, _) = pipeline_with(
        StubHandler::with_descriptor(Behavior::Echo, "/opt/wsdl/echo.wsdl"),
        Arc::new(XRoadDeserializer::new()),
        store.clone(),
    );

    p.process_get(Some("foo=bar&wsdl")).await;
    assert_eq!(store.reads(), vec![PathBuf::from("/opt/wsdl/echo.wsdl")]);
}

#[tokio::test]
async fn get_without_marker_is_canned_fault_without_store_read() {
    let store = MemoryStore::with_document(WSDL_DOCUMENT);
    let (p, metrics) = pipeline_with(
        StubHandler::new(Behavior::Echo),
        Arc::new(XRoadDeserializer::new()),
        store.clone(),
    );

    for query in [None, Some("xsd"), Some("wsdlx=1")] {
        let fault = fault_of(&p.process_get(query).await);
        assert_eq!(fault.string, MSG_GET_NOT_SUPPORTED);
    }
    assert!(store.reads().is_empty());
    assert_eq!(fault_count(&metrics, "METHOD_NOT_SUPPORTED"), 3);
}

#[tokio::test]
async fn empty_document_is_wsdl_not_found() {
    let (p, metrics) = pipeline_with(
        StubHandler::new(Behavior::Echo),
        Arc::new(XRoadDeserializer::new()),
        MemoryStore::with_document(""),
    );

    let frame = p.process_get(Some("wsdl")).await;
    assert_eq!(frame, p.faults().wsdl_not_found());
    assert_eq!(fault_of(&frame).string, MSG_WSDL_NOT_FOUND);
    assert_eq!(fault_count(&metrics, "DESCRIPTOR_NOT_FOUND"), 1);
}

#[tokio::test]
async fn store_error_is_internal() {
    let (p, _) = pipeline_with(
        StubHandler::new(Behavior::Echo),
        Arc::new(XRoadDeserializer::new()),
        MemoryStore::failing("disk on fire"),
    );

    let fault = fault_of(&p.process_get(Some("wsdl")).await);
    assert_eq!(fault.string, MSG_INTERNAL_ERROR);
}

#[tokio::test]
async fn timed_out_request_records_internal_fault() {
    let (p, metrics) = pipeline(StubHandler::new(Behavior::Echo));

    let frame = p.timed_out();
    assert_eq!(frame, p.faults().internal_error());
    assert_eq!(fault_count(&metrics, "INTERNAL"), 1);
}
