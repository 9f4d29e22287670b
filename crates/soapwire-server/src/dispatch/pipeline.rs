//! Request pipeline: decode → deserialize → dispatch → encode.
//!
//! Every tier resolves its own failure into a fault envelope, so exactly one
//! `TransportFrame` leaves the pipeline per request. A later tier only runs
//! when the earlier one succeeded.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures_util::FutureExt;

use soapwire_core::codec::{self, TransportFrame};
use soapwire_core::error::SoapError;
use soapwire_core::serializer::serialize_response;
use soapwire_core::{
    build_fault, Envelope, FaultDescriptor, FaultKind, MimeHeaders, RequestDeserializer,
    ServiceRequest,
};

use crate::bootstrap::FaultBodies;
use crate::dispatch::descriptor::{self, DescriptorStore};
use crate::dispatch::handler::{HandlerError, ServiceHandler};
use crate::obs::AdapterMetrics;

pub struct RequestPipeline {
    handler: Arc<dyn ServiceHandler>,
    deserializer: Arc<dyn RequestDeserializer>,
    store: Arc<dyn DescriptorStore>,
    faults: Arc<FaultBodies>,
    descriptor_root: PathBuf,
    metrics: Arc<AdapterMetrics>,
}

impl RequestPipeline {
    pub fn new(
        handler: Arc<dyn ServiceHandler>,
        deserializer: Arc<dyn RequestDeserializer>,
        store: Arc<dyn DescriptorStore>,
        faults: Arc<FaultBodies>,
        descriptor_root: PathBuf,
        metrics: Arc<AdapterMetrics>,
    ) -> Self {
        Self {
            handler,
            deserializer,
            store,
            faults,
            descriptor_root,
            metrics,
        }
    }

    pub fn faults(&self) -> &FaultBodies {
        &self.faults
    }

    /// Process one POST body into the single response frame.
    pub async fn process_post(
        &self,
        body: Bytes,
        content_type: Option<&str>,
        headers: &MimeHeaders,
    ) -> TransportFrame {
        let started = Instant::now();
        self.metrics.requests.inc(&[("method", "POST")]);
        tracing::debug!(content_type = ?content_type, content_length = body.len(), "new request received");

        let envelope = self.run(body, content_type.unwrap_or(""), headers).await;
        let frame = self.respond(&envelope);

        self.metrics
            .pipeline_duration
            .observe(&[("method", "POST")], started.elapsed());
        frame
    }

    /// Frame for a body the transport could not read (too large, broken stream).
    pub fn unreadable_body(&self) -> TransportFrame {
        self.metrics.requests.inc(&[("method", "POST")]);
        let envelope = self.fault(FaultKind::Decode, &FaultDescriptor::invalid_message());
        self.respond(&envelope)
    }

    /// Frame for a request that exceeded the request timeout.
    pub fn timed_out(&self) -> TransportFrame {
        self.record(FaultKind::Internal);
        self.faults.internal_error()
    }

    async fn run(&self, body: Bytes, content_type: &str, headers: &MimeHeaders) -> Envelope {
        // 1) decode
        let envelope = match codec::decode(&body, content_type, headers) {
            Ok(env) => env,
            Err(SoapError::UnsupportedContentType(ct)) => {
                tracing::warn!(content_type = %ct, "invalid content type");
                return self.fault(
                    FaultKind::UnsupportedContentType,
                    &FaultDescriptor::unsupported_content_type(&ct),
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "unable to decode the request, returning SOAP fault");
                return self.fault(FaultKind::Decode, &FaultDescriptor::invalid_message());
            }
        };
        tracing::trace!(envelope = %envelope.to_xml(), "incoming SOAP message");

        // 2) deserialize
        let Some(request) = self.deserialize(envelope) else {
            return self.fault(FaultKind::Deserialization, &FaultDescriptor::unparsable_request());
        };

        // 3) dispatch
        self.dispatch(&request).await
    }

    fn deserialize(&self, envelope: Envelope) -> Option<ServiceRequest> {
        let deserializer = Arc::clone(&self.deserializer);
        match std::panic::catch_unwind(AssertUnwindSafe(move || deserializer.deserialize(envelope))) {
            Ok(Ok(request)) => Some(request),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "deserializing SOAP message to ServiceRequest failed");
                None
            }
            Err(_) => {
                tracing::error!("deserializer panicked");
                None
            }
        }
    }

    async fn dispatch(&self, request: &ServiceRequest) -> Envelope {
        tracing::debug!(service = %request.service, message_id = %request.id, "dispatching request");
        let outcome = AssertUnwindSafe(self.handler.handle(request))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(None)) => {
                tracing::warn!(service = %request.service, "request was not processed, unknown service code");
                self.fault(FaultKind::UnknownService, &FaultDescriptor::unknown_service())
            }
            Ok(Ok(Some(response))) => match serialize_response(&response) {
                Ok(envelope) => {
                    tracing::debug!(message_id = %request.id, fault = response.is_fault(), "request processed");
                    envelope
                }
                Err(e) => {
                    tracing::error!(error = %e, "serializing the handler response failed");
                    self.internal_fault()
                }
            },
            Ok(Err(HandlerError::Application(msg))) => {
                tracing::error!(error = %msg, "handler raised an application error");
                match request.error() {
                    Some(err) => self.fault(FaultKind::Application, &err.canonical()),
                    None => self.internal_fault(),
                }
            }
            Ok(Err(HandlerError::Transport(msg))) => {
                tracing::error!(error = %msg, "handler raised a transport error");
                self.internal_fault()
            }
            Err(_) => {
                tracing::error!("handler panicked");
                self.internal_fault()
            }
        }
    }

    /// Encode the selected envelope; any encode failure falls back to the canned internal error.
    fn respond(&self, envelope: &Envelope) -> TransportFrame {
        match codec::encode(envelope) {
            Ok(encoded) if !encoded.body.is_empty() => {
                let frame = encoded.into_frame();
                tracing::debug!(content_type = %frame.content_type, "sending response");
                frame
            }
            Ok(_) => {
                tracing::warn!("internal server error, encoded response was empty");
                self.record(FaultKind::Internal);
                self.faults.internal_error()
            }
            Err(e) => {
                tracing::warn!(error = %e, "internal server error, message processing failed");
                self.record(FaultKind::Internal);
                self.faults.internal_error()
            }
        }
    }

    /// Serve the WSDL document, or the matching canned fault.
    pub async fn process_get(&self, query: Option<&str>) -> TransportFrame {
        let started = Instant::now();
        self.metrics.requests.inc(&[("method", "GET")]);

        let frame = if descriptor::has_wsdl_marker(query) {
            self.serve_descriptor().await
        } else {
            tracing::warn!("GET request without wsdl marker, not supported");
            self.record(FaultKind::MethodNotSupported);
            self.faults.get_not_supported()
        };

        self.metrics
            .pipeline_duration
            .observe(&[("method", "GET")], started.elapsed());
        frame
    }

    async fn serve_descriptor(&self) -> TransportFrame {
        tracing::debug!("WSDL request received");
        let branch = async {
            let path = descriptor::resolve(&self.handler.descriptor_path(), &self.descriptor_root);
            let document = self.store.read_document(&path).await?;
            Ok::<_, SoapError>((path, document))
        };

        match AssertUnwindSafe(branch).catch_unwind().await {
            Ok(Ok((path, document))) if document.is_empty() => {
                tracing::warn!(path = %path.display(), "WSDL not found, returning SOAP fault");
                self.record(FaultKind::DescriptorNotFound);
                self.faults.wsdl_not_found()
            }
            Ok(Ok((path, document))) => {
                tracing::trace!(path = %path.display(), "WSDL returned to the requester");
                TransportFrame::xml(document)
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "reading WSDL failed");
                self.record(FaultKind::Internal);
                self.faults.internal_error()
            }
            Err(_) => {
                tracing::error!("WSDL retrieval panicked");
                self.record(FaultKind::Internal);
                self.faults.internal_error()
            }
        }
    }

    fn fault(&self, kind: FaultKind, descriptor: &FaultDescriptor) -> Envelope {
        self.record(kind);
        build_fault(descriptor)
    }

    fn internal_fault(&self) -> Envelope {
        self.fault(FaultKind::Internal, &FaultDescriptor::internal_error())
    }

    fn record(&self, kind: FaultKind) {
        self.metrics.faults.inc(&[("kind", kind.as_str())]);
    }
}
