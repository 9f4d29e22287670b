//! Envelope serialization for faults and handler responses.
//!
//! Two independent entry points: the fault path never needs an application
//! response, and the response path never builds a placeholder fault.

use crate::error::{Result, SoapError};
use crate::message::{ResponseOutcome, ServiceResponse};
use crate::protocol::envelope::{Envelope, DEFAULT_PREFIX};
use crate::protocol::fault::FaultDescriptor;

/// Fault envelope with an empty header block.
pub fn serialize_fault(fault: &FaultDescriptor) -> Envelope {
    Envelope::new(fault.to_xml(Some(DEFAULT_PREFIX))).with_header("")
}

/// Response envelope built on the request's header and namespaces.
///
/// The rendered document is re-parsed so a malformed payload is reported here
/// rather than written to the wire.
pub fn serialize_response(response: &ServiceResponse) -> Result<Envelope> {
    let skeleton = response.skeleton().clone();
    let envelope = match response.outcome() {
        ResponseOutcome::Payload(payload) => skeleton
            .with_body(payload.as_str())
            .with_attachments(response.attachments().to_vec()),
        ResponseOutcome::Fault(fault) => {
            let body = fault.to_xml(skeleton.prefix());
            skeleton.with_body(body)
        }
    };

    Envelope::parse(&envelope.to_xml())
        .map_err(|e| SoapError::Encode(format!("response envelope is not well-formed: {e}")))?;
    Ok(envelope)
}
