//! Envelope → `ServiceRequest` deserialization.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Result, SoapError};
use crate::message::{ClientId, ServiceId, ServiceRequest};
use crate::protocol::envelope::Envelope;
use crate::protocol::fault::FaultDescriptor;
use crate::protocol::read_text;

/// Turns a decoded envelope into a structured request.
///
/// An `Err` means the envelope cannot become a request at all. A request that is
/// well-formed but semantically wrong is returned with its error slot set.
pub trait RequestDeserializer: Send + Sync {
    fn deserialize(&self, envelope: Envelope) -> Result<ServiceRequest>;
}

/// X-Road message protocol v4 header deserializer.
///
/// Header elements are matched by local name; prefixes are not resolved.
#[derive(Debug, Default, Clone, Copy)]
pub struct XRoadDeserializer;

impl XRoadDeserializer {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Default)]
struct XRoadHeader {
    client: Option<ClientId>,
    service: Option<ServiceId>,
    id: Option<String>,
    user_id: Option<String>,
    issue: Option<String>,
    protocol_version: Option<String>,
}

impl RequestDeserializer for XRoadDeserializer {
    fn deserialize(&self, envelope: Envelope) -> Result<ServiceRequest> {
        let header = envelope
            .header()
            .ok_or_else(|| missing("Header"))
            .and_then(parse_header)?;

        let client = header.client.ok_or_else(|| missing("client"))?;
        let service = header.service.ok_or_else(|| missing("service"))?;
        let id = header.id.filter(|s| !s.is_empty()).ok_or_else(|| missing("id"))?;
        let protocol_version = header
            .protocol_version
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("protocolVersion"))?;

        let body_fault = FaultDescriptor::from_envelope(&envelope);
        let mut request = ServiceRequest::new(client, service, id, protocol_version, envelope);
        request.user_id = header.user_id;
        request.issue = header.issue;

        if !request.protocol_version.starts_with("4.") {
            let fault = FaultDescriptor::client(format!(
                "Unsupported X-Road protocol version \"{}\".",
                request.protocol_version
            ));
            request.set_error(fault);
        } else if let Some(fault) = body_fault {
            request.set_error(fault);
        }

        tracing::debug!(
            client = %request.client,
            service = %request.service,
            message_id = %request.id,
            has_error = request.has_error(),
            "request header deserialized"
        );
        Ok(request)
    }
}

fn parse_header(xml: &str) -> Result<XRoadHeader> {
    let mut reader = Reader::from_str(xml);
    let mut out = XRoadHeader::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"client" => out.client = Some(client_id(&parse_fields(&mut reader)?)?),
                    b"service" => out.service = Some(service_id(&parse_fields(&mut reader)?)?),
                    b"id" => out.id = Some(read_text(&mut reader)?.trim().to_string()),
                    b"userId" => out.user_id = Some(read_text(&mut reader)?.trim().to_string()),
                    b"issue" => out.issue = Some(read_text(&mut reader)?.trim().to_string()),
                    b"protocolVersion" => {
                        out.protocol_version = Some(read_text(&mut reader)?.trim().to_string())
                    }
                    _ => {
                        read_text(&mut reader)?;
                    }
                }
            }
            Event::Eof => return Ok(out),
            _ => {}
        }
    }
}

/// Child elements of an identifier block, by local name.
fn parse_fields(reader: &mut Reader<&[u8]>) -> Result<Vec<(String, String)>> {
    let mut fields = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let value = read_text(reader)?.trim().to_string();
                fields.push((name, value));
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                fields.push((name, String::new()));
            }
            Event::End(_) => return Ok(fields),
            Event::Eof => return Err(SoapError::Deserialize("unterminated identifier".into())),
            _ => {}
        }
    }
}

fn field(fields: &[(String, String)], name: &str) -> Option<String> {
    fields
        .iter()
        .find(|(k, v)| k == name && !v.is_empty())
        .map(|(_, v)| v.clone())
}

fn required(fields: &[(String, String)], block: &str, name: &str) -> Result<String> {
    field(fields, name)
        .ok_or_else(|| SoapError::Deserialize(format!("{block} identifier is missing {name}")))
}

fn client_id(fields: &[(String, String)]) -> Result<ClientId> {
    Ok(ClientId {
        x_road_instance: required(fields, "client", "xRoadInstance")?,
        member_class: required(fields, "client", "memberClass")?,
        member_code: required(fields, "client", "memberCode")?,
        subsystem_code: field(fields, "subsystemCode"),
    })
}

fn service_id(fields: &[(String, String)]) -> Result<ServiceId> {
    Ok(ServiceId {
        x_road_instance: required(fields, "service", "xRoadInstance")?,
        member_class: required(fields, "service", "memberClass")?,
        member_code: required(fields, "service", "memberCode")?,
        subsystem_code: field(fields, "subsystemCode"),
        service_code: required(fields, "service", "serviceCode")?,
        service_version: field(fields, "serviceVersion"),
    })
}

fn missing(name: &str) -> SoapError {
    SoapError::Deserialize(format!("missing X-Road header element: {name}"))
}
