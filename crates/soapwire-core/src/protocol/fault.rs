//! SOAP Fault (four fields) and the fault builder.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::Result;
use crate::protocol::envelope::Envelope;
use crate::protocol::read_text;
use crate::serializer;

/// Fault code for errors caused by the caller.
pub const FAULT_CODE_CLIENT: &str = "SOAP-ENV:Client";
/// Fault code for errors on the service side.
pub const FAULT_CODE_SERVER: &str = "SOAP-ENV:Server";

pub const MSG_INVALID_MESSAGE: &str = "Invalid SOAP message.";
pub const MSG_UNPARSABLE_REQUEST: &str = "Invalid X-Road SOAP message. Unable to parse the request.";
pub const MSG_UNKNOWN_SERVICE: &str = "Unknown service code.";
pub const MSG_INTERNAL_ERROR: &str = "500 Internal Server Error";
pub const MSG_GET_NOT_SUPPORTED: &str = "HTTP GET method not implemented";
pub const MSG_WSDL_NOT_FOUND: &str = "WSDL not found";

/// Four-field SOAP Fault description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultDescriptor {
    pub code: String,
    pub string: String,
    pub actor: Option<String>,
    pub detail: Option<String>,
}

impl FaultDescriptor {
    pub fn new(code: impl Into<String>, string: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            string: string.into(),
            actor: None,
            detail: None,
        }
    }

    /// Fault with the client-side code.
    pub fn client(string: impl Into<String>) -> Self {
        Self::new(FAULT_CODE_CLIENT, string)
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn unsupported_content_type(content_type: &str) -> Self {
        Self::client(format!("Unsupported content type : \"{content_type}\"."))
            .with_actor("")
            .with_detail(content_type)
    }

    pub fn invalid_message() -> Self {
        Self::client(MSG_INVALID_MESSAGE).with_actor("").with_detail("")
    }

    pub fn unparsable_request() -> Self {
        Self::client(MSG_UNPARSABLE_REQUEST).with_actor("").with_detail("")
    }

    pub fn unknown_service() -> Self {
        Self::client(MSG_UNKNOWN_SERVICE)
    }

    pub fn internal_error() -> Self {
        Self::client(MSG_INTERNAL_ERROR)
    }

    pub fn get_not_supported() -> Self {
        Self::client(MSG_GET_NOT_SUPPORTED)
    }

    pub fn wsdl_not_found() -> Self {
        Self::client(MSG_WSDL_NOT_FOUND)
    }

    /// Field-by-field copy into a plain four-field fault.
    ///
    /// Used when a caller-supplied error is re-raised as the response fault.
    pub fn canonical(&self) -> Self {
        Self {
            code: self.code.clone(),
            string: self.string.clone(),
            actor: self.actor.clone(),
            detail: self.detail.clone(),
        }
    }

    /// `<Fault>` element for a body block. Unused fields render as empty elements.
    pub fn to_xml(&self, prefix: Option<&str>) -> String {
        let tag = match prefix {
            Some(p) => format!("{p}:Fault"),
            None => "Fault".to_string(),
        };
        format!(
            "<{tag}><faultcode>{}</faultcode><faultstring>{}</faultstring><faultactor>{}</faultactor><detail>{}</detail></{tag}>",
            escape(self.code.as_str()),
            escape(self.string.as_str()),
            escape(self.actor.as_deref().unwrap_or("")),
            escape(self.detail.as_deref().unwrap_or("")),
        )
    }

    /// Fault carried in the envelope body, if the first body element is a `Fault`.
    ///
    /// Empty `faultactor`/`detail` elements read back as `None`.
    pub fn from_envelope(envelope: &Envelope) -> Option<Self> {
        parse_fault(envelope.body()).ok().flatten()
    }
}

/// Build a fault envelope. Always succeeds; equal descriptors give equal envelopes.
pub fn build_fault(descriptor: &FaultDescriptor) -> Envelope {
    serializer::serialize_fault(descriptor)
}

fn parse_fault(body: &str) -> Result<Option<FaultDescriptor>> {
    let mut reader = Reader::from_str(body);
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"Fault" => break,
            Event::Start(_) | Event::Empty(_) | Event::Eof => return Ok(None),
            _ => {}
        }
    }

    let mut code = None;
    let mut string = None;
    let mut actor = None;
    let mut detail = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                let text = read_text(&mut reader)?;
                match name.as_slice() {
                    b"faultcode" => code = Some(text),
                    b"faultstring" => string = Some(text),
                    b"faultactor" => actor = Some(text),
                    b"detail" => detail = Some(text),
                    _ => {}
                }
            }
            Event::End(_) | Event::Eof => break,
            _ => {}
        }
    }

    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
    match (code, string) {
        (Some(code), Some(string)) => Ok(Some(FaultDescriptor {
            code,
            string,
            actor: non_empty(actor),
            detail: non_empty(detail),
        })),
        _ => Ok(None),
    }
}
