//! Shared error type across soapwire crates.

use thiserror::Error;

/// Fault taxonomy (stable API).
///
/// Every failure the adapter can observe resolves to exactly one of these kinds
/// before it reaches the wire. The string form is used in log fields and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Declared content type is neither `text/xml` nor `multipart/related`.
    UnsupportedContentType,
    /// Body could not be parsed as a SOAP envelope.
    Decode,
    /// Envelope parsed but could not become a service request.
    Deserialization,
    /// Handler had nothing to do with the request.
    UnknownService,
    /// Handler failed and the request carried its own error.
    Application,
    /// Any other failure.
    Internal,
    /// WSDL document is missing or empty.
    DescriptorNotFound,
    /// GET without the `wsdl` marker.
    MethodNotSupported,
}

impl FaultKind {
    /// String representation used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            FaultKind::UnsupportedContentType => "UNSUPPORTED_CONTENT_TYPE",
            FaultKind::Decode => "DECODE",
            FaultKind::Deserialization => "DESERIALIZATION",
            FaultKind::UnknownService => "UNKNOWN_SERVICE",
            FaultKind::Application => "APPLICATION",
            FaultKind::Internal => "INTERNAL",
            FaultKind::DescriptorNotFound => "DESCRIPTOR_NOT_FOUND",
            FaultKind::MethodNotSupported => "METHOD_NOT_SUPPORTED",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SoapError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum SoapError {
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("deserialize failed: {0}")]
    Deserialize(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal: {0}")]
    Internal(String),
}

impl SoapError {
    /// Map an error to the fault kind it surfaces as on the wire.
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            SoapError::UnsupportedContentType(_) => FaultKind::UnsupportedContentType,
            SoapError::Decode(_) => FaultKind::Decode,
            SoapError::Deserialize(_) => FaultKind::Deserialization,
            SoapError::Encode(_)
            | SoapError::Config(_)
            | SoapError::Io(_)
            | SoapError::Internal(_) => FaultKind::Internal,
        }
    }
}

impl From<quick_xml::Error> for SoapError {
    fn from(e: quick_xml::Error) -> Self {
        SoapError::Decode(e.to_string())
    }
}
