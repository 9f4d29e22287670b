//! Envelope codec: transport bytes ↔ `Envelope`.
//!
//! - `text/xml` bodies → plain envelope
//! - `multipart/related` bodies → envelope (root part) + attachments
//! - outbound: plain document, or multipart when the envelope carries attachments

use bytes::Bytes;

use crate::error::{Result, SoapError};
use crate::protocol::envelope::Envelope;
use crate::protocol::charset;
use crate::protocol::mime::{self, MimeHeaders};

pub const TEXT_XML: &str = "text/xml";
pub const MULTIPART_RELATED: &str = "multipart/related";
/// Content type of every plain-document response.
pub const TEXT_XML_UTF8: &str = "text/xml; charset=UTF-8";

/// Final bytes and content type for one HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFrame {
    pub body: Bytes,
    pub content_type: String,
}

impl TransportFrame {
    /// Plain-document frame.
    pub fn xml(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            content_type: TEXT_XML_UTF8.to_string(),
        }
    }

    pub fn is_multipart(&self) -> bool {
        self.content_type.starts_with(MULTIPART_RELATED)
    }
}

/// Encoded envelope before it becomes a frame.
#[derive(Debug, Clone)]
pub struct EncodedMessage {
    pub body: Bytes,
    pub multipart: bool,
    /// Delimiter read back from `body`; present iff `multipart`.
    pub boundary: Option<String>,
}

impl EncodedMessage {
    pub fn content_type(&self) -> String {
        match (&self.boundary, self.multipart) {
            (Some(b), true) => format!(
                "{MULTIPART_RELATED}; type=\"{TEXT_XML}\"; boundary=\"{b}\"; charset=UTF-8"
            ),
            _ => TEXT_XML_UTF8.to_string(),
        }
    }

    pub fn into_frame(self) -> TransportFrame {
        let content_type = self.content_type();
        TransportFrame {
            body: self.body,
            content_type,
        }
    }
}

/// Decode an inbound body according to its declared content type.
///
/// For `multipart/related` the `Content-Type` in `headers` (falling back to the
/// declared value) supplies the MIME parameters.
pub fn decode(body: &Bytes, content_type: &str, headers: &MimeHeaders) -> Result<Envelope> {
    let declared = content_type.trim().to_ascii_lowercase();

    if declared.starts_with(TEXT_XML) {
        let xml = charset::decode_text(body, content_type)?;
        return Envelope::parse(&xml);
    }

    if declared.starts_with(MULTIPART_RELATED) {
        let full = headers.get("content-type").unwrap_or(content_type);
        let parts = mime::parse(body, full)?;
        tracing::trace!(
            attachments = parts.attachments.len(),
            ids = ?parts.attachments.iter().map(|a| a.content_id.as_deref()).collect::<Vec<_>>(),
            "multipart request decoded"
        );
        return Ok(Envelope::parse(&parts.root)?.with_attachments(parts.attachments));
    }

    Err(SoapError::UnsupportedContentType(content_type.to_string()))
}

/// Encode an envelope. Fails on a serialization error or an empty body.
pub fn encode(envelope: &Envelope) -> Result<EncodedMessage> {
    let xml = envelope.to_xml();

    if !envelope.has_attachments() {
        if xml.is_empty() {
            return Err(SoapError::Encode("empty body".into()));
        }
        return Ok(EncodedMessage {
            body: Bytes::from(xml),
            multipart: false,
            boundary: None,
        });
    }

    let body = mime::render(&xml, envelope.attachments(), &mime::new_boundary())?;
    if body.is_empty() {
        return Err(SoapError::Encode("empty body".into()));
    }
    let boundary = mime::extract_boundary(&body)
        .ok_or_else(|| SoapError::Encode("no boundary in multipart body".into()))?;
    Ok(EncodedMessage {
        body,
        multipart: true,
        boundary: Some(boundary),
    })
}
