//! Protocol modules (SOAP envelope + MIME framing + faults).
//!
//! This module hosts the wire formats:
//! - `envelope`: SOAP 1.1 envelope, kept as raw header/body fragments.
//! - `mime`: `multipart/related` framing for SOAP with attachments.
//! - `fault`: the four-field SOAP Fault.
//! - `charset`: document bytes to text, honoring the declared encoding.
//!
//! All parsers are panic-free: malformed input is reported as `SoapError`
//! instead of panicking or indexing raw buffers, keeping the adapter resilient
//! to hostile traffic.

pub mod charset;
pub mod envelope;
pub mod fault;
pub mod mime;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Result, SoapError};

/// Collect the unescaped text content of the element whose start tag was just read.
///
/// Nested elements are descended into; the reader is left just past the matching end tag.
pub(crate) fn read_text(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut out = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(out),
            Event::End(_) => depth -= 1,
            Event::Text(t) => out.push_str(&t.unescape()?),
            Event::CData(c) => out.push_str(
                std::str::from_utf8(&c).map_err(|e| SoapError::Decode(format!("cdata: {e}")))?,
            ),
            Event::Eof => return Err(SoapError::Decode("unexpected end of element".into())),
            _ => {}
        }
    }
}

/// Byte offset of the closing tag matching the element whose start tag was just read.
pub(crate) fn inner_end(reader: &mut Reader<&[u8]>) -> Result<usize> {
    let mut depth = 0usize;
    loop {
        let before = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(before),
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(SoapError::Decode("unterminated element".into())),
            _ => {}
        }
    }
}

pub(crate) fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}
