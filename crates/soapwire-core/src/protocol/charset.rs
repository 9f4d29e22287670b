//! Document text decoding.
//!
//! The charset comes from a byte-order mark, then the `charset` parameter of
//! the part's `Content-Type`, then the XML declaration. UTF-8 is the default.
//! Supported: UTF-8, ISO-8859-1 / US-ASCII, UTF-16 (LE/BE).

use crate::error::{Result, SoapError};
use crate::protocol::mime;

/// Only the start of the document is searched for an XML declaration.
const DECL_SCAN_LIMIT: usize = 256;

/// Decode `bytes` into text according to the declared charset.
pub fn decode_text(bytes: &[u8], content_type: &str) -> Result<String> {
    match bytes {
        [0xEF, 0xBB, 0xBF, ..] => return utf8(bytes),
        [0xFF, 0xFE, ..] => return utf16(bytes, u16::from_le_bytes),
        [0xFE, 0xFF, ..] => return utf16(bytes, u16::from_be_bytes),
        _ => {}
    }

    let label = mime::param(content_type, "charset")
        .filter(|c| !c.trim().is_empty())
        .or_else(|| declared_encoding(bytes))
        .unwrap_or_else(|| "utf-8".to_string())
        .trim()
        .to_ascii_lowercase();

    match label.as_str() {
        "utf-8" | "utf8" => utf8(bytes),
        "iso-8859-1" | "iso_8859-1" | "latin1" | "l1" | "us-ascii" | "ascii" => {
            Ok(bytes.iter().map(|&b| char::from(b)).collect())
        }
        "utf-16le" => utf16(bytes, u16::from_le_bytes),
        "utf-16" | "utf-16be" => utf16(bytes, u16::from_be_bytes),
        other => Err(SoapError::Decode(format!("unsupported charset: {other}"))),
    }
}

fn utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| SoapError::Decode("body is not valid utf-8".into()))
}

fn utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(SoapError::Decode("odd length utf-16 body".into()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .filter_map(|c| <[u8; 2]>::try_from(c).ok().map(unit))
        .collect();
    String::from_utf16(&units).map_err(|_| SoapError::Decode("body is not valid utf-16".into()))
}

/// `encoding` pseudo-attribute of a leading `<?xml ...?>` declaration.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = bytes.get(..bytes.len().min(DECL_SCAN_LIMIT))?;
    if !head.starts_with(b"<?xml") {
        return None;
    }
    let end = head.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(head.get(..end)?).ok()?;
    let rest = decl.split_once("encoding")?.1.trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = rest.get(1..)?.split(quote).next()?;
    Some(value.to_string())
}
