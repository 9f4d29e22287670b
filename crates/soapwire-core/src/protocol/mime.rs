//! `multipart/related` framing (SOAP with attachments).
//!
//! Parsing rules:
//! - Never index raw buffers; use `get` and checked offsets.
//! - The boundary always comes from the `Content-Type` parameters on input and
//!   from the rendered body on output, never from a second source.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, SoapError};
use crate::protocol::charset;
use crate::protocol::envelope::Attachment;

/// Content-ID given to the root (envelope) part on output.
pub const ROOT_CONTENT_ID: &str = "soapwire-root";

/// Case-insensitive MIME header list (transport or per-part headers).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeHeaders {
    entries: Vec<(String, String)>,
}

impl MimeHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value for `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MimeHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Lower-cased media type of a `Content-Type` value (parameters stripped).
pub fn media_type(content_type: &str) -> String {
    split_params(content_type)
        .first()
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Value of a `Content-Type` parameter, unquoted. Parameter names are case-insensitive.
pub fn param(content_type: &str, name: &str) -> Option<String> {
    split_params(content_type).into_iter().skip(1).find_map(|p| {
        let (k, v) = p.split_once('=')?;
        if !k.trim().eq_ignore_ascii_case(name) {
            return None;
        }
        let v = v.trim();
        let v = v
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(v);
        Some(v.to_string())
    })
}

/// Split on `;` outside double quotes.
fn split_params(value: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                out.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&value[start..]);
    out
}

/// Decoded multipart message: root part text plus attachment parts.
#[derive(Debug)]
pub struct Multipart {
    pub root: String,
    pub attachments: Vec<Attachment>,
}

struct Part {
    headers: MimeHeaders,
    content: Bytes,
}

/// Parse a `multipart/related` body. `content_type` must carry the `boundary` parameter.
pub fn parse(body: &Bytes, content_type: &str) -> Result<Multipart> {
    let boundary = param(content_type, "boundary")
        .filter(|b| !b.is_empty())
        .ok_or_else(|| decode_err("multipart content type has no boundary"))?;
    let start = param(content_type, "start").map(|s| strip_angle(&s).to_string());
    let delim = format!("--{boundary}").into_bytes();

    let mut pos =
        find_delimiter(body, &delim, 0).ok_or_else(|| decode_err("boundary not found in body"))?;
    let mut parts = Vec::new();
    loop {
        let after = pos + delim.len();
        let rest = body.get(after..).ok_or_else(|| decode_err("truncated multipart body"))?;
        if rest.starts_with(b"--") {
            break;
        }
        let content_start = find(body, b"\n", after)
            .map(|i| i + 1)
            .ok_or_else(|| decode_err("truncated part delimiter"))?;
        let next = find_delimiter(body, &delim, content_start)
            .ok_or_else(|| decode_err("unterminated multipart body"))?;

        let mut end = next;
        if end > content_start && body.get(end - 1) == Some(&b'\n') {
            end -= 1;
            if end > content_start && body.get(end - 1) == Some(&b'\r') {
                end -= 1;
            }
        }
        parts.push(parse_part(body.slice(content_start..end))?);
        pos = next;
    }

    if parts.is_empty() {
        return Err(decode_err("multipart body has no parts"));
    }

    let root_idx = match &start {
        Some(id) => parts
            .iter()
            .position(|p| p.headers.get("content-id").map(strip_angle) == Some(id.as_str()))
            .ok_or_else(|| decode_err("start part not found"))?,
        None => 0,
    };
    let root = parts.remove(root_idx);
    let root = charset::decode_text(&root.content, root.headers.get("content-type").unwrap_or(""))?;

    let attachments = parts
        .into_iter()
        .map(|p| Attachment {
            content_id: p.headers.get("content-id").map(|v| strip_angle(v).to_string()),
            content_type: p
                .headers
                .get("content-type")
                .unwrap_or("application/octet-stream")
                .to_string(),
            data: p.content,
        })
        .collect();

    Ok(Multipart { root, attachments })
}

fn parse_part(raw: Bytes) -> Result<Part> {
    let (header_end, content_start) = if raw.starts_with(b"\r\n") {
        (0, 2)
    } else if raw.starts_with(b"\n") {
        (0, 1)
    } else if let Some(i) = find(&raw, b"\r\n\r\n", 0) {
        (i, i + 4)
    } else if let Some(i) = find(&raw, b"\n\n", 0) {
        (i, i + 2)
    } else {
        return Err(decode_err("part has no header terminator"));
    };

    let head = raw.get(..header_end).ok_or_else(|| decode_err("invalid part header"))?;
    let head = std::str::from_utf8(head).map_err(|_| decode_err("part headers are not utf-8"))?;
    let mut headers = MimeHeaders::new();
    for line in head.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let (k, v) = line
            .split_once(':')
            .ok_or_else(|| decode_err("malformed part header"))?;
        headers.insert(k.trim(), v.trim());
    }

    Ok(Part {
        headers,
        content: raw.slice(content_start..),
    })
}

/// Render the root document and attachments with the given boundary.
pub fn render(root_xml: &str, attachments: &[Attachment], boundary: &str) -> Result<Bytes> {
    let mut out = BytesMut::with_capacity(root_xml.len() + 512);
    put_part_head(&mut out, boundary, "text/xml; charset=UTF-8", "8bit", Some(ROOT_CONTENT_ID))?;
    out.put_slice(root_xml.as_bytes());
    out.put_slice(b"\r\n");

    for a in attachments {
        put_part_head(&mut out, boundary, &a.content_type, "binary", a.content_id.as_deref())?;
        out.put_slice(&a.data);
        out.put_slice(b"\r\n");
    }

    out.put_slice(format!("--{boundary}--\r\n").as_bytes());
    Ok(out.freeze())
}

fn put_part_head(
    out: &mut BytesMut,
    boundary: &str,
    content_type: &str,
    transfer_encoding: &str,
    content_id: Option<&str>,
) -> Result<()> {
    for value in [content_type, content_id.unwrap_or("")] {
        if value.contains(['\r', '\n']) {
            return Err(SoapError::Encode("line break in part header".into()));
        }
    }
    out.put_slice(format!("--{boundary}\r\n").as_bytes());
    out.put_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
    out.put_slice(format!("Content-Transfer-Encoding: {transfer_encoding}\r\n").as_bytes());
    if let Some(id) = content_id {
        out.put_slice(format!("Content-ID: <{id}>\r\n").as_bytes());
    }
    out.put_slice(b"\r\n");
    Ok(())
}

/// Fresh boundary token for an outgoing message.
pub fn new_boundary() -> String {
    format!("----=_Part_{}", uuid::Uuid::new_v4().simple())
}

/// Boundary actually used by a rendered body: its first delimiter line.
pub fn extract_boundary(body: &[u8]) -> Option<String> {
    let start = body.iter().position(|b| !b.is_ascii_whitespace())?;
    let rest = body.get(start..)?;
    let end = rest
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(rest.len());
    let line = std::str::from_utf8(rest.get(..end)?).ok()?.trim();
    let token = line.strip_prefix("--")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn strip_angle(v: &str) -> &str {
    let v = v.trim();
    v.strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(v)
}

/// Next delimiter line: `--boundary` at the start of a line, followed by `--`,
/// optional linear whitespace and a line break, or the end of the body.
fn find_delimiter(body: &[u8], delim: &[u8], from: usize) -> Option<usize> {
    let mut at = from;
    loop {
        let pos = find(body, delim, at)?;
        let line_start = pos == 0 || body.get(pos - 1) == Some(&b'\n');
        let rest = body.get(pos + delim.len()..).unwrap_or(&[]);
        let trailer_ok = rest.starts_with(b"--") || {
            let ws = rest.iter().take_while(|b| matches!(b, b' ' | b'\t')).count();
            matches!(rest.get(ws..), Some([]) | Some([b'\n', ..]) | Some([b'\r', b'\n', ..]))
        };
        if line_start && trailer_ok {
            return Some(pos);
        }
        at = pos + 1;
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn decode_err(msg: &str) -> SoapError {
    SoapError::Decode(msg.to_string())
}
