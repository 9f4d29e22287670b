//! SOAP 1.1 envelope.
//!
//! The header and body blocks are stored as raw XML fragments (lazy parsing by
//! deserializers and handlers). Namespace declarations found on the `Envelope`,
//! `Header` and `Body` start tags are kept so the fragments stay namespace
//! well-formed when re-rendered.

use bytes::Bytes;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Reader};

use crate::error::{Result, SoapError};
use crate::protocol::{inner_end, is_blank};

/// SOAP 1.1 envelope namespace.
pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Prefix used for envelopes created by this crate.
pub const DEFAULT_PREFIX: &str = "SOAP-ENV";

/// Binary MIME part carried next to the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// `Content-ID` without angle brackets.
    pub content_id: Option<String>,
    /// `Content-Type` of the part.
    pub content_type: String,
    /// Raw part content.
    pub data: Bytes,
}

impl Attachment {
    pub fn new(content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            content_id: None,
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn with_content_id(mut self, id: impl Into<String>) -> Self {
        self.content_id = Some(id.into());
        self
    }
}

/// Namespace declaration: `None` prefix is the default namespace (`xmlns="..."`).
pub type NamespaceDecl = (Option<String>, String);

/// Parsed SOAP envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    prefix: Option<String>,
    namespaces: Vec<NamespaceDecl>,
    header_namespaces: Vec<NamespaceDecl>,
    body_namespaces: Vec<NamespaceDecl>,
    header: Option<String>,
    body: String,
    attachments: Vec<Attachment>,
}

impl Envelope {
    /// Envelope with the default prefix and the given body fragment.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            prefix: Some(DEFAULT_PREFIX.to_string()),
            namespaces: Vec::new(),
            header_namespaces: Vec::new(),
            body_namespaces: Vec::new(),
            header: None,
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_namespace(mut self, prefix: Option<&str>, uri: impl Into<String>) -> Self {
        self.namespaces.push((prefix.map(str::to_string), uri.into()));
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn namespaces(&self) -> &[NamespaceDecl] {
        &self.namespaces
    }

    /// Declarations on the `Header` start tag.
    pub fn header_namespaces(&self) -> &[NamespaceDecl] {
        &self.header_namespaces
    }

    /// Declarations on the `Body` start tag.
    pub fn body_namespaces(&self) -> &[NamespaceDecl] {
        &self.body_namespaces
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// Same prefix, namespaces and header; empty body and no attachments.
    ///
    /// Body-level declarations are kept: a response body is written in the
    /// request's namespace context.
    pub fn skeleton(&self) -> Self {
        Self {
            prefix: self.prefix.clone(),
            namespaces: self.namespaces.clone(),
            header_namespaces: self.header_namespaces.clone(),
            body_namespaces: self.body_namespaces.clone(),
            header: self.header.clone(),
            body: String::new(),
            attachments: Vec::new(),
        }
    }

    /// Local name of the first element inside the body, if any.
    pub fn body_element(&self) -> Option<String> {
        let mut reader = Reader::from_str(&self.body);
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned())
                }
                Ok(Event::Eof) | Err(_) => return None,
                Ok(_) => {}
            }
        }
    }

    fn qualify(&self, local: &str) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{local}"),
            None => local.to_string(),
        }
    }

    /// Render the envelope document (attachments are framed by `mime`).
    pub fn to_xml(&self) -> String {
        let env = self.qualify("Envelope");
        let mut out = String::with_capacity(self.body.len() + 256);
        out.push('<');
        out.push_str(&env);
        push_xmlns(&mut out, self.prefix.as_deref(), SOAP_ENV_NS);
        push_decls(&mut out, &self.namespaces);
        out.push('>');

        if let Some(header) = &self.header {
            push_block(&mut out, &self.qualify("Header"), &self.header_namespaces, header);
        }
        let body = self.qualify("Body");
        out.push_str(&format!("<{body}"));
        push_decls(&mut out, &self.body_namespaces);
        out.push_str(&format!(">{}</{body}>", self.body));

        out.push_str(&format!("</{env}>"));
        out
    }

    /// Parse a SOAP 1.1 envelope document.
    pub fn parse(xml: &str) -> Result<Self> {
        let xml = xml.trim_start_matches('\u{feff}');
        check_namespaces(xml)?;
        let mut reader = Reader::from_str(xml);

        let root = loop {
            match reader.read_event()? {
                Event::Start(e) => break e.into_owned(),
                Event::Text(t) if is_blank(&t) => {}
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => return Err(decode_err("empty document")),
                _ => return Err(decode_err("unexpected content before envelope")),
            }
        };

        if root.local_name().as_ref() != b"Envelope" {
            return Err(decode_err("root element is not Envelope"));
        }
        let prefix = element_prefix(&root)?;
        let (soap_declared, namespaces) = split_namespaces(&root, prefix.as_deref())?;
        if !soap_declared {
            return Err(decode_err("envelope is not in the SOAP 1.1 namespace"));
        }

        let mut header = None;
        let mut body = None;
        let mut header_namespaces = Vec::new();
        let mut body_namespaces = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let slot = child_slot(&e, prefix.as_deref(), header.is_some(), body.is_some())?;
                    let decls = namespace_decls(&e)?;
                    let start = reader.buffer_position() as usize;
                    let end = inner_end(&mut reader)?;
                    let inner = xml
                        .get(start..end)
                        .ok_or_else(|| decode_err("invalid element span"))?
                        .to_string();
                    match slot {
                        Slot::Header => (header, header_namespaces) = (Some(inner), decls),
                        Slot::Body => (body, body_namespaces) = (Some(inner), decls),
                    }
                }
                Event::Empty(e) => {
                    let slot = child_slot(&e, prefix.as_deref(), header.is_some(), body.is_some())?;
                    let decls = namespace_decls(&e)?;
                    match slot {
                        Slot::Header => (header, header_namespaces) = (Some(String::new()), decls),
                        Slot::Body => (body, body_namespaces) = (Some(String::new()), decls),
                    }
                }
                Event::End(_) => break,
                Event::Text(t) if is_blank(&t) => {}
                Event::Comment(_) => {}
                Event::Eof => return Err(decode_err("unterminated envelope")),
                _ => return Err(decode_err("unexpected content in envelope")),
            }
        }

        loop {
            match reader.read_event()? {
                Event::Eof => break,
                Event::Text(t) if is_blank(&t) => {}
                Event::Comment(_) | Event::PI(_) => {}
                _ => return Err(decode_err("trailing content after envelope")),
            }
        }

        let body = body.ok_or_else(|| decode_err("envelope has no Body"))?;
        Ok(Self {
            prefix,
            namespaces,
            header_namespaces,
            body_namespaces,
            header,
            body,
            attachments: Vec::new(),
        })
    }
}

enum Slot {
    Header,
    Body,
}

fn child_slot(
    e: &BytesStart<'_>,
    prefix: Option<&str>,
    seen_header: bool,
    seen_body: bool,
) -> Result<Slot> {
    if element_prefix(e)?.as_deref() != prefix {
        return Err(decode_err("envelope child outside the SOAP namespace"));
    }
    match e.local_name().as_ref() {
        b"Header" if !seen_header && !seen_body => Ok(Slot::Header),
        b"Body" if !seen_body => Ok(Slot::Body),
        _ => Err(decode_err("unexpected envelope child")),
    }
}

fn element_prefix(e: &BytesStart<'_>) -> Result<Option<String>> {
    match e.name().prefix() {
        Some(p) => Ok(Some(utf8(p.as_ref())?.to_string())),
        None => Ok(None),
    }
}

/// Returns whether the envelope prefix is bound to the SOAP namespace, and every other declaration.
fn split_namespaces(e: &BytesStart<'_>, prefix: Option<&str>) -> Result<(bool, Vec<NamespaceDecl>)> {
    let mut soap_declared = false;
    let mut rest = Vec::new();
    for (declared, uri) in namespace_decls(e)? {
        if declared.as_deref() == prefix && uri == SOAP_ENV_NS {
            soap_declared = true;
        } else {
            rest.push((declared, uri));
        }
    }
    Ok((soap_declared, rest))
}

/// `xmlns` / `xmlns:p` attributes of a start tag, in document order.
fn namespace_decls(e: &BytesStart<'_>) -> Result<Vec<NamespaceDecl>> {
    let mut decls = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = attr.key.as_ref();
        let declared = if key == b"xmlns" {
            None
        } else if let Some(p) = key.strip_prefix(b"xmlns:") {
            Some(utf8(p)?.to_string())
        } else {
            continue;
        };
        decls.push((declared, attr.unescape_value()?.into_owned()));
    }
    Ok(decls)
}

/// Fails when an element or attribute uses a prefix with no declaration in scope.
pub fn check_namespaces(xml: &str) -> Result<()> {
    let mut reader = NsReader::from_str(xml);
    loop {
        let (element_ns, event) = reader.read_resolved_event()?;
        let start = match event {
            Event::Start(e) | Event::Empty(e) => e,
            Event::Eof => return Ok(()),
            _ => continue,
        };
        if let ResolveResult::Unknown(p) = element_ns {
            return Err(unbound(&p));
        }
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = attr.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") || key.starts_with(b"xml:") {
                continue;
            }
            if let (ResolveResult::Unknown(p), _) = reader.resolve_attribute(attr.key) {
                return Err(unbound(&p));
            }
        }
    }
}

fn unbound(prefix: &[u8]) -> SoapError {
    SoapError::Decode(format!(
        "namespace prefix '{}' is not declared",
        String::from_utf8_lossy(prefix)
    ))
}

fn push_block(out: &mut String, tag: &str, decls: &[NamespaceDecl], content: &str) {
    out.push_str(&format!("<{tag}"));
    push_decls(out, decls);
    if content.is_empty() {
        out.push_str("/>");
    } else {
        out.push_str(&format!(">{content}</{tag}>"));
    }
}

fn push_decls(out: &mut String, decls: &[NamespaceDecl]) {
    for (prefix, uri) in decls {
        push_xmlns(out, prefix.as_deref(), uri);
    }
}

fn push_xmlns(out: &mut String, prefix: Option<&str>, uri: &str) {
    match prefix {
        Some(p) => out.push_str(&format!(" xmlns:{p}=\"{}\"", escape(uri))),
        None => out.push_str(&format!(" xmlns=\"{}\"", escape(uri))),
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| SoapError::Decode(format!("invalid utf-8 name: {e}")))
}

fn decode_err(msg: &str) -> SoapError {
    SoapError::Decode(msg.to_string())
}
