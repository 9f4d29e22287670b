//! HTTP ↔ core conversions.
//!
//! - `HeaderMap` => `MimeHeaders` (transport headers for multipart decoding)
//! - `TransportFrame` => `Response` (status 200, body + content type, written once)

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use soapwire_core::codec::{TransportFrame, TEXT_XML_UTF8};
use soapwire_core::MimeHeaders;

/// Copy transport headers that are valid visible ASCII.
pub fn mime_headers(headers: &HeaderMap) -> MimeHeaders {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect()
}

/// Declared `Content-Type`, if present and readable.
pub fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

/// One response frame. Consumed when converted, so it can only be written once.
pub struct SoapReply(pub TransportFrame);

impl IntoResponse for SoapReply {
    fn into_response(self) -> Response {
        let TransportFrame { body, content_type } = self.0;
        let value = HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(TEXT_XML_UTF8));
        let mut res = Response::new(Body::from(body));
        res.headers_mut().insert(header::CONTENT_TYPE, value);
        res
    }
}
