//! Transport layer (HTTP).
//!
//! Exposes the axum handlers and the conversions between HTTP types and the
//! transport-agnostic core.

pub mod codec;
pub mod http;
