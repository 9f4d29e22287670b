//! soapwire core: transport-agnostic SOAP envelope codec, faults, and message types.
//!
//! This crate defines the wire-level contracts and error surface shared by the
//! HTTP adapter and by applications implementing handlers. It carries no
//! transport or runtime dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `SoapError`/`Result` so a malformed
//! request can never take the adapter down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod codec;
pub mod deserializer;
pub mod error;
pub mod message;
pub mod protocol;
pub mod serializer;

/// Shared result type.
pub use error::{FaultKind, Result, SoapError};
pub use codec::TransportFrame;
pub use deserializer::{RequestDeserializer, XRoadDeserializer};
pub use message::{ServiceRequest, ServiceResponse};
pub use protocol::envelope::{Attachment, Envelope};
pub use protocol::fault::{build_fault, FaultDescriptor};
pub use protocol::mime::MimeHeaders;
