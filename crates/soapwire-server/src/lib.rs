//! soapwire server library entry.
//!
//! This crate wires the HTTP transport, the request pipeline, the descriptor
//! branch and the bootstrap singletons into a SOAP adapter around an
//! application-supplied `ServiceHandler`. It is consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod dispatch;
pub mod obs;
pub mod router;
pub mod services;
pub mod transport;

pub use dispatch::{HandlerError, ServiceHandler};
