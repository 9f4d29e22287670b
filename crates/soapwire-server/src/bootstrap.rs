//! Precomputed fault bodies.
//!
//! The three static faults served on hot paths are encoded once at startup and
//! shared read-only behind `Arc`. Failing to encode them is a startup error.

use bytes::Bytes;

use soapwire_core::codec::{self, TransportFrame};
use soapwire_core::error::Result;
use soapwire_core::{build_fault, FaultDescriptor};

#[derive(Debug, Clone)]
pub struct FaultBodies {
    get_not_supported: Bytes,
    wsdl_not_found: Bytes,
    internal_error: Bytes,
}

impl FaultBodies {
    pub fn precompute() -> Result<Self> {
        tracing::debug!("encoding canned fault bodies");
        Ok(Self {
            get_not_supported: encode(&FaultDescriptor::get_not_supported())?,
            wsdl_not_found: encode(&FaultDescriptor::wsdl_not_found())?,
            internal_error: encode(&FaultDescriptor::internal_error())?,
        })
    }

    pub fn get_not_supported(&self) -> TransportFrame {
        TransportFrame::xml(self.get_not_supported.clone())
    }

    pub fn wsdl_not_found(&self) -> TransportFrame {
        TransportFrame::xml(self.wsdl_not_found.clone())
    }

    pub fn internal_error(&self) -> TransportFrame {
        TransportFrame::xml(self.internal_error.clone())
    }
}

fn encode(fault: &FaultDescriptor) -> Result<Bytes> {
    Ok(codec::encode(&build_fault(fault))?.body)
}
