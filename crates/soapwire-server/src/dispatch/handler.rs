//! Application handler contract.

use async_trait::async_trait;
use thiserror::Error;

use soapwire_core::{ServiceRequest, ServiceResponse};

/// Failure raised by an application handler.
///
/// The two variants are treated differently by the pipeline: an application
/// failure re-raises the request's own error when it has one, a transport
/// failure is always reported as an internal error.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("application error: {0}")]
    Application(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Application capability injected into the adapter. The sole extension point.
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    /// `Ok(None)` means the handler does not serve the requested service.
    async fn handle(
        &self,
        request: &ServiceRequest,
    ) -> Result<Option<ServiceResponse>, HandlerError>;

    /// Location of the WSDL document: a bare file name or a path.
    fn descriptor_path(&self) -> String;
}
