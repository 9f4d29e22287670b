use async_trait::async_trait;

use soapwire_core::{ServiceRequest, ServiceResponse};

use crate::dispatch::{HandlerError, ServiceHandler};

/// Service code answered by `EchoService`.
pub const ECHO_SERVICE_CODE: &str = "echo";

/// Echoes the request payload (and attachments) back inside `<echoResponse>`.
/// Other service codes are not served.
pub struct EchoService {
    descriptor_path: String,
}

impl EchoService {
    pub fn new(descriptor_path: impl Into<String>) -> Self {
        Self {
            descriptor_path: descriptor_path.into(),
        }
    }
}

#[async_trait]
impl ServiceHandler for EchoService {
    async fn handle(
        &self,
        request: &ServiceRequest,
    ) -> Result<Option<ServiceResponse>, HandlerError> {
        if request.service.service_code != ECHO_SERVICE_CODE {
            return Ok(None);
        }
        if let Some(err) = request.error() {
            return Err(HandlerError::Application(format!(
                "refusing request with error: {}",
                err.string
            )));
        }

        let payload = format!("<echoResponse>{}</echoResponse>", request.payload().trim());
        let response = request
            .attachments()
            .iter()
            .cloned()
            .fold(ServiceResponse::success(request, payload), ServiceResponse::with_attachment);
        Ok(Some(response))
    }

    fn descriptor_path(&self) -> String {
        self.descriptor_path.clone()
    }
}
