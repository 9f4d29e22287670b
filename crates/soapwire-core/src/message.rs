//! Structured request/response exchanged with the application handler.

use std::fmt;

use crate::protocol::envelope::{Attachment, Envelope};
use crate::protocol::fault::FaultDescriptor;

/// X-Road identifier of the calling member or subsystem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientId {
    pub x_road_instance: String,
    pub member_class: String,
    pub member_code: String,
    pub subsystem_code: Option<String>,
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.x_road_instance, self.member_class, self.member_code)?;
        if let Some(s) = &self.subsystem_code {
            write!(f, "/{s}")?;
        }
        Ok(())
    }
}

/// X-Road identifier of the called service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceId {
    pub x_road_instance: String,
    pub member_class: String,
    pub member_code: String,
    pub subsystem_code: Option<String>,
    pub service_code: String,
    pub service_version: Option<String>,
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.x_road_instance, self.member_class, self.member_code)?;
        if let Some(s) = &self.subsystem_code {
            write!(f, "/{s}")?;
        }
        write!(f, "/{}", self.service_code)?;
        if let Some(v) = &self.service_version {
            write!(f, "/{v}")?;
        }
        Ok(())
    }
}

/// Deserialized request. Owned by one pipeline run; never shared across requests.
#[derive(Debug, Clone)]
pub struct ServiceRequest {
    pub client: ClientId,
    pub service: ServiceId,
    /// Message id (`xrd:id`).
    pub id: String,
    pub user_id: Option<String>,
    pub issue: Option<String>,
    pub protocol_version: String,
    envelope: Envelope,
    error: Option<FaultDescriptor>,
}

impl ServiceRequest {
    pub fn new(
        client: ClientId,
        service: ServiceId,
        id: impl Into<String>,
        protocol_version: impl Into<String>,
        envelope: Envelope,
    ) -> Self {
        Self {
            client,
            service,
            id: id.into(),
            user_id: None,
            issue: None,
            protocol_version: protocol_version.into(),
            envelope,
            error: None,
        }
    }

    /// The envelope the request was deserialized from.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Raw body block (the application payload).
    pub fn payload(&self) -> &str {
        self.envelope.body()
    }

    pub fn attachments(&self) -> &[Attachment] {
        self.envelope.attachments()
    }

    /// Error found while deserializing a syntactically valid request.
    pub fn error(&self) -> Option<&FaultDescriptor> {
        self.error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn set_error(&mut self, error: FaultDescriptor) {
        self.error = Some(error);
    }
}

/// Result of a handled request: a payload or a fault, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Body block XML.
    Payload(String),
    Fault(FaultDescriptor),
}

/// Response built by the handler. Echoes the request header on the wire.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    skeleton: Envelope,
    outcome: ResponseOutcome,
    attachments: Vec<Attachment>,
}

impl ServiceResponse {
    pub fn success(request: &ServiceRequest, payload: impl Into<String>) -> Self {
        Self {
            skeleton: request.envelope().skeleton(),
            outcome: ResponseOutcome::Payload(payload.into()),
            attachments: Vec::new(),
        }
    }

    pub fn fault(request: &ServiceRequest, fault: FaultDescriptor) -> Self {
        Self {
            skeleton: request.envelope().skeleton(),
            outcome: ResponseOutcome::Fault(fault),
            attachments: Vec::new(),
        }
    }

    /// Attachments are only framed for payload responses.
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Prefix, namespaces and header the response envelope is built on.
    pub fn skeleton(&self) -> &Envelope {
        &self.skeleton
    }

    pub fn outcome(&self) -> &ResponseOutcome {
        &self.outcome
    }

    pub fn is_fault(&self) -> bool {
        matches!(self.outcome, ResponseOutcome::Fault(_))
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}
