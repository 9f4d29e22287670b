use serde::Deserialize;
use soapwire_core::error::{Result, SoapError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub descriptor: DescriptorSection,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            descriptor: DescriptorSection::default(),
        }
    }
}

impl AdapterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SoapError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.descriptor.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Route the SOAP endpoint is mounted on.
    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
            max_body_bytes: default_max_body_bytes(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.trim().is_empty() {
            return Err(SoapError::Config("server.listen must not be empty".into()));
        }
        if !self.path.starts_with('/') {
            return Err(SoapError::Config("server.path must start with '/'".into()));
        }
        if self.path == "/metrics" {
            return Err(SoapError::Config("server.path must not be /metrics".into()));
        }
        if !(1024..=256 * 1024 * 1024).contains(&self.max_body_bytes) {
            return Err(SoapError::Config(
                "server.max_body_bytes must be between 1024 and 268435456".into(),
            ));
        }
        if !(100..=600_000).contains(&self.request_timeout_ms) {
            return Err(SoapError::Config(
                "server.request_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_path() -> String {
    "/".into()
}
fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_request_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptorSection {
    /// Deployment root that bare WSDL file names are resolved against.
    #[serde(default = "default_descriptor_root")]
    pub root: String,
}

impl Default for DescriptorSection {
    fn default() -> Self {
        Self {
            root: default_descriptor_root(),
        }
    }
}

impl DescriptorSection {
    pub fn validate(&self) -> Result<()> {
        if self.root.trim().is_empty() {
            return Err(SoapError::Config("descriptor.root must not be empty".into()));
        }
        Ok(())
    }
}

fn default_descriptor_root() -> String {
    "./resources".into()
}
