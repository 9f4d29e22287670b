//! Adapter config loader (strict parsing).

pub mod schema;

use std::fs;

use soapwire_core::error::{Result, SoapError};

pub use schema::{AdapterConfig, DescriptorSection, ServerSection};

pub fn load_from_file(path: &str) -> Result<AdapterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SoapError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<AdapterConfig> {
    let cfg: AdapterConfig =
        serde_yaml::from_str(s).map_err(|e| SoapError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
