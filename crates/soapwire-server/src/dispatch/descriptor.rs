//! WSDL retrieval (`GET ?wsdl`).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use soapwire_core::error::Result;

/// Query parameter that selects the WSDL document.
pub const WSDL_MARKER: &str = "wsdl";

/// Storage read of the descriptor document. An empty string means "not found".
#[async_trait]
pub trait DescriptorStore: Send + Sync {
    async fn read_document(&self, path: &Path) -> Result<String>;
}

/// Reads descriptors from the local filesystem. A missing file reads as empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDescriptorStore;

#[async_trait]
impl DescriptorStore for FsDescriptorStore {
    async fn read_document(&self, path: &Path) -> Result<String> {
        match tokio::fs::read_to_string(path).await {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// True when the raw query string carries the `wsdl` parameter (with or without a value).
pub fn has_wsdl_marker(query: Option<&str>) -> bool {
    query
        .unwrap_or("")
        .split('&')
        .any(|pair| pair.split('=').next() == Some(WSDL_MARKER))
}

/// A bare file name (`[-_.A-Za-z0-9]+`) is resolved against `root`; anything else is used as-is.
pub fn resolve(path: &str, root: &Path) -> PathBuf {
    let bare = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if bare {
        let resolved = root.join(path);
        tracing::debug!(path = %resolved.display(), "descriptor file name resolved against root");
        resolved
    } else {
        PathBuf::from(path)
    }
}
