//! Shared application state for the soapwire adapter.
//!
//! Built once at startup: the deserializer, the descriptor store and the
//! precomputed fault bodies are created here and never mutated afterwards.
//! Startup errors are explicit (Result instead of panic).

use std::path::PathBuf;
use std::sync::Arc;

use soapwire_core::error::Result;
use soapwire_core::XRoadDeserializer;

use crate::bootstrap::FaultBodies;
use crate::config::AdapterConfig;
use crate::dispatch::{DescriptorStore, FsDescriptorStore, RequestPipeline, ServiceHandler};
use crate::obs::AdapterMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: Arc<AdapterMetrics>,
}

struct AppStateInner {
    cfg: AdapterConfig,
    pipeline: RequestPipeline,
}

impl AppState {
    /// Build application state with the filesystem descriptor store.
    pub fn new(cfg: AdapterConfig, handler: Arc<dyn ServiceHandler>) -> Result<Self> {
        Self::with_store(cfg, handler, Arc::new(FsDescriptorStore))
    }

    /// Build application state with an explicit descriptor store.
    pub fn with_store(
        cfg: AdapterConfig,
        handler: Arc<dyn ServiceHandler>,
        store: Arc<dyn DescriptorStore>,
    ) -> Result<Self> {
        tracing::debug!("initializing adapter state");
        cfg.validate()?;

        let metrics = Arc::new(AdapterMetrics::default());
        let faults = Arc::new(FaultBodies::precompute()?);
        let pipeline = RequestPipeline::new(
            handler,
            Arc::new(XRoadDeserializer::new()),
            store,
            faults,
            PathBuf::from(&cfg.descriptor.root),
            Arc::clone(&metrics),
        );

        tracing::debug!("adapter state initialized");
        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, pipeline }),
            metrics,
        })
    }

    pub fn cfg(&self) -> &AdapterConfig {
        &self.inner.cfg
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.inner.pipeline
    }

    pub fn metrics(&self) -> Arc<AdapterMetrics> {
        Arc::clone(&self.metrics)
    }
}
