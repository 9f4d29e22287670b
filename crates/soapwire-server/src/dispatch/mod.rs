//! Request pipeline and its injected capabilities.
//!
//! Re-exports the pipeline, the handler trait and the descriptor store so
//! downstream consumers can depend on this module directly.

pub mod descriptor;
pub mod handler;
pub mod pipeline;

pub use descriptor::{DescriptorStore, FsDescriptorStore};
pub use handler::{HandlerError, ServiceHandler};
pub use pipeline::RequestPipeline;
