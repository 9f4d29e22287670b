//! Top-level facade crate for soapwire.
//!
//! Re-exports the envelope core and the HTTP adapter so applications can depend on a single crate.

pub mod core {
    pub use soapwire_core::*;
}

pub mod server {
    pub use soapwire_server::*;
}
