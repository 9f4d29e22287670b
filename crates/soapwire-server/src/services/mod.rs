//! Built-in demonstration services.

pub mod echo;

pub use echo::EchoService;
