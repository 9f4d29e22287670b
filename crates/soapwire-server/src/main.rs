//! soapwire adapter binary.
//!
//! - SOAP endpoint on `server.path`: POST envelopes, GET `?wsdl`
//! - Built-in `EchoService` as the application handler
//! - Config from the first argument, `soapwire.yaml` by default

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use soapwire_server::{app_state, config, router, services::EchoService};

const DEFAULT_CONFIG: &str = "soapwire.yaml";
const ECHO_WSDL: &str = "echo.wsdl";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("soapwire_server=info,soapwire_core=info")),
        )
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.server.listen.parse()?;

    let state = app_state::AppState::new(cfg, Arc::new(EchoService::new(ECHO_WSDL)))?;
    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "soapwire starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    axum::serve(listener, app).await?;
    Ok(())
}
