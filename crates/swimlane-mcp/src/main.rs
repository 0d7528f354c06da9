mod init;
mod server;

use rmcp::ServiceExt;
use swimlane_core::{read_settings, FileStore};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::server::SwimlaneServer;

/// Logs go to stderr; stdout carries the MCP transport.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle `swimlane-mcp init` subcommand
    if std::env::args().nth(1).as_deref() == Some("init") {
        return init::init_project();
    }

    init_tracing();
    let settings = read_settings();
    let store = FileStore::open_default();
    tracing::info!(data_dir = %store.dir().display(), "starting swimlane MCP server");

    let service = SwimlaneServer::new(settings, store)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!("MCP server error: {}", e))?;
    service.waiting().await?;
    Ok(())
}
