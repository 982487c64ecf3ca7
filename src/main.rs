//! The httpecho binary: serves the greeter and echo endpoints on port 8182.

use log::{error, info};

use httpecho::{build_server, ServerConfig};

#[tokio::main]
async fn main() {
    // Log at info level unless RUST_LOG says otherwise
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::default();
    info!("Starting httpecho on {}", config.addr);

    let server = build_server(config).await;
    if let Err(e) = server.start().await {
        error!("Server failed: {e}");
        std::process::exit(1);
    }
}
