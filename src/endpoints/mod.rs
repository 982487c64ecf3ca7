//! The two endpoints of the echo server.
//!
//! - `/` and every path without a more specific route: [`greeter::greet`]
//! - `/anything`: [`echo::echo`]

pub mod echo;
pub mod greeter;
mod tests;

pub use echo::EchoResponse;

use crate::server::{HttpServer, ServerConfig};

/// Pattern of the greeter route; as a subtree it catches every path.
pub const GREETER_PATH: &str = "/";

/// Path of the echo route.
pub const ECHO_PATH: &str = "/anything";

/// Register both endpoints on `server`. Both accept any method.
pub async fn register(server: &HttpServer) {
    server.handle(GREETER_PATH, greeter::greet).await;
    server.handle(ECHO_PATH, echo::echo).await;
}

/// Create a server with both endpoints registered.
pub async fn build_server(config: ServerConfig) -> HttpServer {
    let server = HttpServer::new(config);
    register(&server).await;
    server
}
