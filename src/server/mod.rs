//! HTTP server implementation for httpecho.
//!
//! This module provides a small HTTP/1.x server on top of tokio: a route
//! table, per-connection tasks and a response builder.

mod response;
mod config;
mod connection;
mod error;
mod handler;
mod http_server;

// Re-export public items
pub use response::{HttpResponse, StatusCode, SERVER_NAME};
pub use config::{ServerConfig, DEFAULT_PORT};
pub use error::Error;
pub use handler::{match_routes, HandlerFn, HandlerFuture, Route};
pub use http_server::HttpServer;
