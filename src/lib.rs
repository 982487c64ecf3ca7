//! A small HTTP echo server for exercising HTTP clients.
//!
//! Two endpoints are served, by default on port 8182:
//!
//! - `/anything` reflects the request back as JSON: method, path, body,
//!   body length and the first value of every header.
//! - every other path is answered with a greeting naming the path,
//!   `Hello, "/the/path"`, HTML-escaped.
//!
//! # Examples
//!
//! ## Parsing a request head
//!
//! ```
//! use httpecho::parse_request;
//!
//! let request = parse_request(b"GET /a%20b?x=1 HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
//! assert_eq!(request.path, "/a b");
//! assert_eq!(request.host.as_deref(), Some("example.com"));
//! ```
//!
//! ## Running the server
//!
//! ```no_run
//! use httpecho::{build_server, ServerConfig};
//!
//! # async fn run() -> Result<(), httpecho::ServerError> {
//! let server = build_server(ServerConfig::default()).await;
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

// Export the parser module
pub mod parser;

// Export the server module
pub mod server;

// Export the endpoints served by the binary
pub mod endpoints;

// Re-export commonly used items for convenience
pub use endpoints::{build_server, EchoResponse};
pub use parser::{parse_request, Error as ParserError, HttpRequest, HttpVersion, Method};
pub use server::{Error as ServerError, HttpResponse, HttpServer, ServerConfig, StatusCode};
