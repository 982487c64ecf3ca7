//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};

/// The port the echo server listens on.
pub const DEFAULT_PORT: u16 = 8182;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// The size of each read from a connection.
    pub read_buffer_size: usize,
    /// The largest request head (request line plus headers) accepted.
    pub max_header_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: 1024,
            read_buffer_size: 8192,
            max_header_bytes: 1 << 20,
        }
    }
}
