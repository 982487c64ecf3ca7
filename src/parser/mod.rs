//! HTTP parser module.
//!
//! This module parses HTTP/1.x request heads and describes how the body
//! that follows them is framed. Reading the body itself is left to the
//! server, which owns the connection.

mod request;
mod method;
mod version;
mod headers;
mod error;

// Re-export public items
pub use request::{BodyFraming, HttpRequest};
pub use method::Method;
pub use version::HttpVersion;
pub use headers::{canonical_header_name, Headers};
pub use error::{BodyError, Error};

// Re-export the parsing functions
pub use request::{decode_path, decode_path_bytes, find_head_end, parse_request};
