//! Error types for the HTTP parser.

use std::io;

use thiserror::Error;

/// Errors that can occur during HTTP request parsing.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP method in the request is not a valid token.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The request target is invalid or missing.
    #[error("Invalid request target: {0}")]
    InvalidPath(String),

    /// The request line is malformed (wrong format or missing components).
    #[error("Malformed request line: {0}")]
    MalformedRequestLine(String),

    /// The HTTP version in the request is not supported.
    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    /// A required header is missing from the request.
    #[error("Required header is missing: {0}")]
    MissingHeader(String),

    /// A header in the request has an invalid format.
    #[error("Invalid header format")]
    InvalidHeaderFormat,

    /// The Content-Length header is unparsable or repeated with different values.
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// The request uses a transfer coding other than chunked.
    #[error("Unsupported transfer encoding: {0}")]
    UnsupportedTransferEncoding(String),

    /// The request is empty.
    #[error("Empty request")]
    EmptyRequest,
}

/// A failure while reading a request body.
///
/// The description is kept verbatim so it can be reported back to the
/// client as-is. Cloneable so the outcome can live on the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BodyError {
    kind: io::ErrorKind,
    message: String,
}

impl BodyError {
    /// Create a body error with the given kind and description.
    pub fn new(kind: io::ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The peer closed the connection before the whole body arrived.
    pub fn unexpected_eof() -> Self {
        Self::new(io::ErrorKind::UnexpectedEof, "unexpected EOF")
    }

    /// The chunked framing of the body could not be decoded.
    pub fn malformed_chunk(message: impl Into<String>) -> Self {
        Self::new(io::ErrorKind::InvalidData, message)
    }

    /// The kind of I/O failure behind this error.
    pub fn kind(&self) -> io::ErrorKind {
        self.kind
    }
}

impl From<io::Error> for BodyError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            return Self::unexpected_eof();
        }
        Self::new(err.kind(), err.to_string())
    }
}
