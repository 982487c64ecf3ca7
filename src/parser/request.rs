//! HTTP request parsing and representation.

use std::str::FromStr;

use crate::parser::error::{BodyError, Error};
use crate::parser::headers::Headers;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;

/// How the body of a request is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body follows the head.
    Empty,
    /// Exactly this many bytes follow the head.
    Length(u64),
    /// The body uses chunked transfer coding.
    Chunked,
}

/// Represents an HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target as sent on the request line
    pub target: String,
    /// The decoded request path, without the query string
    pub path: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The value of the Host header, which is not kept in `headers`
    pub host: Option<String>,
    /// The HTTP headers
    pub headers: Headers,
    path_bytes: Vec<u8>,
    body: Result<Vec<u8>, BodyError>,
}

impl HttpRequest {
    /// Create a new HTTP request.
    ///
    /// The path is derived from `target`: the query string is dropped and
    /// percent-escapes are decoded. A `Host` entry in `headers` is moved to
    /// [`HttpRequest::host`].
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `target` - The request target
    /// * `version` - The HTTP version
    /// * `headers` - The HTTP headers
    ///
    /// # Returns
    ///
    /// A new HTTP request with an empty body, or an error if the target is invalid
    pub fn new(
        method: Method,
        target: impl Into<String>,
        version: HttpVersion,
        mut headers: Headers,
    ) -> Result<Self, Error> {
        let target = target.into();
        let path_bytes = decode_path_bytes(&target)?;
        let path = String::from_utf8_lossy(&path_bytes).into_owned();
        let host = headers.remove("Host");

        Ok(Self {
            method,
            target,
            path,
            version,
            host,
            headers,
            path_bytes,
            body: Ok(Vec::new()),
        })
    }

    /// Create a new HTTP request with a body.
    pub fn with_body(
        method: Method,
        target: impl Into<String>,
        version: HttpVersion,
        headers: Headers,
        body: Vec<u8>,
    ) -> Result<Self, Error> {
        let mut request = Self::new(method, target, version, headers)?;
        request.body = Ok(body);
        Ok(request)
    }

    /// The decoded path as raw bytes, before invalid UTF-8 is replaced.
    pub fn path_bytes(&self) -> &[u8] {
        &self.path_bytes
    }

    /// Record the outcome of reading the body from the connection.
    pub fn set_body(&mut self, body: Result<Vec<u8>, BodyError>) {
        self.body = body;
    }

    /// The request body, or the error that interrupted reading it.
    pub fn body(&self) -> Result<&[u8], BodyError> {
        self.body.as_deref().map_err(|e| e.clone())
    }

    /// Move the body out of the request, leaving it empty.
    ///
    /// A read error stays in place and is returned on every call.
    pub fn take_body(&mut self) -> Result<Vec<u8>, BodyError> {
        match &mut self.body {
            Ok(bytes) => Ok(std::mem::take(bytes)),
            Err(e) => Err(e.clone()),
        }
    }

    /// Get a header value.
    ///
    /// # Arguments
    ///
    /// * `name` - The header name
    ///
    /// # Returns
    ///
    /// The first value of the header, if it exists
    pub fn get_header(&self, name: &str) -> Option<&str> {
        if name.eq_ignore_ascii_case("Host") {
            return self.host.as_deref();
        }
        self.headers.get(name)
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Whether the client asked to close the connection after this request.
    ///
    /// HTTP/1.1 connections persist unless `Connection: close` is sent;
    /// HTTP/1.0 connections close unless `Connection: keep-alive` is sent.
    pub fn wants_close(&self) -> bool {
        let has_token = |token: &str| {
            self.headers
                .get_all("Connection")
                .flat_map(|v| v.split(','))
                .any(|t| t.trim().eq_ignore_ascii_case(token))
        };

        match self.version {
            HttpVersion::Http11 => has_token("close"),
            HttpVersion::Http10 => !has_token("keep-alive"),
        }
    }

    /// Whether the client waits for `100 Continue` before sending the body.
    pub fn expects_continue(&self) -> bool {
        self.version == HttpVersion::Http11
            && self
                .headers
                .get("Expect")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("100-continue"))
    }

    /// Work out the body framing and drop the headers it was read from.
    ///
    /// A chunked body loses both `Transfer-Encoding` and `Content-Length`,
    /// since the length it will have is only known once it is read. A body
    /// with a declared length keeps its `Content-Length`.
    pub fn take_body_framing(&mut self) -> Result<BodyFraming, Error> {
        let framing = self.body_framing()?;
        if framing == BodyFraming::Chunked {
            self.headers.remove("Transfer-Encoding");
            self.headers.remove("Content-Length");
        }
        Ok(framing)
    }

    /// Work out how the body is delimited from the framing headers.
    ///
    /// `Transfer-Encoding` takes precedence over `Content-Length`. Only the
    /// chunked coding is understood.
    pub fn body_framing(&self) -> Result<BodyFraming, Error> {
        let codings: Vec<String> = self
            .headers
            .get_all("Transfer-Encoding")
            .flat_map(|v| v.split(','))
            .map(|c| c.trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty())
            .collect();

        if !codings.is_empty() {
            return match codings.as_slice() {
                [only] if only == "chunked" => Ok(BodyFraming::Chunked),
                _ => Err(Error::UnsupportedTransferEncoding(codings.join(", "))),
            };
        }

        let mut length = None;
        for value in self.headers.get_all("Content-Length") {
            let value = value.trim();
            let parsed = if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                value.parse::<u64>().ok()
            } else {
                None
            };
            let Some(parsed) = parsed else {
                return Err(Error::InvalidContentLength(value.to_string()));
            };
            match length {
                Some(previous) if previous != parsed => {
                    return Err(Error::InvalidContentLength(format!("{previous} != {parsed}")));
                }
                _ => length = Some(parsed),
            }
        }

        Ok(match length {
            None | Some(0) => BodyFraming::Empty,
            Some(n) => BodyFraming::Length(n),
        })
    }
}

/// Find the end of the request head in `input`.
///
/// Lines may end in CRLF or in a bare LF, so the head ends at the first
/// `\n\n` or `\n\r\n`.
///
/// # Returns
///
/// The number of bytes up to and including the blank line that ends the
/// head, or `None` if the head is not complete yet
pub fn find_head_end(input: &[u8]) -> Option<usize> {
    input.iter().enumerate().find_map(|(i, &b)| {
        if b != b'\n' {
            return None;
        }
        match &input[i + 1..] {
            [b'\n', ..] => Some(i + 2),
            [b'\r', b'\n', ..] => Some(i + 3),
            _ => None,
        }
    })
}

/// Derive the request path from a request target.
///
/// Accepts origin-form (`/a/b?q`), absolute-form (`http://host/a/b`) and the
/// asterisk form used by `OPTIONS *`. The query is dropped and
/// percent-escapes are decoded; escapes that are not valid are kept as they
/// are and bytes that do not form UTF-8 are replaced.
pub fn decode_path(target: &str) -> Result<String, Error> {
    let decoded = decode_path_bytes(target)?;
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

/// Like [`decode_path`], but keeps the decoded bytes as they are.
pub fn decode_path_bytes(target: &str) -> Result<Vec<u8>, Error> {
    if target == "*" {
        return Ok(target.as_bytes().to_vec());
    }

    let without_query = target.split_once('?').map_or(target, |(path, _)| path);

    let raw_path = if without_query.starts_with('/') {
        without_query
    } else if let Some((_, rest)) = without_query.split_once("://") {
        // absolute-form: skip the authority
        match rest.find('/') {
            Some(pos) => &rest[pos..],
            None => "/",
        }
    } else {
        return Err(Error::InvalidPath(target.to_string()));
    };

    Ok(urlencoding::decode_binary(raw_path.as_bytes()).into_owned())
}

/// Parse the head of an HTTP request from a byte slice.
///
/// The input must contain the request line and the header lines; parsing
/// stops at the first blank line and anything after it is ignored. The
/// returned request has an empty body.
///
/// # Arguments
///
/// * `input` - A byte slice containing the HTTP request to parse
///
/// # Returns
///
/// The parsed HTTP request, or an error if the request is invalid
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    let head = match find_head_end(input) {
        Some(end) => &input[..end],
        None => input,
    };

    // Split the head into lines, dropping the optional CR before each LF
    let mut lines = head.split(|&b| b == b'\n').map(|line| line.strip_suffix(b"\r").unwrap_or(line));

    // Parse the request line
    let request_line = match lines.next() {
        Some(line) if !line.is_empty() => line,
        _ => return Err(Error::EmptyRequest),
    };
    let request_line = std::str::from_utf8(request_line)
        .map_err(|_| Error::MalformedRequestLine("Invalid UTF-8".to_string()))?;

    // Split the request line into method, target, and version
    let parts: Vec<&str> = request_line.split(' ').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;
    let target = parts[1];
    let version = HttpVersion::from_str(parts[2])?;

    // Parse the headers
    let mut headers = Headers::new();
    for line in lines {
        // Empty line indicates the end of headers
        if line.is_empty() {
            break;
        }

        let Some(colon) = line.iter().position(|&b| b == b':') else {
            return Err(Error::InvalidHeaderFormat);
        };

        // Names must be UTF-8, with no whitespace before the colon
        let name = match std::str::from_utf8(&line[..colon]) {
            Ok(name) if !name.is_empty() && !name.bytes().any(|b| b == b' ' || b == b'\t') => name,
            _ => return Err(Error::InvalidHeaderFormat),
        };

        // Values may carry obs-text, which is not necessarily UTF-8
        let value = String::from_utf8_lossy(&line[colon + 1..]);
        headers.append(name, value.trim());
    }

    // Check for required headers
    if version == HttpVersion::Http11 && !headers.contains("Host") {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    HttpRequest::new(method, target, version, headers)
}
