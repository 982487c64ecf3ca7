//! Buffered reading of requests from a connection.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::parser::{find_head_end, BodyError, BodyFraming};
use crate::server::error::Error;

/// Longest chunk-size or trailer line accepted in a chunked body.
const MAX_CHUNK_LINE: usize = 4096;

/// Bytes read from a connection but not consumed yet.
///
/// A single buffer is kept per connection so bytes of a pipelined request
/// that arrive together with the previous one are not lost.
pub(crate) struct ReadBuffer {
    buf: Vec<u8>,
    read_size: usize,
}

impl ReadBuffer {
    pub(crate) fn new(read_size: usize) -> Self {
        Self {
            buf: Vec::with_capacity(read_size),
            read_size: read_size.max(1),
        }
    }

    /// Read once from `stream`, appending to the buffer.
    async fn fill<S>(&mut self, stream: &mut S) -> io::Result<usize>
    where
        S: AsyncRead + Unpin + ?Sized,
    {
        let start = self.buf.len();
        self.buf.resize(start + self.read_size, 0);
        match stream.read(&mut self.buf[start..]).await {
            Ok(n) => {
                self.buf.truncate(start + n);
                Ok(n)
            }
            Err(e) => {
                self.buf.truncate(start);
                Err(e)
            }
        }
    }

    /// Read the next request head, up to and including its blank line.
    ///
    /// Returns `None` when the peer closes the connection between requests.
    /// Empty lines before the request line are skipped, whether they end in
    /// CRLF or a bare LF.
    pub(crate) async fn read_head<S>(
        &mut self,
        stream: &mut S,
        max_header_bytes: usize,
    ) -> Result<Option<Vec<u8>>, Error>
    where
        S: AsyncRead + Unpin + ?Sized,
    {
        loop {
            loop {
                if self.buf.starts_with(b"\r\n") {
                    self.buf.drain(..2);
                } else if self.buf.starts_with(b"\n") {
                    self.buf.drain(..1);
                } else {
                    break;
                }
            }

            if let Some(end) = find_head_end(&self.buf) {
                if end > max_header_bytes {
                    return Err(Error::HeaderTooLarge(max_header_bytes));
                }
                return Ok(Some(self.buf.drain(..end).collect()));
            }
            if self.buf.len() > max_header_bytes {
                return Err(Error::HeaderTooLarge(max_header_bytes));
            }

            if self.fill(stream).await? == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(Error::IoError(io::ErrorKind::UnexpectedEof.into()));
            }
        }
    }

    /// Read a whole body framed as described by `framing`.
    pub(crate) async fn read_body<S>(
        &mut self,
        stream: &mut S,
        framing: BodyFraming,
    ) -> Result<Vec<u8>, BodyError>
    where
        S: AsyncRead + Unpin + ?Sized,
    {
        match framing {
            BodyFraming::Empty => Ok(Vec::new()),
            BodyFraming::Length(len) => self.read_exact(stream, len).await,
            BodyFraming::Chunked => self.read_chunked(stream).await,
        }
    }

    async fn read_exact<S>(&mut self, stream: &mut S, len: u64) -> Result<Vec<u8>, BodyError>
    where
        S: AsyncRead + Unpin + ?Sized,
    {
        let len = usize::try_from(len)
            .map_err(|_| BodyError::new(io::ErrorKind::OutOfMemory, "body length does not fit in memory"))?;

        // The declared length is not trusted for preallocation.
        let mut body = Vec::with_capacity(len.min(self.read_size));
        loop {
            let take = self.buf.len().min(len - body.len());
            body.extend(self.buf.drain(..take));
            if body.len() == len {
                return Ok(body);
            }
            if self.fill(stream).await? == 0 {
                return Err(BodyError::unexpected_eof());
            }
        }
    }

    /// Read one line, without its line terminator.
    async fn read_line<S>(&mut self, stream: &mut S) -> Result<Vec<u8>, BodyError>
    where
        S: AsyncRead + Unpin + ?Sized,
    {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(line);
            }
            if self.buf.len() > MAX_CHUNK_LINE {
                return Err(BodyError::malformed_chunk("header line too long"));
            }
            if self.fill(stream).await? == 0 {
                return Err(BodyError::unexpected_eof());
            }
        }
    }

    async fn read_chunked<S>(&mut self, stream: &mut S) -> Result<Vec<u8>, BodyError>
    where
        S: AsyncRead + Unpin + ?Sized,
    {
        let mut body = Vec::new();
        loop {
            let line = self.read_line(stream).await?;
            let size = parse_chunk_size(&line)?;

            if size == 0 {
                // Trailer fields are read and discarded.
                while !self.read_line(stream).await?.is_empty() {}
                return Ok(body);
            }

            let chunk = self.read_exact(stream, size).await?;
            body.extend_from_slice(&chunk);

            if !self.read_line(stream).await?.is_empty() {
                return Err(BodyError::malformed_chunk("malformed chunked encoding"));
            }
        }
    }
}

/// Parse the hexadecimal size at the start of a chunk-size line.
///
/// Chunk extensions after `;` are ignored.
fn parse_chunk_size(line: &[u8]) -> Result<u64, BodyError> {
    let field = match line.iter().position(|&b| b == b';') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let start = field.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(field.len());
    let end = field.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |p| p + 1);
    let field = &field[start..end];

    if field.is_empty() || !field.iter().all(u8::is_ascii_hexdigit) {
        return Err(BodyError::malformed_chunk("invalid byte in chunk length"));
    }
    if field.len() > 16 {
        return Err(BodyError::malformed_chunk("http chunk length too large"));
    }

    field.iter().try_fold(0u64, |acc, &b| {
        let digit = (b as char).to_digit(16).unwrap_or(0) as u64;
        acc.checked_mul(16)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| BodyError::malformed_chunk("http chunk length too large"))
    })
}
