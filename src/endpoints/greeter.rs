//! Greeter endpoint: `Hello, "<path>"`.

use std::fmt::Write;

use crate::parser::HttpRequest;
use crate::server::{Error, HttpResponse, StatusCode};

/// Greet the caller with the request path.
///
/// The path is HTML-escaped and then quoted, so `GET /<b>` answers
/// `Hello, "/&lt;b&gt;"`. Never fails.
pub async fn greet(req: HttpRequest) -> Result<HttpResponse, Error> {
    Ok(HttpResponse::new(StatusCode::Ok)
        .with_content_type("text/plain; charset=utf-8")
        .with_body_string(greeting(req.path_bytes())))
}

/// The greeting text for the decoded path bytes `path`.
pub fn greeting(path: &[u8]) -> String {
    format!("Hello, {}", quote(&escape_html(path)))
}

/// Replace the five HTML-significant characters with entities.
///
/// Works on bytes so a path that is not UTF-8 passes through untouched.
pub fn escape_html(s: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for &b in s {
        match b {
            b'&' => out.extend_from_slice(b"&amp;"),
            b'\'' => out.extend_from_slice(b"&#39;"),
            b'<' => out.extend_from_slice(b"&lt;"),
            b'>' => out.extend_from_slice(b"&gt;"),
            b'"' => out.extend_from_slice(b"&#34;"),
            _ => out.push(b),
        }
    }
    out
}

/// Wrap `s` in double quotes, escaping it the way Go's `%q` verb does.
///
/// Quotes and backslashes get a backslash, common control characters their
/// short escapes, other non-printable characters `\xNN`, `\uNNNN` or
/// `\UNNNNNNNN`. Printable non-ASCII text is kept as is. Bytes that are
/// not part of valid UTF-8 are written one by one as `\xNN`.
pub fn quote(s: &[u8]) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut rest = s;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                quote_str(&mut out, valid);
                break;
            }
            Err(e) => {
                let (valid, invalid) = rest.split_at(e.valid_up_to());
                // Checked by from_utf8 up to valid_up_to
                quote_str(&mut out, std::str::from_utf8(valid).unwrap_or_default());
                let bad = e.error_len().unwrap_or(invalid.len());
                for b in &invalid[..bad] {
                    let _ = write!(out, "\\x{b:02x}");
                }
                rest = &invalid[bad..];
            }
        }
    }
    out.push('"');
    out
}

fn quote_str(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0b}' => out.push_str("\\v"),
            c if is_printable(c) => out.push(c),
            c if c < ' ' || c == '\u{7f}' => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if (c as u32) < 0x10000 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08x}", c as u32);
            }
        }
    }
}

/// Whether `c` is shown as itself inside a quoted string.
///
/// Control, separator, invisible format and private-use characters are
/// not; the space character is. Unassigned code points are not told apart
/// and count as printable.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(
        c,
        '\u{ad}'
            | '\u{200b}'..='\u{200f}'
            | '\u{202a}'..='\u{202e}'
            | '\u{2060}'..='\u{2064}'
            | '\u{feff}'
            | '\u{e0001}'
            | '\u{e0020}'..='\u{e007f}'
            | '\u{e000}'..='\u{f8ff}'
            | '\u{f0000}'..='\u{10ffff}'
    )
}
