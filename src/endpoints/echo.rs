//! Echo endpoint: reflects the request back as JSON.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::parser::HttpRequest;
use crate::server::{Error, HttpResponse, StatusCode};

/// The JSON document returned by the echo endpoint.
///
/// `body` is the request body decoded as UTF-8, with invalid sequences
/// replaced; `body_len` is the number of raw bytes received. Only the first
/// value of each header is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EchoResponse {
    pub method: String,
    pub path: String,
    pub body: String,
    pub body_len: usize,
    pub headers: BTreeMap<String, String>,
}

impl EchoResponse {
    /// Describe `req`, whose body has already been read into `body`.
    pub fn new(req: &HttpRequest, body: &[u8]) -> Self {
        Self {
            method: req.method.to_string(),
            path: req.path.clone(),
            body: String::from_utf8_lossy(body).into_owned(),
            body_len: body.len(),
            headers: req.headers.first_values(),
        }
    }
}

/// Reflect the request as an [`EchoResponse`].
///
/// A body that could not be read ends in a plain-text 500 carrying the read
/// error and no JSON.
pub async fn echo(mut req: HttpRequest) -> Result<HttpResponse, Error> {
    let body = req.take_body()?;
    let echoed = EchoResponse::new(&req, &body);
    debug!("Echoing {} {} ({} body bytes)", echoed.method, echoed.path, echoed.body_len);

    HttpResponse::new(StatusCode::Ok).with_json(&echoed)
}
