//! HTTP request handlers and routing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::parser::{HttpRequest, Method};
use crate::server::{Error, HttpResponse};

/// Type alias for a boxed future that returns a Result<HttpResponse, Error>.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// Type alias for a handler function that takes an HttpRequest and returns a HandlerFuture.
pub type HandlerFn = Arc<dyn Fn(HttpRequest) -> HandlerFuture + Send + Sync>;

/// Represents a route in the HTTP server.
///
/// A pattern ending in `/` names a subtree and matches every path below it
/// (`/` matches everything); any other pattern matches one path exactly.
#[derive(Clone)]
pub struct Route {
    /// The path pattern to match.
    pub path: String,
    /// The HTTP methods to match, or `None` for any method.
    pub methods: Option<Vec<Method>>,
    /// The handler function.
    pub handler: HandlerFn,
}

impl Route {
    pub fn is_subtree(&self) -> bool {
        self.path.ends_with('/')
    }

    pub fn matches_path(&self, path: &str) -> bool {
        if self.is_subtree() {
            path.starts_with(&self.path)
        } else {
            path == self.path
        }
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.as_ref().map_or(true, |m| m.contains(method))
    }
}

/// Pick the routes that serve `path`.
///
/// An exact pattern beats any subtree pattern; among subtree patterns the
/// longest one wins. Every route registered under the winning pattern is
/// returned, so the caller can check methods across all of them.
pub fn match_routes<'a>(routes: &'a [Route], path: &str) -> Vec<&'a Route> {
    let best = routes
        .iter()
        .filter(|route| route.matches_path(path))
        .max_by_key(|route| (!route.is_subtree(), route.path.len()))
        .map(|route| route.path.as_str());

    match best {
        Some(pattern) => routes.iter().filter(|route| route.path == pattern).collect(),
        None => Vec::new(),
    }
}
