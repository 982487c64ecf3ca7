//! HTTP server implementation.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, Semaphore};

use crate::parser::{parse_request, BodyFraming, Error as ParserError, HttpRequest, Method};
use crate::server::config::ServerConfig;
use crate::server::connection::ReadBuffer;
use crate::server::error::Error;
use crate::server::handler::{match_routes, Route};
use crate::server::response::{HttpResponse, StatusCode};

/// An HTTP server.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    /// The routes.
    pub routes: Arc<RwLock<Vec<Route>>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            routes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Add a route that serves only the given methods.
    pub async fn add_route<F, Fut>(&self, path: impl Into<String>, methods: Vec<Method>, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.push_route(path.into(), Some(methods), handler).await;
    }

    /// Add a route that serves every method.
    pub async fn handle<F, Fut>(&self, path: impl Into<String>, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.push_route(path.into(), None, handler).await;
    }

    async fn push_route<F, Fut>(&self, path: String, methods: Option<Vec<Method>>, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        let handler = Arc::new(move |req: HttpRequest| -> Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>> {
            Box::pin(handler(req))
        });

        let route = Route {
            path,
            methods,
            handler,
        };

        self.routes.write().await.push(route);
    }

    /// Log the registered endpoints.
    async fn display_server_info(&self) {
        let routes = self.routes.read().await;
        info!("Registered endpoints:");
        for route in routes.iter() {
            let methods = match &route.methods {
                Some(methods) => methods
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<String>>()
                    .join(", "),
                None => "ANY".to_string(),
            };
            info!("  {methods} {}", route.path);
        }
    }

    /// Bind the TCP listener for the configured address.
    pub async fn bind(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        Ok(listener)
    }

    /// Bind the configured address and serve until a fatal error.
    pub async fn start(&self) -> Result<(), Error> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept connections on `listener`, one task per connection.
    ///
    /// Only returns when accepting fails in a way that leaves the listener
    /// unusable.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Error> {
        self.display_server_info().await;
        info!("Listening on {addr}", addr = listener.local_addr()?);

        // Create a semaphore to limit concurrent connections
        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));

        loop {
            match listener.accept().await {
                Ok((socket, addr)) => {
                    Self::handle_new_connection(
                        socket,
                        addr,
                        semaphore.clone(),
                        self.routes.clone(),
                        self.config.clone(),
                    )
                    .await;
                }
                Err(e) => Self::handle_accept_error(e).await?,
            }
        }
    }

    /// Handle a new connection.
    async fn handle_new_connection(
        mut socket: TcpStream,
        addr: SocketAddr,
        semaphore: Arc<Semaphore>,
        routes: Arc<RwLock<Vec<Route>>>,
        config: ServerConfig,
    ) {
        // Try to acquire a permit from the semaphore
        let permit = match semaphore.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                let response = HttpResponse::error(
                    StatusCode::ServiceUnavailable,
                    "Server is at capacity, please try again later",
                )
                .with_header("Connection", "close");
                let _ = socket.write_all(&response.to_bytes()).await;
                return;
            }
        };

        tokio::spawn(async move {
            // The permit is dropped when the task completes, releasing the semaphore slot
            let _permit = permit;

            debug!("Connection from {addr}");
            if let Err(e) = Self::handle_connection(&mut socket, routes, &config).await {
                warn!("Error handling connection from {addr}: {e}");
            }
        });
    }

    /// Decide whether an accept error is worth retrying.
    ///
    /// Errors that mean the listener itself is gone end the server; anything
    /// else (aborted handshakes, descriptor exhaustion) is retried after a
    /// short pause.
    async fn handle_accept_error(e: io::Error) -> Result<(), Error> {
        if is_fatal_accept_error(&e) {
            error!("Listener failed, shutting down: {e}");
            return Err(Error::IoError(e));
        }

        error!("Error accepting connection: {e}");
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        Ok(())
    }

    /// Serve every request arriving on a single connection.
    ///
    /// Requests are handled one after the other until the client closes the
    /// connection, asks for it to be closed, or sends something that cannot
    /// be framed.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        routes: Arc<RwLock<Vec<Route>>>,
        config: &ServerConfig,
    ) -> Result<(), Error> {
        let mut buffer = ReadBuffer::new(config.read_buffer_size);

        loop {
            let head = match buffer.read_head(socket, config.max_header_bytes).await {
                Ok(Some(head)) => head,
                Ok(None) => return Ok(()), // Connection closed
                Err(Error::HeaderTooLarge(limit)) => {
                    let e = Error::HeaderTooLarge(limit);
                    let response = HttpResponse::error(StatusCode::RequestHeaderFieldsTooLarge, e.to_string())
                        .with_header("Connection", "close");
                    socket.write_all(&response.to_bytes()).await?;
                    return Err(e);
                }
                Err(e) => return Err(e),
            };

            // Parse the head and work out the body framing
            let (mut request, framing) = match parse_request(&head)
                .and_then(|mut request| request.take_body_framing().map(|framing| (request, framing)))
            {
                Ok(parsed) => parsed,
                Err(e) => {
                    let status = match e {
                        ParserError::InvalidVersion(_) => StatusCode::HttpVersionNotSupported,
                        ParserError::UnsupportedTransferEncoding(_) => StatusCode::NotImplemented,
                        _ => StatusCode::BadRequest,
                    };
                    let response = HttpResponse::error(status, format!("Error parsing request: {e}"))
                        .with_header("Connection", "close");
                    socket.write_all(&response.to_bytes()).await?;
                    return Err(Error::ParseError(e));
                }
            };

            if framing != BodyFraming::Empty && request.expects_continue() {
                socket.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await?;
                socket.flush().await?;
            }

            let body = buffer.read_body(socket, framing).await;
            let body_failed = body.is_err();
            if let Err(e) = &body {
                warn!("Failed to read body of {} {}: {e}", request.method, request.path);
            }
            request.set_body(body);

            // The rest of the connection cannot be framed after a failed body read
            let close = body_failed || request.wants_close();
            let head_only = request.method == Method::HEAD;

            let mut response = Self::dispatch(request, &routes).await;
            if close {
                response = response.with_header("Connection", "close");
            }

            let bytes = if head_only {
                response.head_bytes()
            } else {
                response.to_bytes()
            };
            socket.write_all(&bytes).await?;
            socket.flush().await?;

            if close {
                return Ok(());
            }
        }
    }

    /// Route a request to its handler and turn the outcome into a response.
    pub async fn dispatch(request: HttpRequest, routes: &RwLock<Vec<Route>>) -> HttpResponse {
        let handler = {
            let routes_guard = routes.read().await;
            let matching_routes = match_routes(&routes_guard, &request.path);

            if matching_routes.is_empty() {
                let e = Error::NotFound(request.path);
                debug!("{e}");
                return HttpResponse::error(StatusCode::NotFound, e.to_string());
            }

            match matching_routes.iter().find(|route| route.allows(&request.method)) {
                Some(route) => route.handler.clone(),
                None => {
                    let allowed_methods: Vec<String> = matching_routes
                        .iter()
                        .flat_map(|route| route.methods.iter().flatten().map(|m| m.to_string()))
                        .collect();
                    let e = Error::MethodNotAllowed(request.method, request.path);
                    debug!("{e}");
                    return HttpResponse::error(StatusCode::MethodNotAllowed, e.to_string())
                        .with_header("Allow", allowed_methods.join(", "));
                }
            }
        };

        let method = request.method.clone();
        let path = request.path.clone();
        debug!("{method} {path}");

        match handler(request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Handler for {method} {path} failed: {e}");
                HttpResponse::error(StatusCode::InternalServerError, e.to_string())
            }
        }
    }
}

/// Accept errors after which the listener cannot be used again.
pub(crate) fn is_fatal_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::InvalidInput | io::ErrorKind::NotConnected
    )
}
