//! Tests for the greeter and echo endpoints.

#[cfg(test)]
mod endpoint_tests {
    use std::io::{self, Cursor};
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use serde_json::Value;
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
    use tokio::net::{TcpListener, TcpStream};

    use crate::endpoints::greeter::{escape_html, greeting, quote};
    use crate::endpoints::{build_server, EchoResponse};
    use crate::parser::{Headers, HttpRequest, HttpVersion, Method};
    use crate::server::{HttpServer, ServerConfig};

    /// In-memory connection that optionally fails once its input runs out.
    struct MockStream {
        input: Cursor<Vec<u8>>,
        read_error: Option<io::Error>,
        output: Vec<u8>,
    }

    impl MockStream {
        fn new(input: &[u8]) -> Self {
            Self {
                input: Cursor::new(input.to_vec()),
                read_error: None,
                output: Vec::new(),
            }
        }
    }

    impl AsyncRead for MockStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            if this.input.position() as usize >= this.input.get_ref().len() {
                if let Some(e) = this.read_error.take() {
                    return Poll::Ready(Err(e));
                }
            }
            let n = std::io::Read::read(&mut this.input, buf.initialize_unfilled())?;
            buf.advance(n);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockStream {
        fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            self.get_mut().output.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    async fn serve_one(mut stream: MockStream) -> String {
        let server = build_server(ServerConfig::default()).await;
        HttpServer::handle_connection(&mut stream, server.routes.clone(), &server.config)
            .await
            .unwrap();
        String::from_utf8_lossy(&stream.output).into_owned()
    }

    async fn request(raw: &[u8]) -> String {
        serve_one(MockStream::new(raw)).await
    }

    fn body_of(response: &str) -> &str {
        response.split_once("\r\n\r\n").map(|(_, body)| body).unwrap()
    }

    fn json_of(response: &str) -> Value {
        serde_json::from_str(body_of(response)).unwrap()
    }

    #[tokio::test]
    async fn test_greets_root() {
        let response = request(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert_eq!(body_of(&response), "Hello, \"/\"");
    }

    #[tokio::test]
    async fn test_greeting_escapes_markup_raw_or_encoded() {
        for target in ["/<script>", "/%3Cscript%3E"] {
            let raw = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
            let response = request(raw.as_bytes()).await;
            assert_eq!(body_of(&response), "Hello, \"/&lt;script&gt;\"", "target {target}");
        }
    }

    #[tokio::test]
    async fn test_greeter_catches_unknown_paths() {
        let response = request(b"DELETE /some/where?x=1 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;
        assert_eq!(body_of(&response), "Hello, \"/some/where\"");

        // Only the exact echo path is echoed
        let response = request(b"GET /anything/ HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;
        assert_eq!(body_of(&response), "Hello, \"/anything/\"");
    }

    #[tokio::test]
    async fn test_greeting_keeps_undecodable_bytes() {
        let response = request(b"GET /%ff%3C HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;
        assert_eq!(body_of(&response), "Hello, \"/\\xff&lt;\"");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(b"a&b"), b"a&amp;b");
        assert_eq!(escape_html(b"<'\">"), b"&lt;&#39;&#34;&gt;");
        assert_eq!(escape_html(b"plain/path"), b"plain/path");
        assert_eq!(escape_html(b"\xff<"), b"\xff&lt;");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote(b""), "\"\"");
        assert_eq!(quote(b"a\\b"), "\"a\\\\b\"");
        assert_eq!(quote(b"tab\there\n"), "\"tab\\there\\n\"");
        assert_eq!(quote(b"\x01\x7f"), "\"\\x01\\x7f\"");
        assert_eq!(quote("caf\u{e9} \u{1f600}".as_bytes()), "\"caf\u{e9} \u{1f600}\"");
        assert_eq!(quote("\u{a0}\u{200b}".as_bytes()), "\"\\u00a0\\u200b\"");
        assert_eq!(quote("\u{e0001}".as_bytes()), "\"\\U000e0001\"");
    }

    #[test]
    fn test_quote_private_use() {
        assert_eq!(quote("\u{e000}".as_bytes()), "\"\\ue000\"");
        assert_eq!(quote("\u{f0000}".as_bytes()), "\"\\U000f0000\"");
    }

    #[test]
    fn test_quote_invalid_utf8() {
        assert_eq!(quote(b"/\xff"), "\"/\\xff\"");
        // A truncated sequence is written byte by byte
        assert_eq!(quote(b"a\xe2\x82b\xc3\xa9"), "\"a\\xe2\\x82b\u{e9}\"");
        assert_eq!(quote(b"\xf0\x9f"), "\"\\xf0\\x9f\"");
    }

    #[test]
    fn test_greeting_escapes_before_quoting() {
        assert_eq!(greeting(b"/say \"hi\""), "Hello, \"/say &#34;hi&#34;\"");
        assert_eq!(greeting(b"/a\\b"), "Hello, \"/a\\\\b\"");
    }

    #[tokio::test]
    async fn test_echo_reflects_request() {
        let response = request(
            b"POST /anything HTTP/1.1\r\nHost: localhost\r\nX-Test: 1\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: application/json\r\n"));
        assert_eq!(
            body_of(&response),
            "{\"method\":\"POST\",\"path\":\"/anything\",\"body\":\"hello\",\"body_len\":5,\
             \"headers\":{\"Connection\":\"close\",\"Content-Length\":\"5\",\"X-Test\":\"1\"}}\n"
        );
    }

    #[tokio::test]
    async fn test_echo_empty_body() {
        let response = request(b"GET /anything HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").await;
        let json = json_of(&response);
        assert_eq!(json["method"], "GET");
        assert_eq!(json["body"], "");
        assert_eq!(json["body_len"], 0);
        assert!(json["headers"].get("Host").is_none());
    }

    #[tokio::test]
    async fn test_echo_keeps_first_header_value() {
        let response = request(
            b"GET /anything HTTP/1.1\r\nHost: localhost\r\nx-dup: first\r\nX-Dup: second\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert_eq!(json_of(&response)["headers"]["X-Dup"], "first");
    }

    #[tokio::test]
    async fn test_echo_reflects_any_method() {
        for method in ["GET", "DELETE", "PURGE"] {
            let raw = format!("{method} /anything HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
            let response = request(raw.as_bytes()).await;
            assert_eq!(json_of(&response)["method"], method);
        }
    }

    #[tokio::test]
    async fn test_echo_body_is_lossy_but_length_is_raw() {
        let response = request(
            b"PUT /anything HTTP/1.1\r\nHost: localhost\r\nContent-Length: 3\r\nConnection: close\r\n\r\na\xffb",
        )
        .await;
        let json = json_of(&response);
        assert_eq!(json["body"], "a\u{fffd}b");
        assert_eq!(json["body_len"], 3);
    }

    #[tokio::test]
    async fn test_echo_header_value_with_obs_text() {
        let response = request(
            b"GET /anything HTTP/1.1\r\nHost: a\r\nX-Name: caf\xe9\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert_eq!(json_of(&response)["headers"]["X-Name"], "caf\u{fffd}");
    }

    #[tokio::test]
    async fn test_echo_accepts_bare_lf_line_endings() {
        let response = request(b"GET /anything HTTP/1.0\nX-Test: 1\n\n").await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        let json = json_of(&response);
        assert_eq!(json["method"], "GET");
        assert_eq!(json["headers"]["X-Test"], "1");
    }

    #[tokio::test]
    async fn test_echo_drops_chunked_framing_headers() {
        let response = request(
            b"POST /anything HTTP/1.1\r\nHost: a\r\nTransfer-Encoding: chunked\r\nContent-Length: 99\r\nConnection: close\r\n\r\n5\r\nhello\r\n0\r\n\r\n",
        )
        .await;
        let json = json_of(&response);
        assert_eq!(json["body"], "hello");
        assert_eq!(json["body_len"], 5);
        assert!(json["headers"].get("Transfer-Encoding").is_none());
        assert!(json["headers"].get("Content-Length").is_none());
        assert_eq!(json["headers"]["Connection"], "close");
    }

    #[tokio::test]
    async fn test_echo_escapes_html_in_json() {
        let response = request(
            b"POST /anything HTTP/1.1\r\nHost: localhost\r\nContent-Length: 3\r\nConnection: close\r\n\r\n<&>",
        )
        .await;
        assert!(body_of(&response).contains("\"body\":\"\\u003c\\u0026\\u003e\""));
    }

    #[tokio::test]
    async fn test_echo_body_read_failure() {
        let stream = MockStream {
            read_error: Some(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer")),
            ..MockStream::new(b"POST /anything HTTP/1.1\r\nHost: localhost\r\nContent-Length: 10\r\n\r\nabc")
        };
        let response = serve_one(stream).await;

        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(response.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert_eq!(body_of(&response), "connection reset by peer\n");
    }

    #[tokio::test]
    async fn test_echo_truncated_body() {
        let response = request(b"POST /anything HTTP/1.1\r\nHost: localhost\r\nContent-Length: 10\r\n\r\nabc").await;
        assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert_eq!(body_of(&response), "unexpected EOF\n");
    }

    #[test]
    fn test_echo_response_from_request() {
        let headers: Headers = [("content-type", "text/plain"), ("Host", "example.com")]
            .into_iter()
            .collect();
        let req = HttpRequest::new(Method::PATCH, "/anything?q=1", HttpVersion::Http11, headers).unwrap();

        let echoed = EchoResponse::new(&req, b"data");
        assert_eq!(echoed.method, "PATCH");
        assert_eq!(echoed.path, "/anything");
        assert_eq!(echoed.body, "data");
        assert_eq!(echoed.body_len, 4);
        assert_eq!(echoed.headers.len(), 1);
        assert_eq!(echoed.headers["Content-Type"], "text/plain");
    }

    #[tokio::test]
    async fn test_serves_both_endpoints_over_tcp() {
        let server = build_server(ServerConfig::default()).await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server_handle = tokio::spawn(async move { server.serve(listener).await });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(
                b"GET /hi HTTP/1.1\r\nHost: localhost\r\n\r\n\
                  POST /anything HTTP/1.1\r\nHost: localhost\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
            )
            .await
            .unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        let response = String::from_utf8_lossy(&response);
        assert!(response.contains("Hello, \"/hi\""));
        assert!(response.contains("\"body\":\"ok\",\"body_len\":2"));

        server_handle.abort();
    }
}
