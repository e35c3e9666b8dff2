//! Request-scoped context handed to timeout responders.
//!
//! # Responsibilities
//! - Snapshot the parts of a request a responder may need (method, path, client, headers)
//! - Carry the request ID assigned by the request-id layer
//!
//! # Design Decisions
//! - Captured before the request is moved into the handler, so it survives cancellation
//! - Client address comes from `ConnectInfo` and is optional (absent in unit tests)

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderName, Method, Request, Uri};

/// Header carrying the request ID.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Snapshot of an inbound request, taken when a timeout scope starts.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    client_addr: Option<SocketAddr>,
    headers: HeaderMap,
}

impl RequestContext {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let client_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            client_addr,
            headers: request.headers().clone(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn client_addr(&self) -> Option<SocketAddr> {
        self.client_addr
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of the `x-request-id` header, if one was assigned.
    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
    }

    /// Returns true for a WebSocket opening handshake.
    ///
    /// The socket outlives the handler and is never timed.
    pub fn is_websocket_handshake(&self) -> bool {
        is_websocket_handshake(&self.method, &self.headers)
    }
}

/// `GET` with `Connection: upgrade`, `Upgrade: websocket` and a `Sec-WebSocket-Key`.
///
/// Anything short of a complete handshake is an ordinary request.
pub(crate) fn is_websocket_handshake(method: &Method, headers: &HeaderMap) -> bool {
    if *method != Method::GET || !headers.contains_key(header::SEC_WEBSOCKET_KEY) {
        return false;
    }

    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    let upgrade_websocket = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"));

    connection_upgrade && upgrade_websocket
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn captures_request_parts() {
        let mut req = Request::builder()
            .method(Method::POST)
            .uri("http://example.com/upload?size=10")
            .header("x-request-id", "abc-123")
            .header("user-agent", "tests")
            .body(Body::empty())
            .unwrap();
        let addr: SocketAddr = "10.0.0.7:5151".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));

        let ctx = RequestContext::from_request(&req);
        assert_eq!(ctx.method(), &Method::POST);
        assert_eq!(ctx.path(), "/upload");
        assert_eq!(ctx.uri().query(), Some("size=10"));
        assert_eq!(ctx.client_addr(), Some(addr));
        assert_eq!(ctx.request_id(), Some("abc-123"));
        assert_eq!(ctx.headers().get("user-agent").unwrap(), "tests");
    }

    #[test]
    fn missing_connect_info_and_request_id() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let ctx = RequestContext::from_request(&req);
        assert_eq!(ctx.client_addr(), None);
        assert_eq!(ctx.request_id(), None);
        assert!(!ctx.is_websocket_handshake());
    }

    fn handshake(method: Method, upgrade: &str, with_key: bool) -> RequestContext {
        let mut builder = Request::builder()
            .method(method)
            .uri("/ws")
            .header("connection", "keep-alive, Upgrade")
            .header("upgrade", upgrade);
        if with_key {
            builder = builder.header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==");
        }
        RequestContext::from_request(&builder.body(Body::empty()).unwrap())
    }

    #[test]
    fn detects_websocket_handshake() {
        assert!(handshake(Method::GET, "websocket", true).is_websocket_handshake());
        assert!(handshake(Method::GET, "WebSocket", true).is_websocket_handshake());
    }

    #[test]
    fn partial_upgrade_headers_are_ordinary_requests() {
        assert!(!handshake(Method::GET, "anything", true).is_websocket_handshake());
        assert!(!handshake(Method::GET, "websocket", false).is_websocket_handshake());
        assert!(!handshake(Method::POST, "websocket", true).is_websocket_handshake());

        let no_upgrade_header = Request::builder()
            .uri("/ws")
            .header("connection", "upgrade")
            .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap();
        assert!(!RequestContext::from_request(&no_upgrade_header).is_websocket_handshake());
    }
}
