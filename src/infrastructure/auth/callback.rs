//! Loopback redirect listener
//!
//! The provider redirects the browser to `http://127.0.0.1:<port>/?code=..&state=..`.
//! Every accepted connection is served by hyper on its own task. The first
//! request that carries OAuth parameters gets a small page and its parameters
//! are handed back to the waiting sign-in.

use super::provider::AuthError;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{header, Method, Request, Response, StatusCode};
use oauth2::url::Url;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing::{debug, warn};

const DONE_PAGE: &str = "<html><body><h2>Signed in</h2>\
<p>You can close this window and return to ESP32 Remote.</p></body></html>";

/// Upper bound on how long one browser connection may stay open.
const CONNECTION_LIFETIME: Duration = Duration::from_secs(30);

type Reply = oneshot::Sender<CallbackParams>;
type ReplySlot = Arc<Mutex<Option<Reply>>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    fn is_empty(&self) -> bool {
        self.code.is_none() && self.state.is_none() && self.error.is_none()
    }

    /// Checks the echoed CSRF state and returns the authorization code.
    pub fn into_code(self, expected_state: &str) -> Result<String, AuthError> {
        if let Some(error) = self.error {
            return Err(AuthError::Denied(error));
        }
        if self.state.as_deref() != Some(expected_state) {
            return Err(AuthError::StateMismatch);
        }
        self.code
            .filter(|code| !code.is_empty())
            .ok_or_else(|| AuthError::BadCallback("missing authorization code".to_string()))
    }
}

/// Extracts the OAuth parameters from a request target such as `/?code=abc&state=xyz`.
pub fn parse_target(target: &str) -> Result<CallbackParams, AuthError> {
    let url = Url::parse("http://127.0.0.1")
        .and_then(|base| base.join(target))
        .map_err(|e| AuthError::BadCallback(e.to_string()))?;

    let mut params = CallbackParams::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => params.code = Some(value.into_owned()),
            "state" => params.state = Some(value.into_owned()),
            "error" => params.error = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(params)
}

fn page(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(header::CONNECTION, header::HeaderValue::from_static("close"));
    response
}

/// Accepts browser connections until one delivers the redirect.
///
/// Idle or broken connections only affect their own task.
pub async fn wait_for_callback(listener: &TcpListener) -> Result<CallbackParams, AuthError> {
    let (tx, mut rx) = oneshot::channel();
    let slot: ReplySlot = Arc::new(Mutex::new(Some(tx)));

    loop {
        tokio::select! {
            params = &mut rx => {
                return params.map_err(|_| {
                    AuthError::BadCallback("redirect listener closed".to_string())
                });
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(serve_connection(stream, peer, slot.clone()));
                }
                Err(e) => {
                    warn!("Failed to accept redirect connection: {}", e);
                    continue;
                }
            }
        }
    }
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, slot: ReplySlot) {
    let io = hyper_util::rt::TokioIo::new(stream);
    let builder =
        hyper_util::server::conn::auto::Builder::new(hyper_util::rt::TokioExecutor::new());
    let conn = builder.serve_connection(
        io,
        hyper::service::service_fn(|r| handle_request(r, peer, slot.clone())),
    );

    match tokio::time::timeout(CONNECTION_LIFETIME, conn).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(%peer, "Redirect connection error: {:?}", e),
        Err(_) => debug!(%peer, "Dropping idle redirect connection"),
    }
}

async fn handle_request(
    r: Request<Incoming>,
    peer: SocketAddr,
    slot: ReplySlot,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if r.method() != Method::GET {
        warn!(%peer, method = %r.method(), "Unexpected method on redirect listener");
        return Ok(page(StatusCode::METHOD_NOT_ALLOWED, ""));
    }

    let request_target = r.uri().path_and_query().map_or("/", |p| p.as_str());
    let params = match parse_target(request_target) {
        Ok(params) => params,
        Err(e) => {
            warn!(%peer, "Bad redirect request: {}", e);
            return Ok(page(StatusCode::BAD_REQUEST, ""));
        }
    };

    if params.is_empty() {
        debug!(%peer, uri = request_target, "Ignoring request without OAuth parameters");
        return Ok(page(StatusCode::NOT_FOUND, ""));
    }

    let reply = slot.lock().ok().and_then(|mut slot| slot.take());
    match reply {
        Some(reply) => {
            let _ = reply.send(params);
        }
        None => debug!(%peer, "Redirect already handled"),
    }
    Ok(page(StatusCode::OK, DONE_PAGE))
}
