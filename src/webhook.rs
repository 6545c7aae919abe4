//! Receiving webhook notifications
//!
//! The API first verifies a webhook URL with a `GET ?challenge=...` that must
//! be echoed back, then POSTs batches of deltas signed with HMAC-SHA256 of
//! the body keyed by the application's client secret. [`WebhookHandler`]
//! implements that exchange independently of any server, and
//! [`WebhookListener`] serves it over HTTP/1.

use bytes::Bytes;
use hmac::{Hmac, Mac};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{NylasError, Result};

/// Header carrying the hex encoded body signature
pub const SIGNATURE_HEADER: &str = "X-Nylas-Signature";

/// Largest request body read before answering 413
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

type HmacSha256 = Hmac<Sha256>;

/// Check a webhook body against its `X-Nylas-Signature` value.
///
/// The comparison runs in constant time.
pub fn verify_signature(client_secret: &str, signature_hex: &str, body: &[u8]) -> Result<()> {
    let signature = hex::decode(signature_hex.trim())
        .map_err(|_| NylasError::WebhookSignature("signature is not valid hex".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|e| NylasError::WebhookSignature(e.to_string()))?;
    mac.update(body);
    mac.verify_slice(&signature)
        .map_err(|_| NylasError::WebhookSignature("signature mismatch".to_string()))
}

/// Hex encoded signature for `body`, as the API computes it
pub fn sign(client_secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|e| NylasError::WebhookSignature(e.to_string()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Only present for `message.created` notifications
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookAttributes {
    pub thread_id: String,
    pub received_date: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookObjectData {
    pub id: String,
    pub object: String,
    pub account_id: String,
    pub namespace_id: String,

    pub attributes: Option<WebhookAttributes>,
    /// Open and link tracking details
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// One notification, e.g. `message.created` or `thread.replied`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookDelta {
    pub date: i64,
    pub object: String,
    #[serde(rename = "type")]
    pub trigger: String,
    pub object_data: WebhookObjectData,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    deltas: Vec<WebhookDelta>,
}

/// Status and plain-text body to answer a webhook request with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: StatusCode,
    pub body: String,
}

impl WebhookResponse {
    fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn into_hyper(self) -> Response<Full<Bytes>> {
        let mut resp = Response::new(Full::new(Bytes::from(self.body)));
        *resp.status_mut() = self.status;
        resp.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        resp
    }
}

/// Verifies and dispatches webhook requests.
///
/// The callback runs synchronously inside the request; the API times the
/// request out, so slow work should be handed off elsewhere. An `Err` from
/// the callback stops dispatch and answers 500 with the error text.
pub struct WebhookHandler<F> {
    client_secret: String,
    callback: F,
}

impl<F> fmt::Debug for WebhookHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookHandler").finish_non_exhaustive()
    }
}

impl<F, E> WebhookHandler<F>
where
    F: Fn(WebhookDelta) -> std::result::Result<(), E>,
    E: fmt::Display,
{
    pub fn new(client_secret: impl Into<String>, callback: F) -> Self {
        Self {
            client_secret: client_secret.into(),
            callback,
        }
    }

    /// Handle one request given its method, `challenge` query parameter,
    /// signature header and body.
    pub fn handle(
        &self,
        method: &Method,
        challenge: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
    ) -> WebhookResponse {
        if method != Method::POST {
            return match challenge {
                Some(challenge) if *method == Method::GET && !challenge.is_empty() => {
                    debug!("answering webhook challenge");
                    WebhookResponse::new(StatusCode::OK, challenge)
                }
                _ => WebhookResponse::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
            };
        }

        if let Err(e) = verify_signature(&self.client_secret, signature.unwrap_or_default(), body) {
            warn!(error = %e, "rejected webhook");
            return WebhookResponse::new(StatusCode::BAD_REQUEST, e.to_string());
        }

        let payload: WebhookPayload = match serde_json::from_slice(body) {
            Ok(payload) => payload,
            Err(e) => {
                return WebhookResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("unmarshal delta: {}", e),
                )
            }
        };

        debug!(count = payload.deltas.len(), "dispatching webhook deltas");
        for delta in payload.deltas {
            if let Err(e) = (self.callback)(delta) {
                return WebhookResponse::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
            }
        }

        WebhookResponse::new(StatusCode::OK, "")
    }

    async fn serve_request(&self, req: Request<Incoming>) -> WebhookResponse {
        let method = req.method().clone();
        let challenge = req.uri().query().and_then(challenge_param);
        let signature = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
            Ok(collected) => self.handle(
                &method,
                challenge.as_deref(),
                signature.as_deref(),
                &collected.to_bytes(),
            ),
            Err(e) if e.is::<LengthLimitError>() => {
                warn!(limit = MAX_BODY_BYTES, "rejected oversized webhook body");
                WebhookResponse::new(StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
            }
            Err(e) => WebhookResponse::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

fn challenge_param(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "challenge")
        .map(|(_, value)| value.into_owned())
}

/// HTTP/1 server answering webhook requests on every path
#[derive(Debug, Clone)]
pub struct WebhookListener {
    client_secret: String,
}

impl WebhookListener {
    pub fn new(client_secret: impl Into<String>) -> Self {
        Self {
            client_secret: client_secret.into(),
        }
    }

    /// Bind `addr` and serve until `cancel` fires
    pub async fn listen<F, E>(
        &self,
        addr: SocketAddr,
        cancel: &CancellationToken,
        callback: F,
    ) -> Result<()>
    where
        F: Fn(WebhookDelta) -> std::result::Result<(), E> + Send + Sync + 'static,
        E: fmt::Display + 'static,
    {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, cancel, callback).await
    }

    /// Serve on an already bound listener until `cancel` fires.
    ///
    /// Connections accepted before cancellation are allowed to finish.
    pub async fn serve<F, E>(
        &self,
        listener: TcpListener,
        cancel: &CancellationToken,
        callback: F,
    ) -> Result<()>
    where
        F: Fn(WebhookDelta) -> std::result::Result<(), E> + Send + Sync + 'static,
        E: fmt::Display + 'static,
    {
        let handler = Arc::new(WebhookHandler::new(self.client_secret.clone(), callback));
        info!(addr = ?listener.local_addr().ok(), "webhook listener started");

        loop {
            let (stream, peer) = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("webhook listener stopped");
                    return Ok(());
                }
                accepted = listener.accept() => accepted?,
            };

            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let handler = Arc::clone(&handler);
                    async move { Ok::<_, Infallible>(handler.serve_request(req).await.into_hyper()) }
                });

                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    debug!(%peer, error = %e, "webhook connection ended with error");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "clientSecret";

    fn handler() -> WebhookHandler<impl Fn(WebhookDelta) -> std::result::Result<(), String>> {
        WebhookHandler::new(SECRET, |delta: WebhookDelta| {
            if delta.trigger == "message.bounced" {
                Err("cannot handle bounces".to_string())
            } else {
                Ok(())
            }
        })
    }

    #[test]
    fn test_sign_and_verify() {
        let body = br#"{"deltas":[]}"#;
        let signature = sign(SECRET, body).unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verify_signature(SECRET, &signature, body).is_ok());
        assert!(verify_signature("other", &signature, body).is_err());
        assert!(verify_signature(SECRET, "zz", body).is_err());
    }

    #[test]
    fn test_challenge_echo() {
        let resp = handler().handle(&Method::GET, Some("abc"), None, b"");
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body, "abc");
    }

    #[test]
    fn test_non_post_without_challenge() {
        let h = handler();
        assert_eq!(
            h.handle(&Method::GET, None, None, b"").status,
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            h.handle(&Method::GET, Some(""), None, b"").status,
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            h.handle(&Method::PUT, Some("abc"), None, b"").status,
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn test_bad_signature() {
        let resp = handler().handle(&Method::POST, None, Some("00"), br#"{"deltas":[]}"#);
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(resp.body.contains("signature mismatch"));
    }

    #[test]
    fn test_bad_body() {
        let body = b"not json";
        let signature = sign(SECRET, body).unwrap();
        let resp = handler().handle(&Method::POST, None, Some(&signature), body);
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.body.starts_with("unmarshal delta:"));
    }

    #[test]
    fn test_callback_error() {
        let body = br#"{"deltas":[{"type":"message.bounced","object":"message"}]}"#;
        let signature = sign(SECRET, body).unwrap();
        let resp = handler().handle(&Method::POST, None, Some(&signature), body);
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.body, "cannot handle bounces");
    }

    #[test]
    fn test_challenge_param() {
        assert_eq!(challenge_param("challenge=a%20b").as_deref(), Some("a b"));
        assert_eq!(challenge_param("x=1&challenge=z").as_deref(), Some("z"));
        assert_eq!(challenge_param("x=1"), None);
    }
}
