//! Nylas API client and request plumbing
//!
//! Every endpoint wrapper in this crate goes through the same three steps:
//! build a [`RequestBuilder`] in one of the three auth scopes, attach query
//! parameters or a JSON body, then execute it and decode the response. Any
//! non-success status becomes [`NylasError::Api`] carrying the raw body.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use hyper::{Method, Request, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::{Config, DEFAULT_BASE_URL};
use crate::error::{ApiError, NylasError, Result};

/// `view` query values, see https://docs.nylas.com/reference#views
pub const VIEW_COUNT: &str = "count";
pub const VIEW_EXPANDED: &str = "expanded";
pub const VIEW_IDS: &str = "ids";

/// Folder and label role names (RFC 6154 special-use mailboxes)
pub const MAILBOX_INBOX: &str = "inbox";
pub const MAILBOX_ALL: &str = "all";
pub const MAILBOX_TRASH: &str = "trash";
pub const MAILBOX_ARCHIVE: &str = "archive";
pub const MAILBOX_DRAFTS: &str = "drafts";
pub const MAILBOX_SENT: &str = "sent";
pub const MAILBOX_SPAM: &str = "spam";
pub const MAILBOX_IMPORTANT: &str = "important";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RESPONSE_HEADER_TIMEOUT: Duration = Duration::from_secs(10);

/// Pooled HTTPS client used for every request
pub(crate) type HttpsClient = hyper_util::client::legacy::Client<
    hyper_rustls::HttpsConnector<HttpConnector>,
    Full<Bytes>,
>;

/// Client for working with the Nylas API.
///
/// Cloning is cheap: clones share the same connection pool.
#[derive(Clone)]
pub struct Client {
    client_id: String,
    client_secret: String,
    access_token: Option<String>,
    base_url: String,
    response_header_timeout: Duration,
    http: HttpsClient,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.client_id)
            .field("base_url", &self.base_url)
            .field("has_access_token", &self.access_token.is_some())
            .finish()
    }
}

/// Builder for [`Client`]
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    client_id: String,
    client_secret: String,
    access_token: Option<String>,
    base_url: String,
    connect_timeout: Duration,
    response_header_timeout: Duration,
}

impl ClientBuilder {
    /// Set the API base URL (used by tests to point at a local server)
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the account access token used for mailbox calls
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Timeout for establishing the TCP connection
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Timeout for receiving response headers once the request is sent.
    ///
    /// It does not bound how long a response body (e.g. a delta stream)
    /// may stay open.
    pub fn response_header_timeout(mut self, timeout: Duration) -> Self {
        self.response_header_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Client> {
        let http = build_http_client(self.connect_timeout)?;
        Ok(Client {
            client_id: self.client_id,
            client_secret: self.client_secret,
            access_token: self.access_token.filter(|t| !t.is_empty()),
            base_url: self.base_url.trim_end_matches('/').to_string(),
            response_header_timeout: self.response_header_timeout,
            http,
        })
    }
}

#[cfg(not(windows))]
fn crypto_provider() -> rustls::crypto::CryptoProvider {
    rustls::crypto::aws_lc_rs::default_provider()
}

#[cfg(windows)]
fn crypto_provider() -> rustls::crypto::CryptoProvider {
    rustls::crypto::ring::default_provider()
}

fn build_http_client(connect_timeout: Duration) -> Result<HttpsClient> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(connect_timeout));

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(crypto_provider())
        .map_err(|e| NylasError::NetworkError(format!("Failed to configure TLS: {}", e)))?
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    Ok(hyper_util::client::legacy::Client::builder(TokioExecutor::new()).build(https))
}

impl Client {
    /// Start building a client for the given application credentials
    pub fn builder(client_id: impl Into<String>, client_secret: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            access_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            response_header_timeout: DEFAULT_RESPONSE_HEADER_TIMEOUT,
        }
    }

    /// Create a client with default endpoint and timeouts
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        Self::builder(client_id, client_secret).build()
    }

    /// Create a client from a loaded [`Config`]
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Self::builder(
            config.api.client_id.clone().unwrap_or_default(),
            config.api.client_secret.clone().unwrap_or_default(),
        )
        .base_url(config.api.base_url.clone())
        .connect_timeout(Duration::from_secs(config.http.connect_timeout_secs))
        .response_header_timeout(Duration::from_secs(
            config.http.response_header_timeout_secs,
        ));

        if let Some(token) = &config.api.access_token {
            builder = builder.access_token(token.clone());
        }
        builder.build()
    }

    /// Returns a copy of the client bound to another account's access token.
    /// The receiver is left unchanged.
    pub fn as_account(&self, access_token: impl Into<String>) -> Self {
        let mut other = self.clone();
        let token = access_token.into();
        other.access_token = if token.is_empty() { None } else { Some(token) };
        other
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    /// Request scoped to the account: basic auth with the access token.
    /// Fails before any I/O when no token is set.
    pub(crate) fn user_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(NylasError::AccessTokenNotSet)?;
        let mut req = self.request(method, path)?;
        req.basic_auth = Some(token.to_string());
        Ok(req)
    }

    /// Request scoped to the application: basic auth with the client secret
    pub(crate) fn app_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let mut req = self.request(method, path)?;
        req.basic_auth = Some(self.client_secret.clone());
        Ok(req)
    }

    /// Unauthenticated request
    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = Url::parse(&format!("{}{}", self.base_url, path)).map_err(|e| {
            NylasError::InvalidRequest(format!("invalid URL {}{}: {}", self.base_url, path, e))
        })?;
        Ok(RequestBuilder {
            method,
            url,
            basic_auth: None,
            body: None,
            accept: None,
        })
    }

    /// Send a request and return the response once headers arrive.
    ///
    /// Non-success statuses are turned into [`NylasError::Api`] here, so the
    /// returned response always has a 2xx status.
    pub(crate) async fn send(&self, req: RequestBuilder) -> Result<Response<Incoming>> {
        let method = req.method.clone();
        let path = req.url.path().to_string();
        let request = req.into_hyper()?;

        debug!(%method, %path, "sending request");

        let response = tokio::time::timeout(self.response_header_timeout, self.http.request(request))
            .await
            .map_err(|_| {
                NylasError::Timeout(format!(
                    "{} {} gave no response within {:?}",
                    method, path, self.response_header_timeout
                ))
            })??;

        let status = response.status();
        if !status.is_success() {
            let body = read_body(response).await?;
            debug!(%method, %path, status = status.as_u16(), "request failed");
            return Err(ApiError::from_body(status.as_u16(), &body).into());
        }

        Ok(response)
    }

    /// Send a request and decode the JSON response
    pub(crate) async fn execute_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        context: &str,
    ) -> Result<T> {
        let response = self.send(req).await?;
        let body = read_body(response).await?;
        serde_json::from_slice(&body).map_err(|e| NylasError::decode(context, e))
    }

    /// Send a request and return the raw response body
    pub(crate) async fn execute_bytes(&self, req: RequestBuilder) -> Result<Bytes> {
        let response = self.send(req).await?;
        read_body(response).await
    }

    /// Send a request whose response body is ignored
    pub(crate) async fn execute(&self, req: RequestBuilder) -> Result<()> {
        let response = self.send(req).await?;
        read_body(response).await?;
        Ok(())
    }
}

/// Collect a whole response body
pub(crate) async fn read_body(response: Response<Incoming>) -> Result<Bytes> {
    let collected = response.into_body().collect().await?;
    Ok(collected.to_bytes())
}

/// A request being assembled for one endpoint call
#[derive(Debug)]
pub(crate) struct RequestBuilder {
    method: Method,
    url: Url,
    basic_auth: Option<String>,
    body: Option<Vec<u8>>,
    accept: Option<&'static str>,
}

impl RequestBuilder {
    /// Append query parameters
    pub(crate) fn query(mut self, query: Query) -> Self {
        if !query.is_empty() {
            let mut pairs = self.url.query_pairs_mut();
            for (key, value) in &query.0 {
                pairs.append_pair(key, value);
            }
        }
        self
    }

    /// Attach a JSON body
    pub(crate) fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let data = serde_json::to_vec(body)
            .map_err(|e| NylasError::InvalidRequest(format!("marshal body: {}", e)))?;
        self.body = Some(data);
        Ok(self)
    }

    pub(crate) fn accept(mut self, media_type: &'static str) -> Self {
        self.accept = Some(media_type);
        self
    }

    #[cfg(test)]
    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    fn into_hyper(self) -> Result<Request<Full<Bytes>>> {
        let mut builder = Request::builder()
            .method(self.method)
            .uri(self.url.as_str());

        if let Some(user) = self.basic_auth {
            let credentials = STANDARD.encode(format!("{}:", user));
            let value = HeaderValue::from_str(&format!("Basic {}", credentials))
                .map_err(|e| NylasError::InvalidRequest(format!("invalid credentials: {}", e)))?;
            builder = builder.header(AUTHORIZATION, value);
        }

        if let Some(accept) = self.accept {
            builder = builder.header(ACCEPT, accept);
        }

        let body = match self.body {
            Some(data) => {
                builder = builder.header(CONTENT_TYPE, "application/json; charset=utf-8");
                Full::new(Bytes::from(data))
            }
            None => Full::new(Bytes::new()),
        };

        Ok(builder.body(body)?)
    }
}

/// Ordered query parameters. Unset options are never written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Query(Vec<(&'static str, String)>);

impl Query {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, key: &'static str, value: impl ToString) {
        self.0.push((key, value.to_string()));
    }

    /// Replace every existing value for `key` with `value`
    pub(crate) fn set(&mut self, key: &'static str, value: impl ToString) {
        self.0.retain(|(k, _)| *k != key);
        self.push(key, value);
    }

    pub(crate) fn opt<T: ToString>(&mut self, key: &'static str, value: Option<T>) {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    pub(crate) fn opt_str(&mut self, key: &'static str, value: &Option<String>) {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            self.push(key, value);
        }
    }

    /// Comma-joined list, omitted when empty
    pub(crate) fn list(&mut self, key: &'static str, values: &[String]) {
        if !values.is_empty() {
            self.push(key, values.join(","));
        }
    }

    #[cfg(test)]
    pub(crate) fn pairs(&self) -> &[(&'static str, String)] {
        &self.0
    }
}

/// Response of any `view=count` request
#[derive(Debug, Deserialize)]
pub(crate) struct CountResponse {
    pub count: i64,
}
