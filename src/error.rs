use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Type alias for Result with NylasError
pub type Result<T> = std::result::Result<T, NylasError>;

/// Error type reported when an error body is not the documented JSON shape.
pub const UNKNOWN_ERROR_FORMAT: &str = "unknown_error_format";

/// Error returned from the Nylas API for a non-success HTTP status.
///
/// The raw response body is always retained in [`ApiError::body`], even when
/// it parses, so nothing the server said is lost.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status_code: u16,
    #[serde(skip)]
    pub body: Vec<u8>,

    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub error_type: String,
    #[serde(default)]
    pub server_error: String,
}

impl ApiError {
    /// Build an API error from a response status and its full body.
    ///
    /// A body that does not parse as `{"message", "type", "server_error"}`
    /// becomes the message verbatim and the type is set to
    /// [`UNKNOWN_ERROR_FORMAT`].
    pub fn from_body(status_code: u16, body: &[u8]) -> Self {
        let mut api_error = match serde_json::from_slice::<ApiError>(body) {
            Ok(parsed) => parsed,
            Err(_) => ApiError {
                message: String::from_utf8_lossy(body).into_owned(),
                error_type: UNKNOWN_ERROR_FORMAT.to_string(),
                ..Default::default()
            },
        };
        api_error.status_code = status_code;
        api_error.body = body.to_vec();
        api_error
    }

    /// True when the body could not be parsed as a structured API error
    pub fn is_unknown_format(&self) -> bool {
        self.error_type == UNKNOWN_ERROR_FORMAT
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status_code, self.message)?;
        if !self.server_error.is_empty() {
            write!(f, ": {}", self.server_error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Error types for the Nylas client
#[derive(Error, Debug)]
pub enum NylasError {
    /// A user-scoped call was made on a client without an access token.
    /// Detected locally, no request is sent.
    #[error("access token not set on client")]
    AccessTokenNotSet,

    /// The request could not be built (bad base URL, bad header value, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network-related error (DNS, TLS, connection reset, body read failure)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// No response headers arrived within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The API answered with a non-success status
    #[error("API error {0}")]
    Api(#[from] ApiError),

    /// A response body did not decode into the expected shape
    #[error("decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A line of the delta stream was not a valid delta record
    #[error("unmarshal delta: {line:?}: {source}")]
    MalformedDelta {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// An event `when` payload violated the time-shape rules
    #[error("{0}")]
    EventTime(String),

    /// The caller's cancellation token fired
    #[error("Operation cancelled")]
    Cancelled,

    /// Webhook payload signature did not verify
    #[error("Webhook signature error: {0}")]
    WebhookSignature(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error (file operations, sockets, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl NylasError {
    pub(crate) fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        NylasError::Decode {
            context: context.into(),
            source,
        }
    }

    /// Check if the error is a structured API error (non-success status)
    pub fn is_api_error(&self) -> bool {
        matches!(self, NylasError::Api(_))
    }

    /// HTTP status code of an API error, if this is one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            NylasError::Api(api) => Some(api.status_code),
            _ => None,
        }
    }

    /// Check if the error came from decoding a payload
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            NylasError::Decode { .. }
                | NylasError::MalformedDelta { .. }
                | NylasError::EventTime(_)
                | NylasError::SerializationError(_)
        )
    }

    /// Check if the error is a transport failure
    pub fn is_transport_error(&self) -> bool {
        matches!(self, NylasError::NetworkError(_) | NylasError::Timeout(_))
    }
}

impl From<hyper_util::client::legacy::Error> for NylasError {
    fn from(error: hyper_util::client::legacy::Error) -> Self {
        NylasError::NetworkError(format!("Connection error: {}", error))
    }
}

impl From<hyper::Error> for NylasError {
    fn from(error: hyper::Error) -> Self {
        NylasError::NetworkError(error.to_string())
    }
}

impl From<hyper::http::Error> for NylasError {
    fn from(error: hyper::http::Error) -> Self {
        NylasError::InvalidRequest(error.to_string())
    }
}
