//! HTTP error types and handling

use thiserror::Error;

/// Errors raised by the request facade
#[derive(Error, Debug)]
pub enum HttpError {
    /// A form field could not be represented in the configured charset
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Network or protocol fault reported by reqwest
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// I/O fault while reading a response body
    #[error("Read error: {0}")]
    Read(#[from] std::io::Error),

    /// The request was aborted before or while it was executing
    #[error("Request aborted: {0}")]
    Aborted(String),

    /// URL scheme not present in the scheme registry
    #[error("Scheme '{0}' not registered")]
    UnsupportedScheme(String),

    /// The connection manager behind a client handle was released
    #[error("Connection pool shut down")]
    PoolShutdown,

    /// Invalid request usage (e.g. executing a request twice)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Fault outside the transport family while draining a response
    #[error("Unexpected fault: {0}")]
    Unexpected(String),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type for HTTP operations
pub type HttpResult<T> = Result<T, HttpError>;

/// Error category for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpErrorCategory {
    /// Connection-related errors (DNS, TCP, TLS, pool shutdown)
    Connection,
    /// Timeout errors
    Timeout,
    /// Invalid request construction
    Request,
    /// Response reading or decoding errors
    Response,
    /// Redirect errors
    Redirect,
    /// Request aborted by the caller or after a read fault
    Aborted,
    /// Unknown/other errors
    Unknown,
}

impl HttpError {
    /// Categorize the error for reporting
    pub fn category(&self) -> HttpErrorCategory {
        match self {
            HttpError::Encoding(_)
            | HttpError::InvalidRequest(_)
            | HttpError::UnsupportedScheme(_)
            | HttpError::UrlParse(_) => HttpErrorCategory::Request,
            HttpError::Read(_) | HttpError::Unexpected(_) => HttpErrorCategory::Response,
            HttpError::Aborted(_) => HttpErrorCategory::Aborted,
            HttpError::PoolShutdown => HttpErrorCategory::Connection,
            HttpError::Transport(e) => {
                if e.is_connect() {
                    HttpErrorCategory::Connection
                } else if e.is_timeout() {
                    HttpErrorCategory::Timeout
                } else if e.is_redirect() {
                    HttpErrorCategory::Redirect
                } else if e.is_request() || e.is_builder() {
                    HttpErrorCategory::Request
                } else if e.is_body() || e.is_decode() {
                    HttpErrorCategory::Response
                } else {
                    HttpErrorCategory::Unknown
                }
            }
        }
    }

    /// Whether this error belongs to the transport family (network, read,
    /// abort or pool faults) rather than request construction.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            HttpError::Transport(_)
                | HttpError::Read(_)
                | HttpError::Aborted(_)
                | HttpError::PoolShutdown
        )
    }

    /// Sanitize error message (remove sensitive info like credentials, internal IPs)
    pub fn sanitized_message(&self) -> String {
        let msg = self.to_string();
        sanitize_error_message(&msg)
    }
}

/// Sanitize error messages by removing sensitive information
fn sanitize_error_message(msg: &str) -> String {
    use regex::Regex;
    use std::sync::OnceLock;

    static URL_CREDS_RE: OnceLock<Regex> = OnceLock::new();
    static INTERNAL_IP_RE: OnceLock<Regex> = OnceLock::new();
    static AUTH_HEADER_RE: OnceLock<Regex> = OnceLock::new();

    let url_creds_re = URL_CREDS_RE
        .get_or_init(|| Regex::new(r"https?://[^@:/]+:[^@]+@").expect("valid regex"));
    let internal_ip_re = INTERNAL_IP_RE.get_or_init(|| {
        Regex::new(r"\b(10\.|172\.(1[6-9]|2[0-9]|3[01])\.|192\.168\.)\d+\.\d+\b")
            .expect("valid regex")
    });
    let auth_header_re = AUTH_HEADER_RE.get_or_init(|| {
        Regex::new(r"(?i)(authorization:\s*bearer|bearer|api[_-]?key|token)\s*[:=]?\s*\S+")
            .expect("valid regex")
    });

    let sanitized = url_creds_re.replace_all(msg, "https://[REDACTED]@");
    let sanitized = internal_ip_re.replace_all(&sanitized, "[INTERNAL_IP]");
    let sanitized = auth_header_re.replace_all(&sanitized, "$1: [REDACTED]");

    sanitized.to_string()
}
