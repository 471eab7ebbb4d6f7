//! HTTP response types and body reading

use crate::error::{HttpError, HttpResult};
use crate::request::Request;
use futures::TryStreamExt;
use std::io;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tracing::{debug, error, trace};

/// Response whose body has not been read yet
#[derive(Debug)]
pub struct HttpResponse {
    inner: reqwest::Response,
    latency_ms: u64,
}

impl HttpResponse {
    pub(crate) fn new(inner: reqwest::Response, latency_ms: u64) -> Self {
        Self { inner, latency_ms }
    }

    /// HTTP status code
    pub fn status_code(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Check if status is success (2xx)
    pub fn is_success(&self) -> bool {
        self.inner.status().is_success()
    }

    /// Check if status is client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.inner.status().is_client_error()
    }

    /// Check if status is server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.inner.status().is_server_error()
    }

    /// Final URL (may differ from request URL due to redirects)
    pub fn url(&self) -> &url::Url {
        self.inner.url()
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    /// Get content type
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Time from sending the request to receiving the response head
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    /// Read the body line by line and concatenate the lines.
    ///
    /// Line terminators (`\n` and `\r\n`) are dropped and NOT replaced, so a
    /// body of `"a\nb\nc\n"` yields `"abc"`. On any read fault the originating
    /// request is aborted before the error is returned. The body stream is
    /// released on every exit path.
    pub async fn drain_to_string(self, request: &Request) -> HttpResult<String> {
        debug!(url = %request.url(), status = self.status_code(), "Draining response body");

        let stream = self.inner.bytes_stream().map_err(io::Error::other);
        let mut lines = Box::pin(StreamReader::new(stream)).lines();
        let cancelled = request.cancellation();

        let mut text = String::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancelled.cancelled() => {
                    return Err(HttpError::Aborted(request.url().to_string()));
                }
                next = lines.next_line() => next,
            };
            match next {
                Ok(Some(line)) => {
                    trace!(line = %line, "Response data (line)");
                    text.push_str(&line);
                }
                Ok(None) => break,
                Err(e) => {
                    let err = read_fault(e);
                    request.abort();
                    error!(
                        url = %request.url(),
                        category = ?err.category(),
                        "Request aborted after read fault: {}",
                        err.sanitized_message()
                    );
                    return Err(err);
                }
            }
        }

        debug!(bytes = text.len(), "Reading completed; content stream closed");
        Ok(text)
    }
}

/// Classify an I/O error raised while reading lines.
///
/// Errors carried from reqwest are transport faults; undecodable text is
/// unexpected; anything else stays a plain read error.
fn read_fault(err: io::Error) -> HttpError {
    let kind = err.kind();
    match err.into_inner() {
        Some(inner) => match inner.downcast::<reqwest::Error>() {
            Ok(e) => HttpError::Transport(*e),
            Err(other) if kind == io::ErrorKind::InvalidData => {
                HttpError::Unexpected(format!("response body is not valid text: {}", other))
            }
            Err(other) => HttpError::Read(io::Error::new(kind, other)),
        },
        None if kind == io::ErrorKind::InvalidData => {
            HttpError::Unexpected("response body is not valid text".to_string())
        }
        None => HttpError::Read(io::Error::from(kind)),
    }
}
