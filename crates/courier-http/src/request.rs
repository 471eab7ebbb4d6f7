//! HTTP request types and builders

use crate::config::Charset;
use crate::error::{HttpError, HttpResult};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use url::Url;

/// HTTP request methods supported by the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Returns the method as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether requests of this method carry a form body.
    pub fn has_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(format!("Invalid HTTP method: {}", s)),
        }
    }
}

/// Ordered name/value pairs sent as an url-encoded form
pub type FormFields = Vec<(String, String)>;

/// Encode `fields` as `application/x-www-form-urlencoded` in `charset`.
///
/// Field order is preserved. Empty input yields an empty body.
pub fn encode_form<K, V>(fields: &[(K, V)], charset: Charset) -> HttpResult<Vec<u8>>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = String::new();
    for (name, value) in fields {
        if !out.is_empty() {
            out.push('&');
        }
        out.extend(url::form_urlencoded::byte_serialize(&encode_part(name.as_ref(), charset)?));
        out.push('=');
        out.extend(url::form_urlencoded::byte_serialize(&encode_part(value.as_ref(), charset)?));
    }
    Ok(out.into_bytes())
}

fn encode_part(text: &str, charset: Charset) -> HttpResult<Vec<u8>> {
    charset.encode(text).map_err(|c| {
        HttpError::Encoding(format!(
            "'{}' (U+{:04X}) is not representable in {}",
            c,
            u32::from(c),
            charset
        ))
    })
}

/// Form-encoded request body
#[derive(Debug, Clone)]
pub struct FormBody {
    bytes: Vec<u8>,
    content_type: String,
}

impl FormBody {
    pub fn new<K: AsRef<str>, V: AsRef<str>>(
        fields: &[(K, V)],
        charset: Charset,
    ) -> HttpResult<Self> {
        Ok(Self {
            bytes: encode_form(fields, charset)?,
            content_type: format!("application/x-www-form-urlencoded; charset={}", charset),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// Handle that can abort a [`Request`] from another task.
#[derive(Debug, Clone)]
pub struct AbortHandle(CancellationToken);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// A single request, built by the facade and consumed once by execution.
#[derive(Debug)]
pub struct Request {
    method: HttpMethod,
    url: Url,
    body: Option<FormBody>,
    abort: CancellationToken,
    executed: AtomicBool,
}

impl Request {
    /// Build a request without a body
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            body: None,
            abort: CancellationToken::new(),
            executed: AtomicBool::new(false),
        }
    }

    /// Build a request carrying a form body
    pub fn with_form(method: HttpMethod, url: Url, body: FormBody) -> Self {
        Self {
            body: Some(body),
            ..Self::new(method, url)
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Encoded body bytes, `None` for GET/DELETE
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_ref().map(FormBody::bytes)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.body.as_ref().map(FormBody::content_type)
    }

    /// Abort the request. An in-flight execution fails with
    /// [`HttpError::Aborted`]; a pending one never starts.
    pub fn abort(&self) {
        self.abort.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_cancelled()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(self.abort.clone())
    }

    pub fn is_executed(&self) -> bool {
        self.executed.load(Ordering::Acquire)
    }

    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.abort
    }

    /// Flip the executed flag; fails if the request was already consumed.
    pub(crate) fn mark_executed(&self) -> HttpResult<()> {
        if self.executed.swap(true, Ordering::AcqRel) {
            return Err(HttpError::InvalidRequest(format!(
                "{} {} was already executed",
                self.method, self.url
            )));
        }
        Ok(())
    }

    pub(crate) fn to_reqwest(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let builder = client.request(self.method.to_reqwest(), self.url.clone());
        match &self.body {
            Some(body) => builder
                .header(http::header::CONTENT_TYPE, body.content_type())
                .body(body.bytes().to_vec()),
            None => builder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://localhost:8081/").unwrap()
    }

    #[test]
    fn test_method_parse_and_display() {
        assert_eq!("patch".parse::<HttpMethod>(), Ok(HttpMethod::Patch));
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        assert!("HEAD".parse::<HttpMethod>().is_err());
        assert!(HttpMethod::Put.has_body());
        assert!(!HttpMethod::Get.has_body());
    }

    #[test]
    fn test_encode_form_preserves_order() {
        let fields = [("b", "2"), ("a", "1 + 1"), ("c", "x&y=z")];
        let body = encode_form(&fields, Charset::Utf8).unwrap();
        assert_eq!(body, b"b=2&a=1+%2B+1&c=x%26y%3Dz".to_vec());
    }

    #[test]
    fn test_encode_form_latin1_bytes() {
        let body = encode_form(&[("name", "Jos\u{e9}")], Charset::Iso8859_1).unwrap();
        assert_eq!(body, b"name=Jos%E9".to_vec());

        let body = encode_form(&[("name", "Jos\u{e9}")], Charset::Utf8).unwrap();
        assert_eq!(body, b"name=Jos%C3%A9".to_vec());
    }

    #[test]
    fn test_encode_form_rejects_unrepresentable() {
        let err = encode_form(&[("price", "5\u{20ac}")], Charset::Iso8859_1).unwrap_err();
        assert!(matches!(err, HttpError::Encoding(_)));
    }

    #[test]
    fn test_empty_form_is_present_but_empty() {
        let fields: [(&str, &str); 0] = [];
        let body = FormBody::new(&fields, Charset::Iso8859_1).unwrap();
        let request = Request::with_form(HttpMethod::Post, url(), body);
        assert_eq!(request.body(), Some(&[][..]));
        assert_eq!(
            request.content_type(),
            Some("application/x-www-form-urlencoded; charset=ISO-8859-1")
        );
    }

    #[test]
    fn test_abort_handle_shares_state() {
        let request = Request::new(HttpMethod::Get, url());
        let handle = request.abort_handle();
        assert!(!request.is_aborted());
        handle.abort();
        assert!(request.is_aborted());
    }

    #[test]
    fn test_mark_executed_once() {
        let request = Request::new(HttpMethod::Delete, url());
        assert!(request.mark_executed().is_ok());
        assert!(matches!(
            request.mark_executed(),
            Err(HttpError::InvalidRequest(_))
        ));
    }
}
