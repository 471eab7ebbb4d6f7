//! Facade configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which URL schemes the facade registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeSupport {
    /// `http` only
    Http,
    /// `https` only
    Https,
    /// Both `http` and `https`
    Both,
}

/// How requests are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// A fresh client per acquisition, no connection manager.
    /// Concurrent use of one client is unsupported.
    SingleThreaded,
    /// One shared connection manager for all requests
    Pooled,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" | "single-threaded" => Ok(Self::SingleThreaded),
            "pooled" | "pool" => Ok(Self::Pooled),
            _ => Err(format!("Invalid execution mode: {}", s)),
        }
    }
}

/// Charset used to form-url-encode request bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// ISO-8859-1, the historical default for url-encoded forms
    #[default]
    Iso8859_1,
    /// UTF-8
    Utf8,
}

impl Charset {
    /// Name as sent in the `Content-Type` charset parameter
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Iso8859_1 => "ISO-8859-1",
            Charset::Utf8 => "UTF-8",
        }
    }

    /// Encode `text` into bytes, or return the first unrepresentable char.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, char> {
        match self {
            Charset::Utf8 => Ok(text.as_bytes().to_vec()),
            Charset::Iso8859_1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).map_err(|_| c))
                .collect(),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Base parameters handed to every client the facade builds
#[derive(Debug, Clone)]
pub struct ClientParams {
    /// Total request timeout; `None` leaves the library default (no timeout)
    pub timeout: Option<Duration>,

    /// Connection timeout; `None` leaves the library default
    pub connect_timeout: Option<Duration>,

    /// Maximum idle connections per host (pooled mode only)
    pub pool_max_idle_per_host: usize,

    /// Idle connection timeout (pooled mode only)
    pub pool_idle_timeout: Duration,

    /// User-Agent header value
    pub user_agent: String,

    /// Whether to accept invalid certificates (for testing only)
    pub danger_accept_invalid_certs: bool,
}

impl Default for ClientParams {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: None,
            pool_max_idle_per_host: usize::MAX,
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: format!("courier-http/{}", env!("CARGO_PKG_VERSION")),
            danger_accept_invalid_certs: false,
        }
    }
}

/// Configuration consumed by [`RequestFacade::new`](crate::RequestFacade::new)
#[derive(Debug, Clone)]
pub struct FacadeConfig {
    /// Registered schemes
    pub schemes: SchemeSupport,

    /// Execution mode
    pub mode: ExecutionMode,

    /// Charset for form bodies
    pub charset: Charset,

    /// Client parameters
    pub params: ClientParams,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self::complete()
    }
}

impl FacadeConfig {
    /// Create a new config with default values (both schemes, pooled)
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP only, pooled
    pub fn http() -> Self {
        Self::preset(SchemeSupport::Http, ExecutionMode::Pooled)
    }

    /// HTTPS only, pooled
    pub fn https() -> Self {
        Self::preset(SchemeSupport::Https, ExecutionMode::Pooled)
    }

    /// HTTP and HTTPS, pooled
    pub fn complete() -> Self {
        Self::preset(SchemeSupport::Both, ExecutionMode::Pooled)
    }

    /// HTTP and HTTPS, single-threaded
    pub fn single() -> Self {
        Self::preset(SchemeSupport::Both, ExecutionMode::SingleThreaded)
    }

    fn preset(schemes: SchemeSupport, mode: ExecutionMode) -> Self {
        Self {
            schemes,
            mode,
            charset: Charset::default(),
            params: ClientParams::default(),
        }
    }

    /// Set scheme support
    pub fn schemes(mut self, schemes: SchemeSupport) -> Self {
        self.schemes = schemes;
        self
    }

    /// Set execution mode
    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the form body charset
    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Set the total timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.params.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.params.connect_timeout = Some(timeout);
        self
    }

    /// Set max idle connections per host
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.params.pool_max_idle_per_host = max;
        self
    }

    /// Set idle connection timeout
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.params.pool_idle_timeout = timeout;
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.params.user_agent = user_agent.into();
        self
    }

    /// Accept invalid certificates (DANGER - testing only)
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.params.danger_accept_invalid_certs = accept;
        self
    }
}
