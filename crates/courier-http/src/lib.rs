//! courier-http: configurable request facade over reqwest
//!
//! Builds pooled or single-connection clients from an explicit
//! [`FacadeConfig`], constructs form-encoded requests for each verb and reduces
//! response bodies to strings.
//!
//! # Architecture
//!
//! - `RequestFacade`: configuration, client acquisition, verb builders, release
//! - `HttpClient`: the handle requests are executed through
//! - `ConnectionManager`: the shared pool behind pooled clients
//! - `HttpResponse::drain_to_string`: line-by-line body reduction
//! - `loadtest`: sequential and bounded-concurrent runs used by the load suite

pub mod client;
pub mod config;
pub mod error;
pub mod facade;
pub mod loadtest;
pub mod pool;
pub mod request;
pub mod response;
pub mod scheme;

pub use client::HttpClient;
pub use config::{Charset, ClientParams, ExecutionMode, FacadeConfig, SchemeSupport};
pub use error::{HttpError, HttpErrorCategory, HttpResult};
pub use facade::{
    run_once, simple_delete, simple_get, simple_patch, simple_post, simple_put, RequestFacade,
    NO_FIELDS,
};
pub use loadtest::{run_concurrent, run_sequential, LoadPlan, LoadReport, LoadSummary, Outcome};
pub use pool::ConnectionManager;
pub use request::{AbortHandle, FormFields, HttpMethod, Request};
pub use response::HttpResponse;
pub use scheme::{Scheme, SchemeRegistry};
