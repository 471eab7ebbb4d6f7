//! Load harness: sequential and bounded-concurrent request runs

use crate::client::HttpClient;
use crate::error::{HttpError, HttpErrorCategory, HttpResult};
use crate::facade::RequestFacade;
use crate::request::{FormFields, HttpMethod, Request};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Placeholder in [`LoadPlan::url`] replaced by the request index
pub const INDEX_PLACEHOLDER: &str = "{i}";

/// What to send and how many times
#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub method: HttpMethod,
    /// Target URL; `{i}` is replaced by the request index
    pub url: String,
    pub fields: FormFields,
    pub requests: usize,
    /// Maximum requests in flight at once (concurrent runs only)
    pub concurrency: usize,
}

impl LoadPlan {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            fields: Vec::new(),
            requests: 1,
            concurrency: 1,
        }
    }

    pub fn fields(mut self, fields: FormFields) -> Self {
        self.fields = fields;
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn requests(mut self, requests: usize) -> Self {
        self.requests = requests;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn url_for(&self, index: usize) -> String {
        self.url.replace(INDEX_PLACEHOLDER, &index.to_string())
    }

    fn build(&self, facade: &RequestFacade, index: usize) -> HttpResult<Request> {
        facade.build_request(self.method, &self.url_for(index), &self.fields)
    }
}

/// Result of one request in a run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Completed { body: String, latency_ms: u64 },
    Failed { category: HttpErrorCategory, message: String },
    Cancelled,
}

impl Outcome {
    fn from_error(e: &HttpError) -> Self {
        Outcome::Failed {
            category: e.category(),
            message: e.sanitized_message(),
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Outcome::Completed { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestOutcome {
    pub index: usize,
    pub outcome: Outcome,
}

/// Per-request outcomes of a run, ordered by index
#[derive(Debug, Default, Serialize)]
pub struct LoadReport {
    pub outcomes: Vec<RequestOutcome>,
    /// Workers that panicked; their outcomes are missing
    pub panicked: usize,
    pub elapsed_ms: u64,
}

/// Counters of a [`LoadReport`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSummary {
    pub requests: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub panicked: usize,
    pub elapsed_ms: u64,
    pub requests_per_sec: f64,
}

impl LoadReport {
    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Completed { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Cancelled))
    }

    pub fn summary(&self) -> LoadSummary {
        let secs = self.elapsed_ms as f64 / 1000.0;
        let succeeded = self.succeeded();
        LoadSummary {
            requests: self.outcomes.len() + self.panicked,
            succeeded,
            failed: self.failed(),
            cancelled: self.cancelled(),
            panicked: self.panicked,
            elapsed_ms: self.elapsed_ms,
            requests_per_sec: if secs > 0.0 { succeeded as f64 / secs } else { 0.0 },
        }
    }
}

/// Execute and drain one request, aborting it if `cancel` fires first.
async fn run_one(client: &HttpClient, request: Request, cancel: &CancellationToken) -> Outcome {
    if cancel.is_cancelled() {
        request.abort();
        return Outcome::Cancelled;
    }

    let work = async {
        let response = client.execute(&request).await?;
        let latency = response.latency();
        let body = response.drain_to_string(&request).await?;
        Ok::<(String, Duration), HttpError>((body, latency))
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            request.abort();
            Outcome::Cancelled
        }
        result = work => match result {
            Ok((body, latency)) => Outcome::Completed {
                body,
                latency_ms: latency.as_millis() as u64,
            },
            Err(e) => Outcome::from_error(&e),
        },
    }
}

/// Send the plan's requests one after another through one client.
pub async fn run_sequential(
    facade: &RequestFacade,
    plan: &LoadPlan,
    cancel: &CancellationToken,
) -> HttpResult<LoadReport> {
    info!(method = %plan.method, url = %plan.url, requests = plan.requests, "Sequential run started");
    let start = Instant::now();
    let client = facade.acquire_client()?;

    let mut report = LoadReport::default();
    for index in 0..plan.requests {
        let request = plan.build(facade, index)?;
        let outcome = run_one(&client, request, cancel).await;
        report.outcomes.push(RequestOutcome { index, outcome });
    }

    report.elapsed_ms = start.elapsed().as_millis() as u64;
    info!(summary = ?report.summary(), "Sequential run ended");
    Ok(report)
}

/// Send the plan's requests from a bounded set of tasks sharing one client.
///
/// At most `plan.concurrency` requests are in flight. Every task is joined
/// before this returns, so releasing the facade afterwards is safe.
/// Cancelling `cancel` stops dispatch and aborts in-flight requests.
pub async fn run_concurrent(
    facade: &RequestFacade,
    plan: &LoadPlan,
    cancel: &CancellationToken,
) -> HttpResult<LoadReport> {
    info!(
        method = %plan.method,
        url = %plan.url,
        requests = plan.requests,
        concurrency = plan.concurrency,
        "Concurrent run started"
    );
    let start = Instant::now();
    let client = facade.acquire_client()?;
    let requests = (0..plan.requests)
        .map(|index| plan.build(facade, index))
        .collect::<HttpResult<Vec<_>>>()?;

    let semaphore = Arc::new(Semaphore::new(plan.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut report = LoadReport::default();

    for (index, request) in requests.into_iter().enumerate() {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = semaphore.clone().acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            request.abort();
            report.outcomes.push(RequestOutcome {
                index,
                outcome: Outcome::Cancelled,
            });
            continue;
        };

        let client = client.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let _permit = permit;
            RequestOutcome {
                index,
                outcome: run_one(&client, request, &cancel).await,
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => report.outcomes.push(outcome),
            Err(e) => {
                error!("Load worker failed to complete: {}", e);
                report.panicked += 1;
            }
        }
    }

    report.outcomes.sort_by_key(|o| o.index);
    report.elapsed_ms = start.elapsed().as_millis() as u64;
    info!(summary = ?report.summary(), "Concurrent run ended");
    Ok(report)
}
