//! Echo endpoint for the courier load suite
//!
//! Answers every method on every path with
//! `Hello, client serving <n>/s.\n`, where `<n>` counts the requests already
//! served in the current one-second window.

use axum::extract::State;
use axum::http::{Method, Uri};
use axum::Router;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Length of the request-rate window
pub const WINDOW: Duration = Duration::from_secs(1);

/// Request counters shared by the handler and the window ticker
#[derive(Debug, Default)]
pub struct EchoStats {
    window: AtomicU64,
    total: AtomicU64,
}

impl EchoStats {
    /// Requests served in the current window
    pub fn window(&self) -> u64 {
        self.window.load(Ordering::Relaxed)
    }

    /// Requests served since start
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    fn hit(&self) -> u64 {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.window.fetch_add(1, Ordering::Relaxed)
    }

    fn reset_window(&self) {
        self.window.store(0, Ordering::Relaxed);
    }
}

/// Router answering every request with the greeting line
pub fn router(stats: Arc<EchoStats>) -> Router {
    Router::new().fallback(echo).with_state(stats)
}

async fn echo(State(stats): State<Arc<EchoStats>>, method: Method, uri: Uri) -> String {
    let served = stats.hit();
    debug!(%method, %uri, "Serving {} requests/s", served + 1);
    format!("Hello, client serving {}/s.\n", served)
}

/// Serve on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, stats: Arc<EchoStats>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("Echo server listening on {}", addr);

    let ticker_stats = stats.clone();
    let ticker = tokio::spawn(async move {
        let mut interval = tokio::time::interval(WINDOW);
        interval.tick().await;
        loop {
            interval.tick().await;
            ticker_stats.reset_window();
        }
    });

    let result = axum::serve(listener, router(stats))
        .with_graceful_shutdown(shutdown)
        .await;
    ticker.abort();
    info!("Echo server on {} stopped", addr);
    result
}

/// A running echo server
pub struct EchoHandle {
    addr: SocketAddr,
    stats: Arc<EchoStats>,
    shutdown: CancellationToken,
    task: JoinHandle<io::Result<()>>,
}

impl EchoHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, e.g. `http://127.0.0.1:8081/`
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn stats(&self) -> &EchoStats {
        &self.stats
    }

    /// Stop accepting requests and wait for the server task to finish
    pub async fn shutdown(self) -> io::Result<()> {
        self.shutdown.cancel();
        self.task.await.map_err(io::Error::other)?
    }
}

/// Bind `addr` and run the server in a background task.
pub async fn spawn(addr: SocketAddr) -> io::Result<EchoHandle> {
    let listener = TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;
    let stats = Arc::new(EchoStats::default());
    let shutdown = CancellationToken::new();

    let signal = shutdown.clone();
    let task = tokio::spawn(serve(listener, stats.clone(), async move {
        signal.cancelled().await
    }));

    Ok(EchoHandle {
        addr,
        stats,
        shutdown,
        task,
    })
}
