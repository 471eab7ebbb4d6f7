//! Echo server
//!
//! Fixed local endpoint for the courier load suite.

use clap::Parser;
use courier_echo::{serve, EchoStats};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "courier-echo")]
#[command(about = "Answer every HTTP request with a greeting line")]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:8081")]
    bind: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let listener = TcpListener::bind(args.bind).await?;
    let stats = Arc::new(EchoStats::default());

    serve(listener, stats.clone(), async {
        let _ = signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await?;

    info!("Served {} requests", stats.total());
    Ok(())
}
