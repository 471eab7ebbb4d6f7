//! Load runner
//!
//! Sends a batch of requests through the facade and prints a JSON summary.

use anyhow::Context;
use clap::Parser;
use courier_http::{
    run_concurrent, run_sequential, ExecutionMode, FacadeConfig, HttpMethod, LoadPlan,
    RequestFacade,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "courier-load")]
#[command(about = "Send sequential or concurrent requests through the courier facade")]
struct Args {
    /// Target URL ({i} is replaced by the request index)
    #[arg(short, long, default_value = "http://127.0.0.1:8081/")]
    url: String,

    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    #[arg(short, long, default_value = "GET")]
    method: HttpMethod,

    /// Number of requests
    #[arg(short = 'n', long, default_value = "1000")]
    requests: usize,

    /// Requests in flight at once; 1 runs sequentially
    #[arg(short, long, default_value = "1")]
    concurrency: usize,

    /// Execution mode (single, pooled)
    #[arg(long, default_value = "pooled")]
    mode: ExecutionMode,

    /// Form field as name=value (repeatable)
    #[arg(short, long = "field", value_parser = parse_field)]
    fields: Vec<(String, String)>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    Ok((name.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let facade = RequestFacade::new(FacadeConfig::complete().mode(args.mode));
    let plan = LoadPlan::new(args.method, args.url)
        .fields(args.fields)
        .requests(args.requests)
        .concurrency(args.concurrency);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    let report = if plan.concurrency > 1 {
        run_concurrent(&facade, &plan, &cancel).await
    } else {
        run_sequential(&facade, &plan, &cancel).await
    }
    .context("load run could not start")?;
    facade.release();

    println!("{}", serde_json::to_string_pretty(&report.summary())?);
    Ok(())
}
