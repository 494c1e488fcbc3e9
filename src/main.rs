use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dnscap::analyzer::AnalysisResponse;
use dnscap::cache::LocalChainCache;
use dnscap::config::{AnalyzerConfig, parse_upstream};
use dnscap::event_log::open_event_log;
use dnscap::report::render_report;
use dnscap::{ChainAnalyzer, ChainService, RequestContext};

/// Inspect the DNSSEC chain of trust of one or more domains
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Domains to analyze
    #[arg(required = true)]
    domains: Vec<String>,

    /// Print the JSON report instead of the text summary
    #[arg(long)]
    json: bool,

    /// Write output to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Upstream resolver, repeatable; replaces the configured list
    #[arg(long = "resolver", value_name = "ADDR", value_parser = parse_upstream)]
    resolvers: Vec<SocketAddr>,

    /// Per-query timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Fetch the record types of each zone concurrently
    #[arg(long)]
    parallel: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> Result<AnalyzerConfig, Box<dyn std::error::Error>> {
    let mut config = AnalyzerConfig::from_env()?;
    if !args.resolvers.is_empty() {
        config.upstream_servers = args.resolvers.clone();
    }
    if let Some(ms) = args.timeout_ms {
        config.query_timeout = Duration::from_millis(ms);
    }
    if args.parallel {
        config.parallel_record_fetch = true;
    }
    config.validate()?;
    Ok(config)
}

fn render(responses: &[AnalysisResponse], json: bool) -> Result<String, serde_json::Error> {
    if json {
        return match responses {
            [single] => serde_json::to_string_pretty(single),
            many => serde_json::to_string_pretty(many),
        };
    }

    let mut out = String::new();
    for response in responses {
        match response {
            AnalysisResponse::Success(report) => out.push_str(&render_report(report)),
            AnalysisResponse::Failure(failure) => {
                out.push_str(&format!("Analysis of {} failed: {}\n", failure.domain, failure.error))
            }
        }
        out.push('\n');
    }
    Ok(out)
}

async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    info!(
        "Using upstreams {:?} with {:?} per query",
        config.upstream_servers, config.query_timeout
    );

    let analyzer = ChainAnalyzer::from_config(&config)?;
    let service = ChainService::new(
        analyzer,
        Box::new(LocalChainCache::new()),
        open_event_log(config.event_log_path.as_deref()),
        config.cache_ttl,
    );

    let context = RequestContext::default();
    let mut responses = Vec::with_capacity(args.domains.len());
    for domain in &args.domains {
        responses.push(service.chain(domain, &context).await);
    }
    let all_succeeded = responses.iter().all(AnalysisResponse::is_success);

    let output = render(&responses, args.json)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, output)?;
            info!("Report written to {}", path.display());
        }
        None => print!("{}", output),
    }
    Ok(all_succeeded)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
