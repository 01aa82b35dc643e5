//! DNS gateway binary.
//!
//! Loads configuration, installs logging and serves `POST /query` until
//! SIGINT or SIGTERM.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use dns_gateway::config::load_config;
use dns_gateway::lifecycle;
use dns_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "dns-gateway")]
#[command(about = "HTTP gateway that runs DNS lookups with kdig", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match logging::with_bootstrap_logging(|| load_config(cli.config.as_deref())) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dns-gateway: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        tool = %config.lookup.tool,
        request_timeout_secs = config.timeouts.request_secs,
        "dns-gateway starting"
    );

    match lifecycle::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Gateway stopped with error");
            ExitCode::FAILURE
        }
    }
}
