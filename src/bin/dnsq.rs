use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "dnsq")]
#[command(about = "Query a DNS gateway from the command line", long_about = None)]
#[command(subcommand_negates_reqs = true)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Nameserver to ask (IP or hostname)
    #[arg(required = true)]
    nameserver: Option<String>,

    /// Name to resolve
    #[arg(required = true)]
    name: Option<String>,

    /// Record type
    #[arg(short = 't', long = "type", default_value = "A", value_parser = ["A", "AAAA"])]
    record_type: String,

    /// Transport (UDP when omitted)
    #[arg(long, value_parser = ["tcp", "tls", "https"])]
    transport: Option<String>,

    /// Request DNSSEC records
    #[arg(long)]
    dnssec: bool,

    /// Short answer form
    #[arg(long)]
    short: bool,

    /// Ask the lookup tool for JSON output
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Some(Commands::Health) => client.get(format!("{}/healthz", base)).send().await?,
        None => {
            let (Some(nameserver), Some(name)) = (cli.nameserver, cli.name) else {
                return Err("nameserver and name are required".into());
            };
            let body = json!({
                "nameserver": nameserver,
                "name": name,
                "type": cli.record_type,
                "transport": cli.transport.unwrap_or_default(),
                "dnssec": cli.dnssec,
                "short": cli.short,
                "json": cli.json,
            });
            client
                .post(format!("{}/query", base))
                .json(&body)
                .send()
                .await?
        }
    };

    if print_response(res).await? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Print the gateway's reply. Returns whether the status was 2xx.
async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(value) => serde_json::to_string_pretty(&value)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", rendered);
    } else {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("{}", rendered);
    }
    Ok(status.is_success())
}
