use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;

use security_sentinel::webhooks::{sign, verify};

#[derive(Parser)]
#[command(name = "sentinel-cli")]
#[command(about = "Operator CLI for security-sentinel", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin API key (only needed for `webhooks`)
    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    /// Security API key for `dashboard`, `metrics` and `events`
    #[arg(short = 'a', long, default_value = "")]
    api_key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the security dashboard
    Dashboard,
    /// Show security metrics
    Metrics,
    /// Search recorded events
    Events {
        #[arg(long = "type")]
        event_type: Option<String>,
        #[arg(long)]
        severity: Option<String>,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        tenant: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// List registered webhooks
    Webhooks,
    /// Sign a payload (file or stdin) with HMAC-SHA256
    Sign {
        #[arg(long)]
        secret: String,
        file: Option<PathBuf>,
    },
    /// Verify a payload signature (file or stdin)
    Verify {
        #[arg(long)]
        secret: String,
        #[arg(long)]
        signature: String,
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Dashboard => {
            let res = client
                .get(format!("{}/api/security/dashboard", cli.url))
                .bearer_auth(&cli.api_key)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Metrics => {
            let res = client
                .get(format!("{}/api/security/metrics", cli.url))
                .bearer_auth(&cli.api_key)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Events {
            event_type,
            severity,
            ip,
            user,
            tenant,
            limit,
        } => {
            let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
            let filters = [
                ("type", event_type),
                ("severity", severity),
                ("ip", ip),
                ("userId", user),
                ("tenantId", tenant),
            ];
            query.extend(filters.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))));

            let res = client
                .get(format!("{}/api/security/events", cli.url))
                .bearer_auth(&cli.api_key)
                .query(&query)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Webhooks => {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", cli.key))?);
            let res = client
                .get(format!("{}/admin/webhooks", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Sign { secret, file } => {
            let payload = read_payload(file)?;
            println!("{}", sign(&payload, &secret));
        }
        Commands::Verify {
            secret,
            signature,
            file,
        } => {
            let payload = read_payload(file)?;
            if verify(&payload, signature.trim(), &secret)? {
                println!("valid");
            } else {
                println!("invalid");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn read_payload(file: Option<PathBuf>) -> Result<Vec<u8>, std::io::Error> {
    match file {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
