use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "lifecycle-cli")]
#[command(about = "Probe a running managed-lifecycle service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness probe
    Health,
    /// Readiness probe
    Ready,
    /// Lifecycle phase, flags and in-flight count
    Status,
    /// Send one request to the main endpoint
    Hit,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let path = match cli.command {
        Commands::Health => "/health",
        Commands::Ready => "/ready",
        Commands::Status => "/status",
        Commands::Hit => "/",
    };

    let res = client.get(format!("{}{}", cli.url, path)).send().await?;
    print_response(res, matches!(cli.command, Commands::Status)).await
}

async fn print_response(
    res: reqwest::Response,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    println!("{}", status);

    if json && status.is_success() {
        let body: Value = res.json().await?;
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print!("{}", res.text().await?);
    }

    if !status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
