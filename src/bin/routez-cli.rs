use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "routez-cli")]
#[command(about = "Management CLI for a node's route table", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8222")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List active routes and their traffic counters
    List,
    /// Connect a new outbound route
    Add {
        /// Route URL, e.g. nats://10.0.0.2:6222
        route: String,
    },
    /// Tear down the route with this exact URL
    Remove {
        route: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let endpoint = format!("{}/routez", cli.url.trim_end_matches('/'));

    let res = match cli.command {
        Commands::List => client.get(&endpoint).send().await?,
        Commands::Add { route } => client.put(&endpoint).body(route).send().await?,
        Commands::Remove { route } => client.delete(&endpoint).body(route).send().await?,
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    let json: Option<Value> = serde_json::from_str(&text).ok();
    let failed = !status.is_success() || json.as_ref().is_some_and(|j| j.get("error").is_some());

    if failed {
        eprintln!("Error: admin endpoint returned status {}", status);
        eprintln!("Response: {}", text);
        std::process::exit(1);
    }

    match json {
        Some(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        None => println!("{}", text),
    }
    Ok(())
}
