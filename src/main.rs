mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use keysweep::agent;
use keysweep::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Run => agent::run(&config, agent::shutdown_signal()).await?,
        Commands::Once => {
            let report = agent::once(&config).await?;
            if report.found.is_empty() {
                println!("No new keys found");
            } else {
                println!("{}", report.found.to_message());
            }
        }
        Commands::Check(args) => match agent::check(&config, &args.key)? {
            Some(record) => println!(
                "{} ({}) seen {} via {} [{}]",
                record.key,
                record.platform,
                record.discovered_at.to_rfc3339(),
                record.source,
                record.status
            ),
            None => println!("{} has not been seen", args.key),
        },
        Commands::Claim(args) => {
            let record = agent::claim(&config, &args.key)?;
            println!("{} marked {}", record.key, record.status);
        }
    }

    Ok(())
}
