use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use staylog_cli::commands;
use staylog_cli::config::{CliConfig, Command};
use staylog_service::LedgerService;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = CliConfig::parse();
    info!("server: {}", config.server_url);
    let service = Arc::new(commands::build_service(&config));

    match &config.command {
        Command::Scan(args) => {
            let review = commands::run_scan(service, args).await?;
            println!("{}", serde_json::to_string_pretty(&review)?);
        }
        Command::Dashboard { month, year } => {
            let summary = commands::dashboard(service.as_ref(), *month, *year).await?;
            print!("{}", commands::render_summary(&summary));
        }
        Command::Properties => {
            let properties = service.list_properties().await?;
            print!("{}", commands::render_properties(&properties));
        }
        Command::Health => {
            service.health_check().await?;
            println!("ok");
        }
    }
    Ok(())
}
