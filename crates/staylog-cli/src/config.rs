use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use staylog_core::scan::ScanModule;
use staylog_scan::PollConfig;

#[derive(Debug, Parser)]
#[command(name = "staylog", about = "Rental ledger client and document scanner")]
pub struct CliConfig {
    /// Server URL
    #[arg(
        long,
        env = "STAYLOG_SERVER_URL",
        default_value = "http://127.0.0.1:8080",
        global = true
    )]
    pub server_url: String,

    /// Bearer token for the server
    #[arg(long, env = "STAYLOG_API_KEY", global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a document and extract its fields
    Scan(ScanArgs),
    /// Show the monthly dashboard
    Dashboard {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
        #[arg(long)]
        year: i32,
    },
    /// List properties
    Properties,
    /// Check that the server is reachable
    Health,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Document to upload
    pub file: PathBuf,

    /// Property the document belongs to
    #[arg(long)]
    pub property: String,

    /// Extraction schema: booking, expense or earning
    #[arg(long, value_parser = parse_module)]
    pub module: ScanModule,

    /// Delay between status checks (milliseconds)
    #[arg(long, env = "STAYLOG_POLL_INTERVAL_MS", default_value = "3000")]
    pub poll_interval_ms: u64,

    /// Status checks before giving up
    #[arg(long, env = "STAYLOG_MAX_ATTEMPTS", default_value = "60")]
    pub max_attempts: u32,

    /// Largest accepted document (bytes)
    #[arg(long, env = "STAYLOG_MAX_FILE_SIZE", default_value = "5242880")]
    pub max_file_size: u64,

    /// Optional wall-clock limit for the scan (seconds)
    #[arg(long, env = "STAYLOG_SCAN_DEADLINE_SECS")]
    pub deadline_secs: Option<u64>,
}

impl ScanArgs {
    pub fn poll_config(&self) -> PollConfig {
        let config = PollConfig::default()
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_max_attempts(self.max_attempts)
            .with_max_file_size(self.max_file_size);
        match self.deadline_secs {
            Some(secs) => config.with_deadline(Duration::from_secs(secs)),
            None => config,
        }
    }
}

fn parse_module(s: &str) -> Result<ScanModule, String> {
    ScanModule::parse_str(&s.to_lowercase())
        .ok_or_else(|| format!("unknown module '{s}' (expected booking, expense or earning)"))
}
