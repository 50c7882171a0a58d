use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use staylog_core::attachment::UploadFile;
use staylog_core::property::Property;
use staylog_core::stats::DashboardSummary;
use staylog_scan::{ScanPoller, ScanRequest, ScanReview, ScanState};
use staylog_service::{HttpService, LedgerService};
use tracing::{info, warn};

use crate::config::{CliConfig, ScanArgs};

/// HTTP client for `config`, with a session hook that reports expired keys.
pub fn build_service(config: &CliConfig) -> HttpService {
    let service = match &config.api_key {
        Some(key) => HttpService::with_api_key(&config.server_url, key.clone()),
        None => HttpService::new(&config.server_url),
    };
    service.on_session_expired(Arc::new(|| {
        warn!("server rejected the API key; set STAYLOG_API_KEY to a valid token");
    }))
}

/// Upload `args.file`, run the scan to completion and return its review.
pub async fn run_scan(service: Arc<HttpService>, args: &ScanArgs) -> Result<ScanReview> {
    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    let poller = ScanPoller::with_backend(service, args.poll_config());
    let mut rx = poller.subscribe();
    let logger = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            match &state {
                ScanState::Scanning {
                    task_id: Some(task_id),
                    attempts,
                    ..
                } => info!("scanning (task={task_id}, checks={attempts})"),
                other => info!("{}", other.phase()),
            }
        }
    });

    poller.submit(ScanRequest {
        property_id: args.property.clone(),
        module: args.module,
        file: UploadFile::new(file_name, data),
    })?;
    let settled = poller.wait_settled().await;
    logger.abort();

    match settled {
        ScanState::Complete { .. } => poller
            .review()
            .context("scan completed without a reviewable result"),
        ScanState::Error(e) => Err(e.into()),
        other => bail!("scan ended in unexpected state: {}", other.phase()),
    }
}

pub async fn dashboard(
    service: &dyn LedgerService,
    month: u32,
    year: i32,
) -> Result<DashboardSummary> {
    let stats = service
        .monthly_stats(month, year)
        .await
        .with_context(|| format!("failed to fetch stats for {month}/{year}"))?;
    Ok(stats.summary())
}

pub fn render_summary(summary: &DashboardSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:02}/{}", summary.month, summary.year);
    let _ = writeln!(out, "  earnings  {:>12.2}", summary.total_earnings);
    let _ = writeln!(out, "  expenses  {:>12.2}", summary.total_expenses);
    let _ = writeln!(out, "  net       {:>12.2}", summary.net_profit);
    for p in &summary.properties {
        let _ = writeln!(out, "  {:<24} {:>12.2}", p.property_name, p.net);
    }
    out
}

pub fn render_properties(properties: &[Property]) -> String {
    if properties.is_empty() {
        return "no properties\n".to_string();
    }
    let mut out = String::new();
    for p in properties {
        let rooms = p.rooms.map(|r| format!("{r} rooms")).unwrap_or_default();
        let _ = writeln!(out, "{}  {:<24} {:<32} {}", p.id, p.name, p.address, rooms);
    }
    out
}
