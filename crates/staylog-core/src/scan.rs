use std::fmt;

use serde::{Deserialize, Serialize};

/// Which extraction schema the scan backend should populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanModule {
    Booking,
    Expense,
    Earning,
}

impl ScanModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanModule::Booking => "booking",
            ScanModule::Expense => "expense",
            ScanModule::Earning => "earning",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "booking" => Some(ScanModule::Booking),
            "expense" => Some(ScanModule::Expense),
            "earning" => Some(ScanModule::Earning),
            _ => None,
        }
    }
}

impl fmt::Display for ScanModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a scan job as reported by the backend.
///
/// The backend does not distinguish a queued job from one being worked on;
/// both arrive as `Scanning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    #[serde(alias = "queued", alias = "pending", alias = "processing")]
    Scanning,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Scanning => "scanning",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartScan {
    pub attachment_id: String,
    pub module: ScanModule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTicket {
    pub task_id: String,
}

/// One status report for a scan task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub status: ScanStatus,
    /// Extracted fields; only meaningful when `status` is `Completed`.
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScanReport {
    pub fn scanning() -> Self {
        Self {
            status: ScanStatus::Scanning,
            output: None,
            error: None,
        }
    }

    pub fn completed(output: serde_json::Value) -> Self {
        Self {
            status: ScanStatus::Completed,
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: ScanStatus::Failed,
            output: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_parse_str_all() {
        assert_eq!(ScanModule::parse_str("booking"), Some(ScanModule::Booking));
        assert_eq!(ScanModule::parse_str("expense"), Some(ScanModule::Expense));
        assert_eq!(ScanModule::parse_str("earning"), Some(ScanModule::Earning));
        assert_eq!(ScanModule::parse_str("property"), None);
        assert_eq!(ScanModule::parse_str(""), None);
    }

    #[test]
    fn queued_collapses_to_scanning() {
        for raw in ["\"queued\"", "\"pending\"", "\"processing\"", "\"scanning\""] {
            let status: ScanStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(status, ScanStatus::Scanning);
        }
        assert!(serde_json::from_str::<ScanStatus>("\"exploded\"").is_err());
    }

    #[test]
    fn report_without_output_decodes() {
        let report: ScanReport = serde_json::from_str(r#"{"status":"scanning"}"#).unwrap();
        assert_eq!(report, ScanReport::scanning());
        assert!(report.error.is_none());
    }

    #[test]
    fn completed_report_carries_output() {
        let report: ScanReport =
            serde_json::from_str(r#"{"status":"completed","output":{"amount":500}}"#).unwrap();
        assert_eq!(report.status, ScanStatus::Completed);
        assert_eq!(report.output, Some(serde_json::json!({"amount": 500})));
    }
}
