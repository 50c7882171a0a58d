use async_trait::async_trait;
use staylog_core::attachment::{Attachment, AttachmentRef, UploadFile};
use staylog_core::booking::{Booking, CreateBooking};
use staylog_core::earning::{CreateEarning, Earning};
use staylog_core::expense::{CreateExpense, Expense};
use staylog_core::property::{CreateProperty, Property, UpdateProperty};
use staylog_core::scan::{ScanReport, ScanTicket, StartScan};
use staylog_core::stats::MonthlyStats;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Bookkeeping operations against the ledger backend.
///
/// `property_id` filters are optional; `None` lists across all properties.
#[async_trait]
pub trait LedgerService: Send + Sync {
    // -- Properties --
    async fn list_properties(&self) -> Result<Vec<Property>, ServiceError>;
    async fn get_property(&self, id: &str) -> Result<Property, ServiceError>;
    async fn create_property(&self, input: &CreateProperty) -> Result<Property, ServiceError>;
    async fn update_property(
        &self,
        id: &str,
        update: &UpdateProperty,
    ) -> Result<Property, ServiceError>;
    async fn delete_property(&self, id: &str) -> Result<(), ServiceError>;

    // -- Bookings --
    async fn list_bookings(&self, property_id: Option<&str>) -> Result<Vec<Booking>, ServiceError>;
    async fn create_booking(&self, input: &CreateBooking) -> Result<Booking, ServiceError>;
    async fn delete_booking(&self, id: &str) -> Result<(), ServiceError>;

    // -- Earnings --
    async fn list_earnings(&self, property_id: Option<&str>) -> Result<Vec<Earning>, ServiceError>;
    async fn create_earning(&self, input: &CreateEarning) -> Result<Earning, ServiceError>;
    async fn delete_earning(&self, id: &str) -> Result<(), ServiceError>;

    // -- Expenses --
    async fn list_expenses(&self, property_id: Option<&str>) -> Result<Vec<Expense>, ServiceError>;
    async fn create_expense(&self, input: &CreateExpense) -> Result<Expense, ServiceError>;
    async fn delete_expense(&self, id: &str) -> Result<(), ServiceError>;

    // -- Stats --
    async fn monthly_stats(&self, month: u32, year: i32) -> Result<MonthlyStats, ServiceError>;
}

/// Uploaded files bound to a property.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn upload_attachment(
        &self,
        property_id: &str,
        file: &UploadFile,
    ) -> Result<AttachmentRef, ServiceError>;
    async fn list_attachments(&self, property_id: &str) -> Result<Vec<Attachment>, ServiceError>;
    async fn attachment_download_url(&self, id: &str) -> Result<String, ServiceError>;
    async fn delete_attachment(&self, id: &str) -> Result<(), ServiceError>;
}

/// Asynchronous document extraction jobs.
#[async_trait]
pub trait ScanBackend: Send + Sync {
    async fn start_scan(&self, input: &StartScan) -> Result<ScanTicket, ServiceError>;
    async fn get_scan_status(&self, task_id: &str) -> Result<ScanReport, ServiceError>;
}
