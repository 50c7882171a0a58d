use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use staylog_core::attachment::{Attachment, AttachmentRef, DownloadUrl, UploadFile};
use staylog_core::booking::{Booking, CreateBooking};
use staylog_core::earning::{CreateEarning, Earning};
use staylog_core::expense::{CreateExpense, Expense};
use staylog_core::property::{CreateProperty, Property, UpdateProperty};
use staylog_core::scan::{ScanReport, ScanTicket, StartScan};
use staylog_core::stats::MonthlyStats;
use tracing::warn;

use crate::{AttachmentStore, LedgerService, ScanBackend, ServiceError};

/// Called whenever the server rejects the bearer token with a 401.
pub type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

/// Async HTTP client for the ledger backend.
pub struct HttpService {
    base_url: String,
    client: Client,
    api_key: Option<String>,
    on_session_expired: Option<SessionExpiredHook>,
}

impl HttpService {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            client: Client::new(),
            api_key: None,
            on_session_expired: None,
        }
    }

    pub fn with_api_key(base_url: &str, key: String) -> Self {
        let mut svc = Self::new(base_url);
        svc.api_key = Some(key);
        svc
    }

    /// Register the session manager's logout callback.
    pub fn on_session_expired(mut self, hook: SessionExpiredHook) -> Self {
        self.on_session_expired = Some(hook);
        self
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }

    /// Check if the server is reachable.
    /// Health endpoint is NOT authenticated.
    pub async fn health_check(&self) -> Result<(), ServiceError> {
        let resp = self
            .client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("connection failed: {e}")))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ServiceError::Internal(format!(
                "health check failed: {}",
                resp.status()
            )))
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ServiceError> {
        let resp = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED {
            if let Some(hook) = &self.on_session_expired {
                warn!("server rejected credentials, ending session");
                hook();
            }
        }
        Err(parse_error_with_status(status, resp).await)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let builder = self.client.get(format!("{}{path}", self.base_url));
        let resp = self.send(builder).await?;
        decode_json(resp).await
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let builder = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body);
        let resp = self.send(builder).await?;
        decode_json(resp).await
    }

    async fn put_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let builder = self
            .client
            .put(format!("{}{path}", self.base_url))
            .json(body);
        let resp = self.send(builder).await?;
        decode_json(resp).await
    }

    /// GET a list endpoint, optionally narrowed to one property.
    async fn get_filtered<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        property_id: Option<&str>,
    ) -> Result<T, ServiceError> {
        let mut builder = self.client.get(format!("{}{path}", self.base_url));
        if let Some(pid) = property_id {
            builder = builder.query(&[("property_id", pid)]);
        }
        let resp = self.send(builder).await?;
        decode_json(resp).await
    }

    async fn delete_req(&self, path: &str) -> Result<(), ServiceError> {
        let builder = self.client.delete(format!("{}{path}", self.base_url));
        self.send(builder).await?;
        Ok(())
    }
}

async fn decode_json<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, ServiceError> {
    resp.json::<T>()
        .await
        .map_err(|e| ServiceError::Internal(format!("json decode: {e}")))
}

async fn parse_error_with_status(status: StatusCode, resp: Response) -> ServiceError {
    let body = resp.text().await.unwrap_or_default();
    let msg = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v["error"]
                .as_str()
                .or_else(|| v["message"].as_str())
                .map(String::from)
        })
        .unwrap_or(body);
    let msg = if msg.is_empty() {
        status.to_string()
    } else {
        msg
    };

    if status == StatusCode::NOT_FOUND {
        ServiceError::NotFound(msg)
    } else if status == StatusCode::BAD_REQUEST
        || status == StatusCode::UNPROCESSABLE_ENTITY
        || status == StatusCode::PAYLOAD_TOO_LARGE
    {
        ServiceError::InvalidInput(msg)
    } else if status == StatusCode::UNAUTHORIZED {
        ServiceError::Unauthorized(msg)
    } else {
        ServiceError::Internal(msg)
    }
}

#[async_trait]
impl LedgerService for HttpService {
    async fn list_properties(&self) -> Result<Vec<Property>, ServiceError> {
        self.get_json("/api/properties").await
    }

    async fn get_property(&self, id: &str) -> Result<Property, ServiceError> {
        self.get_json(&format!("/api/properties/{id}")).await
    }

    async fn create_property(&self, input: &CreateProperty) -> Result<Property, ServiceError> {
        self.post_json("/api/properties", input).await
    }

    async fn update_property(
        &self,
        id: &str,
        update: &UpdateProperty,
    ) -> Result<Property, ServiceError> {
        self.put_json(&format!("/api/properties/{id}"), update).await
    }

    async fn delete_property(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_req(&format!("/api/properties/{id}")).await
    }

    async fn list_bookings(&self, property_id: Option<&str>) -> Result<Vec<Booking>, ServiceError> {
        self.get_filtered("/api/bookings", property_id).await
    }

    async fn create_booking(&self, input: &CreateBooking) -> Result<Booking, ServiceError> {
        input
            .validate()
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
        self.post_json("/api/bookings", input).await
    }

    async fn delete_booking(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_req(&format!("/api/bookings/{id}")).await
    }

    async fn list_earnings(&self, property_id: Option<&str>) -> Result<Vec<Earning>, ServiceError> {
        self.get_filtered("/api/earnings", property_id).await
    }

    async fn create_earning(&self, input: &CreateEarning) -> Result<Earning, ServiceError> {
        input
            .validate()
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
        self.post_json("/api/earnings", input).await
    }

    async fn delete_earning(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_req(&format!("/api/earnings/{id}")).await
    }

    async fn list_expenses(&self, property_id: Option<&str>) -> Result<Vec<Expense>, ServiceError> {
        self.get_filtered("/api/expenses", property_id).await
    }

    async fn create_expense(&self, input: &CreateExpense) -> Result<Expense, ServiceError> {
        input
            .validate()
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
        self.post_json("/api/expenses", input).await
    }

    async fn delete_expense(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_req(&format!("/api/expenses/{id}")).await
    }

    async fn monthly_stats(&self, month: u32, year: i32) -> Result<MonthlyStats, ServiceError> {
        self.get_json(&format!("/api/stats/monthly?month={month}&year={year}"))
            .await
    }
}

#[async_trait]
impl AttachmentStore for HttpService {
    async fn upload_attachment(
        &self,
        property_id: &str,
        file: &UploadFile,
    ) -> Result<AttachmentRef, ServiceError> {
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| ServiceError::InvalidInput(format!("content type: {e}")))?;
        let builder = self
            .client
            .post(format!(
                "{}/api/properties/{property_id}/attachments",
                self.base_url
            ))
            .multipart(Form::new().part("file", part));
        let resp = self.send(builder).await?;
        decode_json(resp).await
    }

    async fn list_attachments(&self, property_id: &str) -> Result<Vec<Attachment>, ServiceError> {
        self.get_json(&format!("/api/properties/{property_id}/attachments"))
            .await
    }

    async fn attachment_download_url(&self, id: &str) -> Result<String, ServiceError> {
        let link: DownloadUrl = self
            .get_json(&format!("/api/attachments/{id}/download"))
            .await?;
        Ok(link.url)
    }

    async fn delete_attachment(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_req(&format!("/api/attachments/{id}")).await
    }
}

#[async_trait]
impl ScanBackend for HttpService {
    async fn start_scan(&self, input: &StartScan) -> Result<ScanTicket, ServiceError> {
        self.post_json("/api/agent/scan", input).await
    }

    async fn get_scan_status(&self, task_id: &str) -> Result<ScanReport, ServiceError> {
        self.get_json(&format!("/api/agent/scan/{task_id}")).await
    }
}
