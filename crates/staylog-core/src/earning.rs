use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::StaylogError;

/// Income not tied to a booking record (extras, deposits kept, etc.).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Earning {
    pub id: String,
    pub property_id: String,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub booking_id: Option<String>,
    #[serde(default)]
    pub attachment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEarning {
    pub property_id: String,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub booking_id: Option<String>,
    #[serde(default)]
    pub attachment_id: Option<String>,
}

impl CreateEarning {
    pub fn validate(&self) -> Result<(), StaylogError> {
        if self.amount <= 0.0 {
            return Err(StaylogError::InvalidInput("amount must be positive".into()));
        }
        Ok(())
    }
}
