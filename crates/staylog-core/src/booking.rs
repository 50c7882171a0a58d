use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::StaylogError;

/// Where a booking came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingChannel {
    Direct,
    Airbnb,
    BookingCom,
    Other,
}

impl BookingChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingChannel::Direct => "direct",
            BookingChannel::Airbnb => "airbnb",
            BookingChannel::BookingCom => "booking_com",
            BookingChannel::Other => "other",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(BookingChannel::Direct),
            "airbnb" => Some(BookingChannel::Airbnb),
            "booking_com" => Some(BookingChannel::BookingCom),
            "other" => Some(BookingChannel::Other),
            _ => None,
        }
    }
}

impl fmt::Display for BookingChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub property_id: String,
    pub guest_name: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default)]
    pub guests: Option<u32>,
    pub amount: f64,
    pub channel: BookingChannel,
    #[serde(default)]
    pub attachment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBooking {
    pub property_id: String,
    pub guest_name: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default)]
    pub guests: Option<u32>,
    pub amount: f64,
    pub channel: BookingChannel,
    #[serde(default)]
    pub attachment_id: Option<String>,
}

impl CreateBooking {
    pub fn validate(&self) -> Result<(), StaylogError> {
        if self.guest_name.trim().is_empty() {
            return Err(StaylogError::InvalidInput("guest name is required".into()));
        }
        if self.check_out <= self.check_in {
            return Err(StaylogError::InvalidInput(
                "check-out must be after check-in".into(),
            ));
        }
        if self.amount < 0.0 {
            return Err(StaylogError::InvalidInput("amount cannot be negative".into()));
        }
        Ok(())
    }
}
