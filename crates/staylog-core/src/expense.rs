use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::StaylogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Utilities,
    Maintenance,
    Supplies,
    Cleaning,
    Salary,
    Commission,
    Tax,
    Other,
}

impl ExpenseCategory {
    pub const ALL: &[ExpenseCategory] = &[
        ExpenseCategory::Utilities,
        ExpenseCategory::Maintenance,
        ExpenseCategory::Supplies,
        ExpenseCategory::Cleaning,
        ExpenseCategory::Salary,
        ExpenseCategory::Commission,
        ExpenseCategory::Tax,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Utilities => "utilities",
            ExpenseCategory::Maintenance => "maintenance",
            ExpenseCategory::Supplies => "supplies",
            ExpenseCategory::Cleaning => "cleaning",
            ExpenseCategory::Salary => "salary",
            ExpenseCategory::Commission => "commission",
            ExpenseCategory::Tax => "tax",
            ExpenseCategory::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ExpenseCategory::Utilities => "Utilities",
            ExpenseCategory::Maintenance => "Maintenance",
            ExpenseCategory::Supplies => "Supplies",
            ExpenseCategory::Cleaning => "Cleaning",
            ExpenseCategory::Salary => "Salary",
            ExpenseCategory::Commission => "Commission",
            ExpenseCategory::Tax => "Tax",
            ExpenseCategory::Other => "Other",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "utilities" => Some(ExpenseCategory::Utilities),
            "maintenance" => Some(ExpenseCategory::Maintenance),
            "supplies" => Some(ExpenseCategory::Supplies),
            "cleaning" => Some(ExpenseCategory::Cleaning),
            "salary" => Some(ExpenseCategory::Salary),
            "commission" => Some(ExpenseCategory::Commission),
            "tax" => Some(ExpenseCategory::Tax),
            "other" => Some(ExpenseCategory::Other),
            _ => None,
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub property_id: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attachment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExpense {
    pub property_id: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attachment_id: Option<String>,
}

impl CreateExpense {
    pub fn validate(&self) -> Result<(), StaylogError> {
        if self.amount <= 0.0 {
            return Err(StaylogError::InvalidInput("amount must be positive".into()));
        }
        Ok(())
    }
}
