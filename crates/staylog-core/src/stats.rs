//! Monthly statistics as served by the backend, plus the handful of
//! derivations the dashboard cards need.
//!
//! Sums and percentages are aggregated server-side. Nothing here divides
//! by a backend-supplied total without checking it first.

use serde::{Deserialize, Serialize};

use crate::expense::ExpenseCategory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyAmount {
    pub property_id: String,
    #[serde(default)]
    pub property_name: String,
    pub amount: f64,
    /// Share of the section total, 0-100, as computed by the backend.
    #[serde(default)]
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAmount {
    pub category: ExpenseCategory,
    pub amount: f64,
    #[serde(default)]
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EarningsBreakdown {
    pub total_amount: f64,
    #[serde(default)]
    pub by_property: Vec<PropertyAmount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpensesBreakdown {
    pub total_amount: f64,
    #[serde(default)]
    pub by_property: Vec<PropertyAmount>,
    #[serde(default)]
    pub by_category: Vec<CategoryAmount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStats {
    pub month: u32,
    pub year: i32,
    #[serde(default)]
    pub earnings: EarningsBreakdown,
    #[serde(default)]
    pub expenses: ExpensesBreakdown,
    #[serde(default)]
    pub booking_count: u32,
}

/// Net result for one property over the month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyNet {
    pub property_id: String,
    pub property_name: String,
    pub earnings: f64,
    pub expenses: f64,
    pub net: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub month: u32,
    pub year: i32,
    pub total_earnings: f64,
    pub total_expenses: f64,
    pub net_profit: f64,
    pub properties: Vec<PropertyNet>,
}

impl MonthlyStats {
    pub fn net_profit(&self) -> f64 {
        self.earnings.total_amount - self.expenses.total_amount
    }

    /// Per-property net, in the order properties first appear (earnings
    /// side first). A property present on only one side counts 0 on the other.
    pub fn property_nets(&self) -> Vec<PropertyNet> {
        let mut nets: Vec<PropertyNet> = Vec::new();
        for e in &self.earnings.by_property {
            match nets.iter_mut().find(|n| n.property_id == e.property_id) {
                Some(n) => n.earnings += e.amount,
                None => nets.push(PropertyNet {
                    property_id: e.property_id.clone(),
                    property_name: e.property_name.clone(),
                    earnings: e.amount,
                    expenses: 0.0,
                    net: 0.0,
                }),
            }
        }
        for x in &self.expenses.by_property {
            match nets.iter_mut().find(|n| n.property_id == x.property_id) {
                Some(n) => {
                    n.expenses += x.amount;
                    if n.property_name.is_empty() {
                        n.property_name = x.property_name.clone();
                    }
                }
                None => nets.push(PropertyNet {
                    property_id: x.property_id.clone(),
                    property_name: x.property_name.clone(),
                    earnings: 0.0,
                    expenses: x.amount,
                    net: 0.0,
                }),
            }
        }
        for n in &mut nets {
            n.net = n.earnings - n.expenses;
        }
        nets
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            month: self.month,
            year: self.year,
            total_earnings: self.earnings.total_amount,
            total_expenses: self.expenses.total_amount,
            net_profit: self.net_profit(),
            properties: self.property_nets(),
        }
    }
}

/// `part` as a percentage of `total`. Returns 0 for a zero (or non-finite) total.
pub fn share_percent(part: f64, total: f64) -> f64 {
    if total == 0.0 || !total.is_finite() {
        return 0.0;
    }
    part / total * 100.0
}
