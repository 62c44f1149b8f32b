use serde::{Serialize, Deserialize};
use rust_decimal::Decimal;
use chrono::NaiveDate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub expense_id: i64,
    pub amount: Decimal,
    pub category: Option<String>,   // ads/tools/office/other
    pub description: Option<String>,
    pub spent_at: NaiveDate,
}
