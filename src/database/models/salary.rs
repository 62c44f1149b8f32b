// salary payouts are append-only facts, one row per payout

use serde::{Serialize, Deserialize};
use rust_decimal::Decimal;
use chrono::NaiveDate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Salary {
    pub salary_id: i64,
    pub member_id: i64,
    pub amount: Decimal,
    pub description: Option<String>,
    pub paid_at: NaiveDate,
}
