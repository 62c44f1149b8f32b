use serde::{Serialize, Deserialize};
use rust_decimal::Decimal;
use chrono::NaiveDate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: i64,
    pub client_id: i64,
    pub amount: Decimal,
    pub description: Option<String>,
    pub paid_at: NaiveDate,
}
