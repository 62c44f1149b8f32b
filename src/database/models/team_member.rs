use serde::{Serialize, Deserialize};
use rust_decimal::Decimal;
use chrono::NaiveDate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub member_id: i64,
    pub member_name: String,
    pub role: Option<String>,       // designer/editor/account manager
    pub monthly_salary: Decimal,
    pub joined_at: NaiveDate,
}
