use serde::{Serialize, Deserialize};
use rust_decimal::Decimal;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

/// Service name -> monthly rate. BTreeMap so serialized snapshots compare
/// deterministically between sweeps.
pub type ServiceMap = BTreeMap<String, Decimal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Terminated,
}
impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Terminated => "terminated",
        }
    }
    pub fn parse(s: &str) -> Self {
        match s {
            "terminated" => Self::Terminated,
            _ => Self::Active,
        }
    }
}

/// One time-boxed pricing stage. `duration_months` counts from the end of
/// all prior tiers; tiers are immutable once the contract is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierDefinition {
    pub duration_months: i64,
    pub services: ServiceMap,
}

impl TierDefinition {
    pub fn total_amount(&self) -> Decimal {
        self.services.values().sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub client_id: i64,
    pub client_name: String,
    pub email: Option<String>,
    pub status: ClientStatus,
    pub created_at: NaiveDateTime,           // onboarding anchor for tier elapsed time
    pub next_payment_date: Option<NaiveDate>,
    pub tiered_payments: Vec<TierDefinition>, // applied in order from onboarding
    pub final_services: ServiceMap,           // flat rate once every tier has elapsed
    pub current_services: ServiceMap,         // written by the tier sweep only
    pub current_rate: Decimal,
}
