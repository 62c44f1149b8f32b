//! Tier resolution: which pricing stage a client is currently in.
//!
//! A client's contract is an ordered list of tiers, each active for
//! `duration_months` counted from the end of the previous tier. Once every
//! tier has elapsed the client graduates to the flat `final_services` rate.
//! Resolution is a pure function of the onboarding time, the evaluation
//! time and the definitions; the periodic sweep persists the result.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::database::models::{ServiceMap, TierDefinition};
use crate::error::AppError;

/// Elapsed time uses a fixed 30-day month, not calendar months.
pub const DAYS_PER_MONTH: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierResolution {
    /// Index into the tier plan, or `None` once the client has graduated
    /// to the final flat rate.
    pub tier_index: Option<usize>,
    pub services: ServiceMap,
    pub total_amount: Decimal,
}

/// Whole months elapsed under the 30-day-month approximation, truncating:
/// 29 days is 0 full months, 30 days is 1.
///
/// Deliberately calendar-naive. Switching to real calendar arithmetic
/// would silently move existing clients across tier boundaries, so the
/// approximation is part of the contract.
pub fn months_elapsed(created_at: NaiveDateTime, evaluated_at: NaiveDateTime) -> i64 {
    let days = (evaluated_at - created_at).num_days();
    days.max(0) / DAYS_PER_MONTH
}

/// Rejects tier plans the resolver cannot price. A negative duration is an
/// authoring mistake and must never be silently treated as zero.
pub fn validate_tiers(tiers: &[TierDefinition]) -> Result<(), AppError> {
    for (index, tier) in tiers.iter().enumerate() {
        if tier.duration_months < 0 {
            return Err(AppError::Validation(format!(
                "tier {} has negative duration_months ({})",
                index, tier.duration_months
            )));
        }
    }
    Ok(())
}

/// Resolve the active tier for a client at `evaluated_at`.
///
/// Walks the plan in order keeping a cumulative duration; the first tier
/// where the months passed fall strictly below the running total is the
/// active one. The strict `<` means a zero-duration tier can never be
/// selected, even at zero elapsed months. When every tier has elapsed
/// (or the plan is empty) the result is the graduated state.
pub fn resolve_tier(
    created_at: NaiveDateTime,
    evaluated_at: NaiveDateTime,
    tiers: &[TierDefinition],
    final_services: &ServiceMap,
) -> Result<TierResolution, AppError> {
    validate_tiers(tiers)?;

    let months_passed = months_elapsed(created_at, evaluated_at);

    let mut cumulative = 0i64;
    for (index, tier) in tiers.iter().enumerate() {
        cumulative += tier.duration_months;
        if months_passed < cumulative {
            return Ok(TierResolution {
                tier_index: Some(index),
                services: tier.services.clone(),
                total_amount: tier.total_amount(),
            });
        }
    }

    Ok(TierResolution {
        tier_index: None,
        services: final_services.clone(),
        total_amount: final_services.values().sum(),
    })
}
