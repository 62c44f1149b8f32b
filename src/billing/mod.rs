pub mod tier;
pub mod revenue;

pub use tier::{resolve_tier, validate_tiers, TierResolution};
pub use revenue::{aggregate, projected_mrr, MrrProjection, PeriodSummary};
