//! Dashboard aggregation: period sums, profit margin and projected MRR.
//!
//! Everything here is a read; nothing writes back to the store, so the
//! dashboard can call these concurrently with the tier sweep.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Pool, Sqlite};

use crate::billing::tier::resolve_tier;
use crate::database::db::queries;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub revenue: Decimal,
    pub expenses: Decimal,
    /// Percentage; forced to 0 when there is no revenue in the window.
    pub profit_margin: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MrrProjection {
    pub projected_mrr: Decimal,
    pub clients_counted: usize,
    /// Clients whose tier state could not be loaded or resolved. Their
    /// contribution is dropped instead of failing the whole projection.
    pub clients_skipped: usize,
}

/// Sum payments against expenses + salary payouts over `[start, end]`,
/// both boundaries inclusive. A store failure propagates to the caller;
/// the dashboard renders a failure state rather than a silent zero.
pub async fn aggregate(
    pool: &Pool<Sqlite>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PeriodSummary, AppError> {
    let revenue: Decimal = queries::payments_between(pool, start, end)
        .await?
        .iter()
        .map(|p| p.amount)
        .sum();
    let expense_total: Decimal = queries::expenses_between(pool, start, end)
        .await?
        .iter()
        .map(|e| e.amount)
        .sum();
    let salary_total: Decimal = queries::salaries_between(pool, start, end)
        .await?
        .iter()
        .map(|s| s.amount)
        .sum();

    let expenses = expense_total + salary_total;
    let profit_margin = if revenue.is_zero() {
        Decimal::ZERO
    } else {
        (revenue - expenses) / revenue * Decimal::from(100)
    };

    Ok(PeriodSummary {
        revenue,
        expenses,
        profit_margin,
    })
}

/// Forward-looking monthly recurring revenue: the sum of every active
/// client's currently resolved tier total, evaluated at `now`. Derived on
/// every call, never stored.
pub async fn projected_mrr(
    pool: &Pool<Sqlite>,
    now: NaiveDateTime,
) -> Result<MrrProjection, AppError> {
    let client_ids = queries::get_active_client_ids(pool).await?;

    let mut projected_mrr = Decimal::ZERO;
    let mut clients_counted = 0;
    let mut clients_skipped = 0;

    for client_id in client_ids {
        let client = match queries::get_client_by_id(pool, client_id).await {
            Ok(Some(client)) => client,
            // terminated or deleted between the two queries
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(client_id, error = %err, "MRR projection skipping unreadable client");
                clients_skipped += 1;
                continue;
            }
        };
        match resolve_tier(
            client.created_at,
            now,
            &client.tiered_payments,
            &client.final_services,
        ) {
            Ok(resolution) => {
                projected_mrr += resolution.total_amount;
                clients_counted += 1;
            }
            Err(err) => {
                tracing::warn!(client_id, error = %err, "MRR projection skipping unresolvable client");
                clients_skipped += 1;
            }
        }
    }

    Ok(MrrProjection {
        projected_mrr,
        clients_counted,
        clients_skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::migrate;
    use crate::database::models::{ServiceMap, TierDefinition};
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::str::FromStr;

    async fn test_pool() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        pool
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    fn services(rates: &[(&str, i64)]) -> ServiceMap {
        rates
            .iter()
            .map(|(name, rate)| (name.to_string(), Decimal::from(*rate)))
            .collect()
    }

    async fn insert_client(pool: &Pool<Sqlite>, months_onboarded: i64, tiers: &[TierDefinition]) {
        let created_at = chrono::Utc::now().naive_utc() - Duration::days(months_onboarded * 30);
        queries::create_client(
            pool,
            "client",
            None,
            created_at,
            None,
            tiers,
            &services(&[("management", 1200)]),
            &ServiceMap::new(),
            Decimal::ZERO,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn zero_revenue_yields_zero_margin_not_a_division_error() {
        let pool = test_pool().await;
        queries::record_expense(&pool, Decimal::from(500), Some("ads"), None, day("2026-01-10"))
            .await
            .unwrap();

        let summary = aggregate(&pool, day("2026-01-01"), day("2026-01-31"))
            .await
            .unwrap();
        assert_eq!(summary.revenue, Decimal::ZERO);
        assert_eq!(summary.expenses, Decimal::from(500));
        assert_eq!(summary.profit_margin, Decimal::ZERO);
    }

    #[tokio::test]
    async fn window_boundaries_are_inclusive_and_salaries_count_as_expenses() {
        let pool = test_pool().await;
        insert_client(&pool, 0, &[]).await;

        // on both boundaries, inside, and one outside the window
        for (amount, date) in [(1000, "2026-01-01"), (500, "2026-01-15"), (250, "2026-01-31"), (999, "2026-02-01")] {
            queries::record_payment(&pool, 1, Decimal::from(amount), None, day(date))
                .await
                .unwrap();
        }
        queries::record_expense(&pool, Decimal::from(300), Some("tools"), None, day("2026-01-20"))
            .await
            .unwrap();
        let member_id = queries::create_team_member(&pool, "Dana", Some("editor"), Decimal::from(575), day("2025-06-01"))
            .await
            .unwrap();
        queries::record_salary(&pool, member_id, Decimal::from(575), None, day("2026-01-31"))
            .await
            .unwrap();

        let summary = aggregate(&pool, day("2026-01-01"), day("2026-01-31"))
            .await
            .unwrap();
        assert_eq!(summary.revenue, Decimal::from(1750));
        assert_eq!(summary.expenses, Decimal::from(875));
        assert_eq!(summary.profit_margin, Decimal::from(50));
    }

    #[tokio::test]
    async fn aggregate_is_idempotent_against_an_unchanged_store() {
        let pool = test_pool().await;
        insert_client(&pool, 0, &[]).await;
        queries::record_payment(&pool, 1, Decimal::from(800), None, day("2026-03-05"))
            .await
            .unwrap();
        queries::record_expense(&pool, Decimal::from(200), None, None, day("2026-03-06"))
            .await
            .unwrap();

        let first = aggregate(&pool, day("2026-03-01"), day("2026-03-31")).await.unwrap();
        let second = aggregate(&pool, day("2026-03-01"), day("2026-03-31")).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn mrr_sums_active_tiers_and_graduated_finals() {
        let pool = test_pool().await;
        // one month in: first tier (700) is active
        insert_client(
            &pool,
            1,
            &[TierDefinition {
                duration_months: 3,
                services: services(&[("reels", 700)]),
            }],
        )
        .await;
        // no tiers: graduated straight to the 1200 final rate
        insert_client(&pool, 5, &[]).await;

        let projection = projected_mrr(&pool, chrono::Utc::now().naive_utc())
            .await
            .unwrap();
        assert_eq!(projection.projected_mrr, Decimal::from(1900));
        assert_eq!(projection.clients_counted, 2);
        assert_eq!(projection.clients_skipped, 0);
    }

    #[tokio::test]
    async fn mrr_skips_broken_clients_instead_of_failing() {
        let pool = test_pool().await;
        insert_client(&pool, 5, &[]).await; // contributes the 1200 final rate

        // tier plan that fails validation at resolve time
        sqlx::query(
            "INSERT INTO clients (client_name, status, created_at, tiered_payments, final_services)
             VALUES ('broken', 'active', '2025-01-01 00:00:00', '[{\"duration_months\":-2,\"services\":{}}]', '{}')",
        )
        .execute(&pool)
        .await
        .unwrap();
        // tier plan that is not even JSON
        sqlx::query(
            "INSERT INTO clients (client_name, status, created_at, tiered_payments, final_services)
             VALUES ('mangled', 'active', '2025-01-01 00:00:00', 'not json', '{}')",
        )
        .execute(&pool)
        .await
        .unwrap();
        // terminated clients never contribute
        sqlx::query(
            "INSERT INTO clients (client_name, status, created_at, final_services)
             VALUES ('gone', 'terminated', '2025-01-01 00:00:00', '{\"ads\": 9999}')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let projection = projected_mrr(&pool, chrono::Utc::now().naive_utc())
            .await
            .unwrap();
        assert_eq!(projection.projected_mrr, Decimal::from(1200));
        assert_eq!(projection.clients_counted, 1);
        assert_eq!(projection.clients_skipped, 2);
    }
}
