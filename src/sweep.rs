//! Periodic tier-update sweep.
//!
//! Every client's billing snapshot is recomputed from scratch each pass
//! and written back only when it changed, so the sweep is idempotent and
//! needs no transition events. One pass runs at startup and then on a
//! fixed interval; if a pass is still in flight when the next tick fires,
//! the tick is skipped rather than queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tokio::task::JoinHandle;

use crate::billing::tier::resolve_tier;
use crate::database::db::queries;
use crate::error::AppError;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepSummary {
    pub updated: usize,
    pub unchanged: usize,
    /// Clients this pass could not resolve, with the reason. A skip never
    /// aborts the rest of the batch.
    pub skipped: Vec<(i64, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SweepOutcome {
    Completed(SweepSummary),
    AlreadyRunning,
}

pub struct TierSweeper {
    pool: Pool<Sqlite>,
    in_flight: AtomicBool,
}

impl TierSweeper {
    pub fn new(pool: Pool<Sqlite>) -> Arc<Self> {
        Arc::new(Self {
            pool,
            in_flight: AtomicBool::new(false),
        })
    }

    /// One pass over every active client. Returns immediately when a
    /// previous pass still holds the in-flight flag.
    pub async fn run_once(&self, now: NaiveDateTime) -> SweepOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("tier sweep already in flight, skipping this run");
            return SweepOutcome::AlreadyRunning;
        }

        let summary = self.sweep_all(now).await;
        self.in_flight.store(false, Ordering::Release);
        SweepOutcome::Completed(summary)
    }

    async fn sweep_all(&self, now: NaiveDateTime) -> SweepSummary {
        let mut summary = SweepSummary {
            updated: 0,
            unchanged: 0,
            skipped: Vec::new(),
        };

        let client_ids = match queries::get_active_client_ids(&self.pool).await {
            Ok(ids) => ids,
            Err(err) => {
                tracing::error!(error = %err, "tier sweep could not list clients");
                return summary;
            }
        };

        for client_id in client_ids {
            match self.sweep_client(client_id, now).await {
                Ok(true) => summary.updated += 1,
                Ok(false) => summary.unchanged += 1,
                Err(err) => {
                    tracing::warn!(client_id, error = %err, "tier sweep skipped client");
                    summary.skipped.push((client_id, err.to_string()));
                }
            }
        }

        tracing::info!(
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped.len(),
            "tier sweep finished"
        );
        summary
    }

    /// Recompute one client's snapshot and persist it when it differs from
    /// the stored one. Returns whether a write happened.
    async fn sweep_client(&self, client_id: i64, now: NaiveDateTime) -> Result<bool, AppError> {
        let client = queries::get_client_by_id(&self.pool, client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("client {}", client_id)))?;

        let resolved = resolve_tier(
            client.created_at,
            now,
            &client.tiered_payments,
            &client.final_services,
        )?;

        if resolved.services == client.current_services
            && resolved.total_amount == client.current_rate
        {
            return Ok(false);
        }

        tracing::info!(
            client_id,
            tier_index = ?resolved.tier_index,
            rate = %resolved.total_amount,
            "client crossed a tier boundary, updating billing snapshot"
        );
        queries::update_current_services(&self.pool, client_id, &resolved.services, resolved.total_amount)
            .await?;
        Ok(true)
    }
}

/// Background loop: one run right away, then one per interval. The caller
/// aborts the returned handle on shutdown.
pub fn spawn(sweeper: Arc<TierSweeper>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            // the first tick completes immediately, covering the startup run
            ticker.tick().await;
            let now = Utc::now().naive_utc();
            if let SweepOutcome::AlreadyRunning = sweeper.run_once(now).await {
                tracing::warn!("previous tier sweep still running, interval tick skipped");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::migrate;
    use crate::database::models::{ServiceMap, TierDefinition};
    use chrono::Duration as ChronoDuration;
    use rust_decimal::Decimal;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        pool
    }

    fn services(rates: &[(&str, i64)]) -> ServiceMap {
        rates
            .iter()
            .map(|(name, rate)| (name.to_string(), Decimal::from(*rate)))
            .collect()
    }

    async fn insert_healthy_client(pool: &Pool<Sqlite>, name: &str, months_onboarded: i64) -> i64 {
        let created_at = Utc::now().naive_utc() - ChronoDuration::days(months_onboarded * 30);
        let tiers = vec![TierDefinition {
            duration_months: 3,
            services: services(&[("reels", 500)]),
        }];
        // snapshot starts empty so the first sweep always writes
        queries::create_client(
            pool,
            name,
            None,
            created_at,
            None,
            &tiers,
            &services(&[("management", 1500)]),
            &ServiceMap::new(),
            Decimal::ZERO,
        )
        .await
        .unwrap()
    }

    fn expect_summary(outcome: SweepOutcome) -> SweepSummary {
        match outcome {
            SweepOutcome::Completed(summary) => summary,
            SweepOutcome::AlreadyRunning => panic!("sweep was skipped"),
        }
    }

    #[tokio::test]
    async fn overlapping_invocation_is_an_immediate_no_op() {
        let pool = test_pool().await;
        insert_healthy_client(&pool, "a", 1).await;
        let sweeper = TierSweeper::new(pool);

        // simulate a pass still in flight
        sweeper.in_flight.store(true, Ordering::Release);
        assert_eq!(
            sweeper.run_once(Utc::now().naive_utc()).await,
            SweepOutcome::AlreadyRunning
        );

        // once the flag clears, sweeping works again
        sweeper.in_flight.store(false, Ordering::Release);
        let summary = expect_summary(sweeper.run_once(Utc::now().naive_utc()).await);
        assert_eq!(summary.updated, 1);
    }

    #[tokio::test]
    async fn one_broken_client_does_not_stop_the_other_nine() {
        let pool = test_pool().await;
        for i in 0..9 {
            insert_healthy_client(&pool, &format!("client-{}", i), 1).await;
        }
        // invalid plan: negative duration fails validation at resolve time
        sqlx::query(
            "INSERT INTO clients (client_name, status, created_at, tiered_payments, final_services)
             VALUES ('broken', 'active', '2025-01-01 00:00:00', '[{\"duration_months\":-1,\"services\":{}}]', '{}')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let sweeper = TierSweeper::new(pool.clone());
        let summary = expect_summary(sweeper.run_once(Utc::now().naive_utc()).await);
        assert_eq!(summary.updated, 9);
        assert_eq!(summary.skipped.len(), 1);

        // every healthy client got its snapshot written
        for client in queries::get_all_clients(&pool).await.unwrap() {
            if client.client_name != "broken" {
                assert_eq!(client.current_rate, Decimal::from(500));
            }
        }
    }

    #[tokio::test]
    async fn second_sweep_writes_nothing_when_nothing_changed() {
        let pool = test_pool().await;
        insert_healthy_client(&pool, "steady", 1).await;
        insert_healthy_client(&pool, "also-steady", 2).await;
        let sweeper = TierSweeper::new(pool);

        let first = expect_summary(sweeper.run_once(Utc::now().naive_utc()).await);
        assert_eq!(first.updated, 2);

        let second = expect_summary(sweeper.run_once(Utc::now().naive_utc()).await);
        assert_eq!(second.updated, 0);
        assert_eq!(second.unchanged, 2);
        assert!(second.skipped.is_empty());
    }

    #[tokio::test]
    async fn graduation_switches_the_snapshot_to_final_services() {
        let pool = test_pool().await;
        // 4 months in on a 3-month plan: past every tier
        let id = insert_healthy_client(&pool, "graduate", 4).await;
        let sweeper = TierSweeper::new(pool.clone());

        expect_summary(sweeper.run_once(Utc::now().naive_utc()).await);

        let client = queries::get_client_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(client.current_rate, Decimal::from(1500));
        assert_eq!(client.current_services, services(&[("management", 1500)]));
    }
}
