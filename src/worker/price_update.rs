use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{error, info, warn};

use crate::db::price_update_repository::PriceUpdateRepository;
use crate::models::price_update::{PersistOutcome, PriceUpdateStatus};
use crate::pricing::PriceMonitor;
use crate::utils::schedule::{monotonic_deadline, offset_to_utc, CompletenessPolicy, NextRun};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("price update persistence failed: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("price update cycle did not finish within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug)]
pub enum TickOutcome {
    /// A completed update already exists for today.
    Skipped,
    Finished(PersistOutcome),
    Aborted(SchedulerError),
}

#[derive(Debug)]
pub struct Tick {
    pub outcome: TickOutcome,
    pub next_run: NextRun,
}

/// Runs one price update per day and decides when the next one fires.
pub struct PriceUpdateScheduler {
    repo: Arc<dyn PriceUpdateRepository>,
    monitor: PriceMonitor,
    cycle_timeout: Duration,
    clock: fn() -> DateTime<Utc>,
}

impl PriceUpdateScheduler {
    pub fn new(
        repo: Arc<dyn PriceUpdateRepository>,
        monitor: PriceMonitor,
        cycle_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            monitor,
            cycle_timeout,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    fn policy(&self) -> CompletenessPolicy {
        CompletenessPolicy::new(self.monitor.routes().len(), self.monitor.window_days())
    }

    /// Update forever, one cycle at a time.
    pub async fn run(self) {
        loop {
            let tick = self.tick().await;
            let deadline = monotonic_deadline(tick.next_run.at, (self.clock)(), Instant::now());
            info!(
                next_run = %tick.next_run.at,
                reason = ?tick.next_run.reason,
                "next price update scheduled"
            );
            sleep_until(deadline).await;
        }
    }

    /// Update prices unless today's update is already in place.
    pub async fn tick(&self) -> Tick {
        let now = (self.clock)();
        match self.repo.latest_completed_update().await {
            Ok(Some(last)) if offset_to_utc(last.created_at).map(|at| at.date_naive())
                == Some(now.date_naive()) =>
            {
                info!(update_id = %last.id, "prices already updated today");
                Tick {
                    outcome: TickOutcome::Skipped,
                    next_run: NextRun::midnight_after(now),
                }
            }
            Ok(_) => self.update_prices().await,
            Err(err) => {
                error!(error = %err, "failed to load last price update");
                Tick {
                    outcome: TickOutcome::Aborted(err.into()),
                    next_run: NextRun::soon_after(now),
                }
            }
        }
    }

    /// One discovery cycle: create the run, do all network work, then persist.
    pub async fn update_prices(&self) -> Tick {
        let policy = self.policy();
        let update = match self.repo.create_price_update().await {
            Ok(update) => update,
            Err(err) => {
                error!(error = %err, "failed to create price update");
                return Tick {
                    outcome: TickOutcome::Aborted(err.into()),
                    next_run: NextRun::soon_after((self.clock)()),
                };
            }
        };

        let today = (self.clock)().date_naive();
        let report = match timeout(
            self.cycle_timeout,
            self.monitor.cheapest_confirmed_flights(today),
        )
        .await
        {
            Ok(report) => report,
            Err(_) => {
                warn!(update_id = %update.id, timeout = ?self.cycle_timeout, "price update timed out");
                self.mark_failed(update.id).await;
                return Tick {
                    outcome: TickOutcome::Aborted(SchedulerError::Timeout(self.cycle_timeout)),
                    next_run: NextRun::soon_after((self.clock)()),
                };
            }
        };

        info!(
            update_id = %update.id,
            flights = report.confirmed.len(),
            dropped = report.dropped.len(),
            "inserting flights"
        );
        match self
            .repo
            .finalize_price_update(update.id, &report.confirmed, policy)
            .await
        {
            Ok(outcome) => {
                let now = (self.clock)();
                if outcome.status == PriceUpdateStatus::Completed {
                    info!(
                        update_id = %update.id,
                        inserted = outcome.inserted,
                        "price update completed"
                    );
                } else {
                    warn!(
                        update_id = %update.id,
                        inserted = outcome.inserted,
                        expected = policy.expected,
                        threshold = policy.threshold(),
                        "price update incomplete"
                    );
                }
                Tick {
                    outcome: TickOutcome::Finished(outcome),
                    next_run: policy.next_run(outcome.inserted, now),
                }
            }
            Err(err) => {
                error!(update_id = %update.id, error = %err, "failed to persist price update");
                self.mark_failed(update.id).await;
                Tick {
                    outcome: TickOutcome::Aborted(err.into()),
                    next_run: NextRun::soon_after((self.clock)()),
                }
            }
        }
    }

    async fn mark_failed(&self, update_id: uuid::Uuid) {
        if let Err(err) = self
            .repo
            .set_price_update_status(update_id, PriceUpdateStatus::Failed)
            .await
        {
            error!(%update_id, error = %err, "failed to mark price update as failed");
        }
    }
}
