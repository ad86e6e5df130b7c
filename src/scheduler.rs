//! Daily digest scheduler.
//!
//! Waits until the next configured wall-clock time, runs one pass, then runs
//! a pass every tick interval until cancelled. Each pass is
//! load → evaluate → send → persist.
//!
//! The first fire is aligned to local time once; later ticks come from a
//! fixed-period timer and are not re-synchronized to the wall clock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channels::Notifier;
use crate::config::DigestConfig;
use crate::error::Result;
use crate::plans::{DigestTemplate, PlanStore, build_digest};

/// What a single pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Nothing to address; no message sent, nothing persisted.
    Skipped,
    /// A digest was sent (or attempted) and the plan set rewritten.
    Sent { due: usize, total: usize },
}

/// Time from `now` until the next occurrence of `fire_at` in `now`'s zone.
///
/// If `now` is exactly at `fire_at` the next fire is tomorrow's.
pub fn next_fire_delay<Tz: TimeZone>(now: &DateTime<Tz>, fire_at: NaiveTime) -> Duration {
    let tz = now.timezone();
    let today = now.date_naive();
    let offset = fire_at.signed_duration_since(NaiveTime::MIN);
    let midnight = |date: NaiveDate| tz.from_local_datetime(&date.and_time(NaiveTime::MIN)).earliest();

    let Some(today_midnight) = midnight(today) else {
        // Midnight skipped by a DST jump; fall back to wall-clock arithmetic.
        return naive_fire_delay(now.naive_local(), fire_at);
    };

    let base = if now.clone().signed_duration_since(today_midnight.clone()) < offset {
        today_midnight
    } else {
        match today.succ_opt().and_then(midnight) {
            Some(tomorrow) => tomorrow,
            None => return naive_fire_delay(now.naive_local(), fire_at),
        }
    };

    let next = base + offset;
    next.signed_duration_since(now.clone())
        .to_std()
        .unwrap_or(Duration::ZERO)
}

fn naive_fire_delay(now: NaiveDateTime, fire_at: NaiveTime) -> Duration {
    let today = now.date();
    let mut next = today.and_time(fire_at);
    if next <= now {
        next = today.succ_opt().unwrap_or(today).and_time(fire_at);
    }
    next.signed_duration_since(now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Runs the daily digest pass on schedule.
pub struct DailyScheduler {
    store: Arc<dyn PlanStore>,
    notifier: Arc<dyn Notifier>,
    template: DigestTemplate,
    fire_at: NaiveTime,
    tick_interval: Duration,
    /// Single-writer guard over the plan set.
    pass_lock: Mutex<()>,
}

impl DailyScheduler {
    pub fn new(
        config: &DigestConfig,
        store: Arc<dyn PlanStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let tick_interval = if config.tick_interval.is_zero() {
            let fallback = DigestConfig::default().tick_interval;
            warn!(
                fallback_secs = fallback.as_secs(),
                "Zero tick interval, using the default"
            );
            fallback
        } else {
            config.tick_interval
        };

        Self {
            store,
            notifier,
            template: config.template.clone(),
            fire_at: config.fire_at,
            tick_interval,
            pass_lock: Mutex::new(()),
        }
    }

    /// Run one full pass for `today`.
    ///
    /// A load failure is returned and nothing is sent. Send and save failures
    /// are logged and otherwise ignored; the plan set is saved even if the
    /// send failed.
    pub async fn run_pass(&self, today: NaiveDate) -> Result<PassOutcome> {
        let _guard = self.pass_lock.lock().await;

        let plans = self.store.load_all().await?;
        let total = plans.len();

        let Some(digest) = build_digest(plans, today, &self.template) else {
            info!(total, "No channel to address, skipping digest");
            return Ok(PassOutcome::Skipped);
        };

        if let Err(e) = self
            .notifier
            .send_text(digest.channel_id, &digest.message)
            .await
        {
            error!(channel_id = digest.channel_id, "Failed to send digest: {e}");
        }

        if let Err(e) = self.store.save_all(&digest.plans).await {
            error!("Failed to save plans: {e}");
        }

        info!(
            channel_id = digest.channel_id,
            due = digest.due_count,
            total,
            %today,
            "Digest pass complete"
        );
        Ok(PassOutcome::Sent {
            due: digest.due_count,
            total,
        })
    }

    /// Run until `cancel` fires, first pass at the next local `fire_at`.
    pub async fn run(&self, cancel: &CancellationToken) -> usize {
        let delay = next_fire_delay(&Local::now(), self.fire_at);
        info!(
            fire_at = %self.fire_at,
            delay_secs = delay.as_secs(),
            "Daily scheduler waiting for first fire"
        );
        self.run_after(delay, cancel).await
    }

    /// Run until `cancel` fires, first pass after `first_delay`, then one
    /// pass per tick interval. Returns the number of passes attempted.
    pub async fn run_after(&self, first_delay: Duration, cancel: &CancellationToken) -> usize {
        let mut ticker = tokio::time::interval_at(Instant::now() + first_delay, self.tick_interval);
        let mut passes = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(passes, "Daily scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    passes += 1;
                    let today = Local::now().date_naive();
                    debug!(pass = passes, %today, "Daily scheduler fired");
                    if let Err(e) = self.run_pass(today).await {
                        error!("Digest pass failed, retrying next tick: {e}");
                    }
                }
            }
        }

        passes
    }
}

/// Spawn the scheduler loop as a background task.
pub fn spawn_daily_scheduler(
    scheduler: Arc<DailyScheduler>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        scheduler.run(&cancel).await;
    })
}
