use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Timelike};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use cakeday_core::config::ScheduleConfig;
use cakeday_core::Clock;
use cakeday_content::{CelebrantProfile, CelebrationContext, ContentPipeline};
use cakeday_store::{AnniversaryRecord, BirthdayStore, DetectionPath, EngineState, Ledger};

use crate::consolidator::consolidate;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::resolver::{resolve, CheckMode};
use crate::transport::Transport;
use crate::types::CelebrationBatch;

/// Drives the three tick paths and serializes them through one pass lock.
///
/// The engine owns no announcement state of its own: everything it needs to
/// decide "already celebrated?" lives in the [`Ledger`], so a restart (or a
/// second racing driver) converges on the same answer.
pub struct CelebrationEngine {
    store: Arc<BirthdayStore>,
    ledger: Arc<Ledger>,
    state: Arc<EngineState>,
    transport: Arc<dyn Transport>,
    pipeline: Arc<ContentPipeline>,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    config: ScheduleConfig,
    /// Serializes resolve→consolidate→dispatch across all drivers.
    pass_lock: tokio::sync::Mutex<()>,
}

impl CelebrationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<BirthdayStore>,
        ledger: Arc<Ledger>,
        state: Arc<EngineState>,
        transport: Arc<dyn Transport>,
        pipeline: Arc<ContentPipeline>,
        clock: Arc<dyn Clock>,
        config: ScheduleConfig,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            Arc::clone(&transport),
            Arc::clone(&ledger),
            config.on_ledger_write_failure,
            Duration::from_secs(config.request_timeout_secs),
        );
        Self {
            store,
            ledger,
            state,
            transport,
            pipeline,
            dispatcher,
            clock,
            config,
            pass_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Main loop. Runs the startup recovery pass, then polls every minute,
    /// firing the hourly sweep on each new (date, hour) and the daily
    /// safety net once per date after `daily_check_hour` UTC.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!("celebration engine started");

        // Recovery is interruptible: dropping the pass mid-flight is safe
        // because ledger commits happen per fully-dispatched batch.
        tokio::select! {
            result = self.startup_recovery() => {
                if let Err(e) = result {
                    error!("startup recovery failed: {e}");
                }
            }
            _ = shutdown.changed() => {
                info!("celebration engine shutting down during recovery");
                return;
            }
        }

        let mut interval = tokio::time::interval(Duration::from_secs(60));
        let mut last_hourly: Option<(NaiveDate, u32)> = None;
        let mut last_daily: Option<NaiveDate> = None;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = self.clock.now();
                    let hour_slot = (now.date_naive(), now.hour());
                    if last_hourly != Some(hour_slot) {
                        last_hourly = Some(hour_slot);
                        if let Err(e) = self.run_pass(CheckMode::Hourly).await {
                            error!("hourly pass error: {e}");
                        }
                    }
                    if now.hour() >= self.config.daily_check_hour
                        && last_daily != Some(now.date_naive())
                    {
                        last_daily = Some(now.date_naive());
                        if let Err(e) = self.run_pass(CheckMode::Daily).await {
                            error!("daily pass error: {e}");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("celebration engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One-shot catch-up for celebrations missed while the process was
    /// down. Bounded by `max_lookback_days`; with no recorded last tick
    /// only today is considered.
    pub async fn startup_recovery(&self) -> Result<usize> {
        let since = self.state.last_tick()?.unwrap_or_else(|| self.clock.now());
        info!(since = %since, "running startup recovery pass");
        self.run_pass(CheckMode::Recovery { since }).await
    }

    /// One serialized pass: resolve → consolidate → render → dispatch per
    /// due date. Returns the number of celebrants dispatched. A failed
    /// batch is logged and skipped — the next tick re-resolves it.
    pub async fn run_pass(&self, mode: CheckMode) -> Result<usize> {
        let _guard = self.pass_lock.lock().await;
        let now = self.clock.now();

        let records = self.store.list_active()?;
        if records.is_empty() {
            debug!("no active records, pass is a no-op");
            self.touch_last_tick(now);
            return Ok(0);
        }

        let due = resolve(now, &records, mode, &self.config);
        if due.is_empty() {
            debug!(?mode, "nobody due this tick");
            self.touch_last_tick(now);
            return Ok(0);
        }

        // Members who left the celebration channel have opted out. If the
        // roster cannot be fetched the pass is skipped rather than risking
        // a celebration for someone who opted out; the next tick retries.
        let members: HashSet<String> = match self.transport.channel_members().await {
            Ok(m) => m.into_iter().collect(),
            Err(e) => {
                warn!(error = %e, "cannot fetch channel members, skipping pass");
                return Ok(0);
            }
        };

        let by_id: HashMap<&str, &AnniversaryRecord> =
            records.iter().map(|r| (r.user_id.as_str(), r)).collect();
        let path = match mode {
            CheckMode::Hourly => DetectionPath::Hourly,
            CheckMode::Daily => DetectionPath::Daily,
            CheckMode::Recovery { .. } => DetectionPath::Recovery,
        };

        let mut dispatched = 0;
        let mut any_failed = false;
        for (date, users) in due {
            let users: Vec<String> = users
                .into_iter()
                .filter(|u| {
                    let member = members.contains(u);
                    if !member {
                        info!(user_id = %u, "not in celebration channel (opted out), skipping");
                    }
                    member
                })
                .collect();

            let Some(batch_users) = consolidate(&users, &self.ledger, date)? else {
                continue;
            };

            let celebrants = self.build_celebrants(&batch_users, date, &by_id).await;
            if celebrants.is_empty() {
                debug!(date = %date, "all due members are bots or deactivated");
                continue;
            }

            let batch = CelebrationBatch {
                date,
                celebrants,
                path,
            };
            let ctx = CelebrationContext {
                date,
                celebrants: batch.celebrants.clone(),
                date_facts: None,
            };
            let rendered = self.pipeline.render(&ctx).await;

            match self.dispatcher.dispatch(&batch, &rendered).await {
                Ok(_) => dispatched += batch.celebrants.len(),
                Err(e) => {
                    // No ledger write happened, so these members stay due.
                    any_failed = true;
                    warn!(date = %date, error = %e, "batch not dispatched");
                }
            }
        }

        // A failed batch may be for a past date only recovery can reach, so
        // last_tick must not move past it: the next startup recovery has to
        // re-resolve the same window.
        if !any_failed {
            self.touch_last_tick(now);
        }
        Ok(dispatched)
    }

    /// Resolve profiles for a batch, dropping bots and deactivated users.
    /// A profile lookup failure degrades to a bare mention rather than
    /// holding the celebration hostage to the users API.
    async fn build_celebrants(
        &self,
        user_ids: &[String],
        date: NaiveDate,
        records: &HashMap<&str, &AnniversaryRecord>,
    ) -> Vec<CelebrantProfile> {
        let mut celebrants = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            let profile = match self.transport.profile(user_id).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(%user_id, error = %e, "profile lookup failed, using bare mention");
                    celebrants.push(CelebrantProfile::bare(user_id));
                    continue;
                }
            };
            if profile.is_bot || profile.deleted {
                info!(%user_id, "skipping bot or deactivated user");
                continue;
            }
            let record = records.get(user_id.as_str());
            celebrants.push(CelebrantProfile {
                user_id: user_id.clone(),
                display_name: profile.display_name.unwrap_or_else(|| user_id.clone()),
                title: profile.title,
                age: record.and_then(|r| r.anniversary.age_on(date.year())),
                timezone: profile
                    .timezone
                    .or_else(|| record.map(|r| r.timezone.clone()))
                    .unwrap_or_default(),
                photo_url: profile.photo_url,
            });
        }
        celebrants
    }

    fn touch_last_tick(&self, now: chrono::DateTime<chrono::Utc>) {
        if let Err(e) = self.state.set_last_tick(now) {
            warn!(error = %e, "failed to persist last tick");
        }
    }
}
