//! Wake Scheduler for TabSnooze.
//!
//! Owns the lifecycle of a delayed tab: `Scheduled -> Fired -> {Rescheduled | Removed}`.
//! Bridges the [`DelayedTabStore`], the recurrence calculator and the timer
//! facility. Constructed once with its collaborators; [`WakeScheduler::start`]
//! reconciles missed wake-ups and then begins dispatching fired timers.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::delayed_tab_store::DelayedTabStore;
use super::tab_lifecycle::{TabLifecycleGateway, WakeOutcome, WakePlan};
use crate::host::{Clock, KeyValueStore, TabHandle, TabHost, TimerHost};
use crate::services::recurrence_calculator::WallClock;
use crate::types::delay::DelaySpec;
use crate::types::delayed_tab::{DelayedTab, TabSnapshot};
use crate::types::errors::{ScheduleError, StoreError};

/// Default prefix of timer names; the record id follows it.
pub const DEFAULT_TIMER_PREFIX: &str = "delayed-tab-";

/// Latest accepted wake time: 9999-12-31T23:59:59.999Z.
pub const MAX_WAKE_TIME: i64 = 253_402_300_799_999;

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub timer_prefix: String,
    /// Wall clock used for recurrence arithmetic.
    pub wall_clock: WallClock,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timer_prefix: DEFAULT_TIMER_PREFIX.to_string(),
            wall_clock: WallClock::Local,
        }
    }
}

impl SchedulerConfig {
    pub fn with_wall_clock(wall_clock: WallClock) -> Self {
        Self {
            wall_clock,
            ..Self::default()
        }
    }

    /// Timer name bound to record `id`.
    pub fn timer_name(&self, id: &str) -> String {
        format!("{}{}", self.timer_prefix, id)
    }

    /// Record id encoded in a timer name, if the name belongs to this scheduler.
    pub fn id_from_timer_name<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_prefix(self.timer_prefix.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Summary of a startup reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Records that were due and got handled.
    pub woken: usize,
    /// Of those, recurring records rolled forward.
    pub rescheduled: usize,
    /// Of those, records deleted.
    pub removed: usize,
    /// Timers registered for surviving records.
    pub rearmed: usize,
}

/// Orchestrates timers, the store and the lifecycle gateway.
pub struct WakeScheduler {
    store: Arc<DelayedTabStore>,
    gateway: TabLifecycleGateway,
    tabs: Arc<dyn TabHost>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl WakeScheduler {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        tabs: Arc<dyn TabHost>,
        timers: Arc<dyn TimerHost>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        let store = Arc::new(DelayedTabStore::new(kv));
        let gateway = TabLifecycleGateway::new(
            Arc::clone(&store),
            Arc::clone(&tabs),
            timers,
            config.clone(),
        );
        Self {
            store,
            gateway,
            tabs,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &Arc<DelayedTabStore> {
        &self.store
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Initial wake time of a delay request made at `now_ms`.
    ///
    /// Wake times before the epoch or after [`MAX_WAKE_TIME`] are rejected.
    pub fn initial_wake_time(&self, spec: &DelaySpec, now_ms: i64) -> Result<i64, ScheduleError> {
        let wake_time = match spec {
            DelaySpec::After { millis } if *millis < 0 => {
                return Err(ScheduleError::InvalidDelay(format!(
                    "negative offset: {} ms",
                    millis
                )))
            }
            DelaySpec::After { millis } => now_ms
                .checked_add(*millis)
                .ok_or_else(|| ScheduleError::InvalidDelay("offset overflows".to_string()))?,
            DelaySpec::At { wake_time } => *wake_time,
            DelaySpec::Recurring { pattern } => self
                .config
                .wall_clock
                .next_occurrence(pattern, now_ms)
                .ok_or(ScheduleError::NoOccurrence)?,
        };
        if !(0..=MAX_WAKE_TIME).contains(&wake_time) {
            return Err(ScheduleError::InvalidDelay(format!(
                "wake time out of range: {}",
                wake_time
            )));
        }
        Ok(wake_time)
    }

    /// Delays one tab. See [`WakeScheduler::schedule_all`].
    pub async fn schedule(
        &self,
        snapshot: TabSnapshot,
        spec: &DelaySpec,
    ) -> Result<DelayedTab, ScheduleError> {
        let mut created = self.schedule_all(vec![snapshot], spec).await?;
        created.pop().ok_or(ScheduleError::NoTabs)
    }

    /// Delays a batch of tabs to the same wake time.
    ///
    /// Records are persisted in one write, each gets its own timer, and the
    /// originating tabs are closed in one request. A failed close or timer
    /// registration is logged only: the records are already persisted, and
    /// startup reconciliation re-arms any timer that was lost.
    pub async fn schedule_all(
        &self,
        snapshots: Vec<TabSnapshot>,
        spec: &DelaySpec,
    ) -> Result<Vec<DelayedTab>, ScheduleError> {
        if snapshots.is_empty() {
            return Err(ScheduleError::NoTabs);
        }
        let now = self.clock.now_millis();
        let wake_time = self.initial_wake_time(spec, now)?;
        let pattern = match spec {
            DelaySpec::Recurring { pattern } => Some(pattern.clone()),
            _ => None,
        };

        let mut close_ids: Vec<TabHandle> = Vec::new();
        let records: Vec<DelayedTab> = snapshots
            .into_iter()
            .map(|snapshot| {
                close_ids.extend(snapshot.tab_id);
                DelayedTab {
                    id: Uuid::new_v4().to_string(),
                    url: snapshot.url,
                    title: snapshot.title,
                    favicon: snapshot.favicon,
                    created_at: now,
                    wake_time,
                    is_recurring: pattern.is_some(),
                    recurrence_pattern: pattern.clone(),
                }
            })
            .collect();

        let to_insert = records.clone();
        self.store
            .update(move |tabs| tabs.extend(to_insert))
            .await?;

        for record in &records {
            self.gateway.arm(&record.id, record.wake_time).await;
            info!(id = %record.id, wake_time = record.wake_time, recurring = record.is_recurring, "tab delayed");
        }

        if !close_ids.is_empty() {
            if let Err(e) = self.tabs.close_tabs(&close_ids).await {
                warn!(error = %e, tabs = ?close_ids, "failed to close delayed tabs");
            }
        }

        Ok(records)
    }

    /// Handles a fired timer for record `id`.
    pub async fn on_timer_fired(&self, id: &str) -> Result<WakeOutcome, StoreError> {
        let now = self.clock.now_millis();
        self.gateway.wake(id, now).await
    }

    /// Handles a fired timer by name. Names without this scheduler's prefix are ignored.
    pub async fn on_timer_name(&self, name: &str) -> Option<Result<WakeOutcome, StoreError>> {
        let id = self.config.id_from_timer_name(name)?;
        Some(self.on_timer_fired(id).await)
    }

    /// Catches up on wake-ups missed while the host was not running.
    ///
    /// Every record due at `now_ms` is claimed in a single store update
    /// (recurring ones advanced, the rest deleted), then the tabs are reopened
    /// one by one, and finally every surviving record gets its timer
    /// registered again since timers do not outlive the process.
    pub async fn reconcile_on_startup(&self, now_ms: i64) -> Result<ReconcileReport, StoreError> {
        let gateway = &self.gateway;
        let (claimed, survivors) = self
            .store
            .update(|tabs| {
                let mut claimed: Vec<(DelayedTab, WakePlan)> = Vec::new();
                let mut kept: Vec<DelayedTab> = Vec::with_capacity(tabs.len());
                for tab in std::mem::take(tabs) {
                    if tab.wake_time <= now_ms {
                        let plan = gateway.plan(&tab, now_ms);
                        if let WakePlan::Reschedule(next) = &plan {
                            kept.push(next.clone());
                        }
                        claimed.push((tab, plan));
                    } else {
                        kept.push(tab);
                    }
                }
                *tabs = kept;
                let survivors: Vec<(String, i64)> =
                    tabs.iter().map(|t| (t.id.clone(), t.wake_time)).collect();
                (claimed, survivors)
            })
            .await?;

        let mut report = ReconcileReport::default();
        for (tab, plan) in &claimed {
            report.woken += 1;
            match plan {
                WakePlan::Reschedule(_) => report.rescheduled += 1,
                WakePlan::Remove => {
                    report.removed += 1;
                    self.gateway.disarm(&tab.id).await;
                }
            }
            self.gateway.awaken(tab).await;
        }

        for (id, wake_time) in &survivors {
            self.gateway.arm(id, *wake_time).await;
            report.rearmed += 1;
        }

        info!(
            woken = report.woken,
            rescheduled = report.rescheduled,
            removed = report.removed,
            rearmed = report.rearmed,
            "startup reconciliation finished"
        );
        Ok(report)
    }

    /// Wakes the given records immediately and ends them.
    ///
    /// Recurring records are not rescheduled: a manual wake terminates the
    /// series. Returns the records that existed and were woken.
    pub async fn wake_now(&self, ids: &HashSet<String>) -> Result<Vec<DelayedTab>, StoreError> {
        let removed = self.store.remove_many(ids).await?;
        for id in ids {
            self.gateway.disarm(id).await;
        }
        for tab in &removed {
            self.gateway.reopen(tab).await;
        }
        info!(requested = ids.len(), woken = removed.len(), "woke delayed tabs on request");
        Ok(removed)
    }

    /// Deletes the given records without reopening them.
    pub async fn remove(&self, ids: &HashSet<String>) -> Result<Vec<DelayedTab>, StoreError> {
        let removed = self.store.remove_many(ids).await?;
        for id in ids {
            self.gateway.disarm(id).await;
        }
        info!(requested = ids.len(), removed = removed.len(), "removed delayed tabs");
        Ok(removed)
    }

    /// First-install hook: creates the empty collection unless one exists.
    pub async fn on_installed(&self) -> Result<bool, StoreError> {
        let created = self.store.initialize().await?;
        if created {
            info!("initialized empty delayed tab collection");
        }
        Ok(created)
    }

    /// Reconciles missed wake-ups, then dispatches every fired timer name
    /// received on `fired` until the channel closes.
    ///
    /// Each fire runs as its own task; the store's write lock orders them.
    pub fn start(self: &Arc<Self>, mut fired: mpsc::UnboundedReceiver<String>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let now = scheduler.clock.now_millis();
            if let Err(e) = scheduler.reconcile_on_startup(now).await {
                error!(error = %e, "startup reconciliation failed");
            }

            while let Some(name) = fired.recv().await {
                let Some(id) = scheduler.config.id_from_timer_name(&name).map(str::to_string) else {
                    debug!(timer = %name, "ignoring foreign timer");
                    continue;
                };
                let task_scheduler = Arc::clone(&scheduler);
                tokio::spawn(async move {
                    if let Err(e) = task_scheduler.on_timer_fired(&id).await {
                        warn!(id = %id, error = %e, "handling fired timer failed");
                    }
                });
            }
            debug!("timer channel closed; dispatch loop exiting");
        })
    }
}
