//! Tab Lifecycle Gateway for TabSnooze.
//!
//! Decides what happens when a delayed tab's wake moment arrives: reopen it,
//! then either roll a recurring record forward to its next occurrence or
//! delete the record.
//!
//! Every wake reopens the tab and then shows a "Tab Awakened!" notification.
//!
//! Ordering: the record is claimed first (advanced or deleted in one locked
//! store update), timers are adjusted second, and the tab is reopened last.
//! A crash after the claim loses at most that one reopen; it can never make
//! the same occurrence reopen twice, because a second trigger finds the
//! record already advanced or gone.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::delayed_tab_store::DelayedTabStore;
use super::wake_scheduler::SchedulerConfig;
use crate::host::{TabHost, TimerHost};
use crate::types::delayed_tab::{DelayedTab, WakeNotification};
use crate::types::errors::StoreError;

/// A timer that fires this much before its record's wake time is still honoured.
pub const EARLY_FIRE_TOLERANCE_MS: i64 = 60 * 1000;

/// What a wake moment does to a record.
#[derive(Debug, Clone, PartialEq)]
pub enum WakePlan {
    /// Keep the record (same id) with the contained, advanced wake time.
    Reschedule(DelayedTab),
    /// Delete the record.
    Remove,
}

/// Result of handling one wake trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum WakeOutcome {
    /// The tab was handled and its series continues at `next_wake`.
    Rescheduled { next_wake: i64 },
    /// The tab was handled and its record deleted.
    Removed,
    /// No record with that id exists (already handled, removed, or never existed).
    Stale,
    /// The record is not due yet; its timer was re-armed instead.
    NotDue { wake_time: i64 },
}

/// Shared "wake moment" step used by timer fires and startup reconciliation.
pub struct TabLifecycleGateway {
    store: Arc<DelayedTabStore>,
    tabs: Arc<dyn TabHost>,
    timers: Arc<dyn TimerHost>,
    config: SchedulerConfig,
}

impl TabLifecycleGateway {
    pub fn new(
        store: Arc<DelayedTabStore>,
        tabs: Arc<dyn TabHost>,
        timers: Arc<dyn TimerHost>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            tabs,
            timers,
            config,
        }
    }

    /// Decides the fate of `tab` at `now_ms` without touching any collaborator.
    ///
    /// Recurring records whose pattern still yields an occurrence are
    /// rescheduled in place; everything else (one-shot, ended series, invalid
    /// pattern) is removed.
    pub fn plan(&self, tab: &DelayedTab, now_ms: i64) -> WakePlan {
        let Some(pattern) = tab.active_pattern() else {
            return WakePlan::Remove;
        };
        match self.config.wall_clock.next_occurrence(pattern, now_ms) {
            Some(next_wake) => {
                let mut next = tab.clone();
                next.wake_time = next_wake;
                WakePlan::Reschedule(next)
            }
            None => {
                debug!(id = %tab.id, "recurrence ended or invalid; removing");
                WakePlan::Remove
            }
        }
    }

    /// Handles a wake trigger for record `id` at `now_ms`.
    ///
    /// Only store failures are returned; tab and timer failures are logged.
    pub async fn wake(&self, id: &str, now_ms: i64) -> Result<WakeOutcome, StoreError> {
        let claimed = self
            .store
            .update(|tabs| {
                let pos = tabs.iter().position(|t| t.id == id)?;
                if tabs[pos].wake_time > now_ms.saturating_add(EARLY_FIRE_TOLERANCE_MS) {
                    return Some(Err(tabs[pos].wake_time));
                }
                let tab = tabs[pos].clone();
                let plan = self.plan(&tab, now_ms);
                match &plan {
                    WakePlan::Reschedule(next) => tabs[pos] = next.clone(),
                    WakePlan::Remove => {
                        tabs.remove(pos);
                    }
                }
                Some(Ok((tab, plan)))
            })
            .await?;

        match claimed {
            None => {
                debug!(id = %id, "wake for unknown delayed tab ignored");
                Ok(WakeOutcome::Stale)
            }
            Some(Err(wake_time)) => {
                debug!(id = %id, wake_time, "early wake; re-arming timer");
                self.arm(id, wake_time).await;
                Ok(WakeOutcome::NotDue { wake_time })
            }
            Some(Ok((tab, plan))) => Ok(self.complete(&tab, &plan).await),
        }
    }

    /// Applies the side effects of an already-persisted plan: timer first, then
    /// the reopen. Failures are logged and do not stop the other effect.
    pub async fn complete(&self, tab: &DelayedTab, plan: &WakePlan) -> WakeOutcome {
        let outcome = match plan {
            WakePlan::Reschedule(next) => {
                self.arm(&next.id, next.wake_time).await;
                WakeOutcome::Rescheduled {
                    next_wake: next.wake_time,
                }
            }
            WakePlan::Remove => {
                self.disarm(&tab.id).await;
                WakeOutcome::Removed
            }
        };
        self.awaken(tab).await;
        info!(id = %tab.id, outcome = ?outcome, "delayed tab woke");
        outcome
    }

    /// Reopens the tab and, once it is open, announces it with a notification.
    pub async fn awaken(&self, tab: &DelayedTab) {
        if !self.reopen(tab).await {
            return;
        }
        let notification = WakeNotification::for_tab(tab);
        if let Err(e) = self.tabs.notify(&notification).await {
            warn!(id = %tab.id, error = %e, "failed to show wake notification");
        }
    }

    /// Opens the tab's URL, if it has one. Best effort; returns whether a tab
    /// was opened.
    pub async fn reopen(&self, tab: &DelayedTab) -> bool {
        let Some(url) = tab.url.as_deref().filter(|u| !u.is_empty()) else {
            debug!(id = %tab.id, "delayed tab has no url; nothing to reopen");
            return false;
        };
        match self.tabs.open_tab(url).await {
            Ok(_) => true,
            Err(e) => {
                warn!(id = %tab.id, url = %url, error = %e, "failed to reopen delayed tab");
                false
            }
        }
    }

    /// Registers (or replaces) the timer for `id`. Best effort.
    pub async fn arm(&self, id: &str, when_ms: i64) {
        let name = self.config.timer_name(id);
        if let Err(e) = self.timers.register(&name, when_ms).await {
            warn!(id = %id, error = %e, "failed to register wake timer");
        }
    }

    /// Cancels the timer for `id`, if any. Best effort.
    pub async fn disarm(&self, id: &str) {
        let name = self.config.timer_name(id);
        if let Err(e) = self.timers.cancel(&name).await {
            warn!(id = %id, error = %e, "failed to cancel wake timer");
        }
    }
}
