//! Unit tests for the wake scheduler and the tab lifecycle gateway.
//!
//! Every collaborator is in memory: a map-backed store, a tab host and a timer
//! host that record what they were asked to do, and a manual clock. Wall-clock
//! arithmetic runs in UTC.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use tabsnooze::host::bridge::{BridgeEvent, EventTabHost};
use tabsnooze::host::memory::{ManualClock, MemoryKvStore, RecordingTabHost, RecordingTimerHost};
use tabsnooze::host::timer::TokioTimerHost;
use tabsnooze::host::TimerHost;
use tabsnooze::managers::tab_lifecycle::WakeOutcome;
use tabsnooze::managers::wake_scheduler::{
    ReconcileReport, SchedulerConfig, WakeScheduler, MAX_WAKE_TIME,
};
use tabsnooze::services::recurrence_calculator::WallClock;
use tabsnooze::types::delay::DelaySpec;
use tabsnooze::types::delayed_tab::{DelayedTab, TabSnapshot, DEFAULT_NOTIFICATION_ICON};
use tabsnooze::types::errors::ScheduleError;
use tabsnooze::types::recurrence::RecurrencePattern;

const HOUR: i64 = 60 * 60 * 1000;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap().timestamp_millis()
}

struct Harness {
    kv: Arc<MemoryKvStore>,
    tabs: Arc<RecordingTabHost>,
    timers: Arc<RecordingTimerHost>,
    clock: Arc<ManualClock>,
    scheduler: WakeScheduler,
}

impl Harness {
    fn new(now: i64) -> Self {
        let kv = Arc::new(MemoryKvStore::new());
        let tabs = Arc::new(RecordingTabHost::new());
        let timers = Arc::new(RecordingTimerHost::new());
        let clock = Arc::new(ManualClock::new(now));
        let scheduler = WakeScheduler::new(
            kv.clone(),
            tabs.clone(),
            timers.clone(),
            clock.clone(),
            SchedulerConfig::with_wall_clock(WallClock::utc()),
        );
        Self {
            kv,
            tabs,
            timers,
            clock,
            scheduler,
        }
    }

    fn timer(&self, id: &str) -> Option<i64> {
        self.timers
            .pending()
            .get(&self.scheduler.config().timer_name(id))
            .copied()
    }

    async fn records(&self) -> Vec<DelayedTab> {
        self.scheduler.store().list().await.unwrap()
    }

    async fn insert(&self, tab: DelayedTab) {
        self.scheduler.store().upsert(tab).await.unwrap();
    }
}

fn snapshot(tab_id: i64, url: &str) -> TabSnapshot {
    TabSnapshot::new(tab_id, url, "Title")
}

fn one_shot(id: &str, url: &str, wake_time: i64) -> DelayedTab {
    DelayedTab {
        id: id.to_string(),
        url: Some(url.to_string()),
        title: Some("Title".to_string()),
        favicon: None,
        created_at: 0,
        wake_time,
        is_recurring: false,
        recurrence_pattern: None,
    }
}

fn recurring(id: &str, url: &str, wake_time: i64, pattern: RecurrencePattern) -> DelayedTab {
    DelayedTab {
        is_recurring: true,
        recurrence_pattern: Some(pattern),
        ..one_shot(id, url, wake_time)
    }
}

fn ids(values: &[&str]) -> HashSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// schedule
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_schedule_persists_arms_and_closes() {
    let now = at(2025, 1, 6, 10, 0);
    let h = Harness::new(now);

    let tab = h
        .scheduler
        .schedule(snapshot(7, "https://a.example"), &DelaySpec::after_hours(3))
        .await
        .unwrap();

    assert_eq!(tab.wake_time, now + 3 * HOUR);
    assert_eq!(tab.created_at, now);
    assert!(!tab.is_recurring);
    assert_eq!(h.records().await, vec![tab.clone()]);
    assert_eq!(h.timer(&tab.id), Some(tab.wake_time));
    assert_eq!(h.tabs.closed(), vec![7]);
    assert!(h.tabs.opened().is_empty());
}

#[tokio::test]
async fn test_schedule_at_absolute_time() {
    let h = Harness::new(at(2025, 1, 6, 10, 0));
    let wake = at(2025, 2, 1, 8, 0);
    let tab = h
        .scheduler
        .schedule(snapshot(1, "https://a.example"), &DelaySpec::At { wake_time: wake })
        .await
        .unwrap();
    assert_eq!(tab.wake_time, wake);
}

#[tokio::test]
async fn test_schedule_recurring_scenario_a() {
    // Daily 09:00 created Monday 10:00 first wakes Tuesday 09:00.
    let h = Harness::new(at(2025, 1, 6, 10, 0));
    let spec = DelaySpec::Recurring {
        pattern: RecurrencePattern::daily("09:00"),
    };
    let tab = h
        .scheduler
        .schedule(snapshot(1, "https://news.example"), &spec)
        .await
        .unwrap();

    assert!(tab.is_recurring);
    assert_eq!(tab.recurrence_pattern, Some(RecurrencePattern::daily("09:00")));
    assert_eq!(tab.wake_time, at(2025, 1, 7, 9, 0));
}

#[tokio::test]
async fn test_schedule_recurring_scenario_b() {
    // Weekdays pattern created Friday 15:00 first wakes Monday.
    let h = Harness::new(at(2025, 1, 10, 15, 0));
    let spec = DelaySpec::Recurring {
        pattern: RecurrencePattern::weekdays("08:30"),
    };
    let tab = h
        .scheduler
        .schedule(snapshot(1, "https://work.example"), &spec)
        .await
        .unwrap();
    assert_eq!(tab.wake_time, at(2025, 1, 13, 8, 30));
}

#[tokio::test]
async fn test_schedule_batch_gets_unique_ids_and_one_close() {
    let h = Harness::new(at(2025, 1, 6, 10, 0));
    let created = h
        .scheduler
        .schedule_all(
            vec![
                snapshot(1, "https://a.example"),
                snapshot(2, "https://b.example"),
                snapshot(3, "https://c.example"),
            ],
            &DelaySpec::after_days(1),
        )
        .await
        .unwrap();

    let unique: HashSet<&str> = created.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(unique.len(), 3);
    assert!(created.iter().all(|t| t.wake_time == created[0].wake_time));
    assert_eq!(h.records().await.len(), 3);
    assert_eq!(h.timers.pending().len(), 3);
    assert_eq!(h.tabs.closed(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_schedule_rejects_bad_requests_without_side_effects() {
    let now = at(2025, 1, 6, 10, 0);
    let h = Harness::new(now);

    let negative = h
        .scheduler
        .schedule(snapshot(1, "https://a.example"), &DelaySpec::After { millis: -1 })
        .await;
    assert!(matches!(negative, Err(ScheduleError::InvalidDelay(_))));

    let ended = DelaySpec::Recurring {
        pattern: RecurrencePattern::daily("09:00").until(now - 1),
    };
    let ended = h.scheduler.schedule(snapshot(1, "https://a.example"), &ended).await;
    assert!(matches!(ended, Err(ScheduleError::NoOccurrence)));

    for wake_time in [i64::MIN, -1, MAX_WAKE_TIME + 1, i64::MAX] {
        let out_of_range = h
            .scheduler
            .schedule(snapshot(1, "https://a.example"), &DelaySpec::At { wake_time })
            .await;
        assert!(
            matches!(out_of_range, Err(ScheduleError::InvalidDelay(_))),
            "wake time {} accepted",
            wake_time
        );
    }
    let too_far = DelaySpec::After {
        millis: MAX_WAKE_TIME - now + 1,
    };
    let too_far = h.scheduler.schedule(snapshot(1, "https://a.example"), &too_far).await;
    assert!(matches!(too_far, Err(ScheduleError::InvalidDelay(_))));

    let empty = h.scheduler.schedule_all(Vec::new(), &DelaySpec::after_hours(1)).await;
    assert!(matches!(empty, Err(ScheduleError::NoTabs)));

    assert!(h.records().await.is_empty());
    assert!(h.timers.pending().is_empty());
    assert!(h.tabs.closed().is_empty());
}

#[tokio::test]
async fn test_schedule_survives_close_failure() {
    let h = Harness::new(at(2025, 1, 6, 10, 0));
    h.tabs.fail_close();
    let tab = h
        .scheduler
        .schedule(snapshot(9, "https://a.example"), &DelaySpec::after_hours(1))
        .await
        .unwrap();
    assert_eq!(h.records().await, vec![tab.clone()]);
    assert!(h.timer(&tab.id).is_some());
}

#[tokio::test]
async fn test_schedule_fails_when_store_write_fails() {
    let h = Harness::new(at(2025, 1, 6, 10, 0));
    h.kv.set_fail_writes(true);
    let result = h
        .scheduler
        .schedule(snapshot(9, "https://a.example"), &DelaySpec::after_hours(1))
        .await;
    assert!(matches!(result, Err(ScheduleError::Store(_))));
    assert!(h.timers.pending().is_empty());
    assert!(h.tabs.closed().is_empty());
}

// ---------------------------------------------------------------------------
// onTimerFired
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_fire_one_shot_reopens_and_removes() {
    let h = Harness::new(0);
    let tab = h
        .scheduler
        .schedule(snapshot(1, "https://a.example"), &DelaySpec::After { millis: 5_000 })
        .await
        .unwrap();

    h.clock.set(5_000);
    let outcome = h.scheduler.on_timer_fired(&tab.id).await.unwrap();

    assert_eq!(outcome, WakeOutcome::Removed);
    assert_eq!(h.tabs.opened(), vec!["https://a.example".to_string()]);
    assert!(h.records().await.is_empty());
    assert_eq!(h.timer(&tab.id), None);
}

#[tokio::test]
async fn test_fire_monthly_scenario_d() {
    let fired_at = at(2025, 1, 15, 9, 0);
    let h = Harness::new(fired_at);
    h.insert(recurring(
        "m",
        "https://bills.example",
        fired_at,
        RecurrencePattern::monthly("09:00", 15),
    ))
    .await;
    // The old timer is outstanding when the fire is delivered.
    h.timers.register("delayed-tab-m", fired_at).await.unwrap();
    let registrations_before = h.timers.registrations();

    let outcome = h.scheduler.on_timer_fired("m").await.unwrap();

    let next = at(2025, 2, 15, 9, 0);
    assert_eq!(outcome, WakeOutcome::Rescheduled { next_wake: next });
    let records = h.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "m");
    assert_eq!(records[0].wake_time, next);
    assert!(records[0].is_recurring);
    assert_eq!(h.timers.pending().len(), 1);
    assert_eq!(h.timer("m"), Some(next));
    assert_eq!(h.timers.registrations(), registrations_before + 1);
    assert_eq!(h.tabs.opened(), vec!["https://bills.example".to_string()]);
}

#[tokio::test]
async fn test_fire_announces_woken_tab() {
    let fired_at = at(2025, 1, 15, 9, 0);
    let h = Harness::new(fired_at);
    h.insert(DelayedTab {
        favicon: Some("https://bills.example/favicon.ico".to_string()),
        ..recurring("m", "https://bills.example", fired_at, RecurrencePattern::monthly("09:00", 15))
    })
    .await;
    h.insert(one_shot("o", "https://once.example", fired_at)).await;

    h.scheduler.on_timer_fired("m").await.unwrap();
    h.scheduler.on_timer_fired("o").await.unwrap();

    let notes = h.tabs.notifications();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].title, "Tab Awakened!");
    assert_eq!(notes[0].message, "Your recurring tab \"Title\" is now open.");
    assert_eq!(notes[0].icon_url, "https://bills.example/favicon.ico");
    assert_eq!(notes[1].message, "Your delayed tab \"Title\" is now open.");
    assert_eq!(notes[1].icon_url, DEFAULT_NOTIFICATION_ICON);
}

#[tokio::test]
async fn test_bridge_emits_open_then_notify() {
    let (tabs, mut events) = EventTabHost::new();
    let kv = Arc::new(MemoryKvStore::new());
    let scheduler = WakeScheduler::new(
        kv,
        Arc::new(tabs),
        Arc::new(RecordingTimerHost::new()),
        Arc::new(ManualClock::new(5_000)),
        SchedulerConfig::with_wall_clock(WallClock::utc()),
    );
    scheduler
        .store()
        .upsert(one_shot("a", "https://a.example", 5_000))
        .await
        .unwrap();

    scheduler.on_timer_fired("a").await.unwrap();

    assert_eq!(
        events.try_recv().unwrap(),
        BridgeEvent::OpenTab {
            url: "https://a.example".to_string()
        }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        BridgeEvent::Notify {
            title: "Tab Awakened!".to_string(),
            message: "Your delayed tab \"Title\" is now open.".to_string(),
            icon_url: DEFAULT_NOTIFICATION_ICON.to_string(),
        }
    );
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_no_announcement_when_reopen_fails() {
    let h = Harness::new(10_000);
    h.insert(one_shot("a", "https://blocked.example", 10_000)).await;
    h.insert(DelayedTab {
        url: None,
        ..one_shot("b", "https://unused.example", 10_000)
    })
    .await;
    h.tabs.fail_url("https://blocked.example");

    h.scheduler.on_timer_fired("a").await.unwrap();
    h.scheduler.on_timer_fired("b").await.unwrap();

    assert!(h.tabs.notifications().is_empty());
    assert!(h.records().await.is_empty());
}

#[tokio::test]
async fn test_concurrent_fires_for_different_records_are_both_applied() {
    let now = at(2025, 1, 15, 9, 0);
    let h = Harness::new(now);
    h.insert(one_shot("a", "https://a.example", now)).await;
    h.insert(recurring("r", "https://r.example", now, RecurrencePattern::daily("09:00")))
        .await;
    h.insert(one_shot("later", "https://later.example", now + HOUR)).await;
    h.kv.set_yield_on_access(true);

    let (a, r) = tokio::join!(h.scheduler.on_timer_fired("a"), h.scheduler.on_timer_fired("r"));

    assert_eq!(a.unwrap(), WakeOutcome::Removed);
    assert_eq!(
        r.unwrap(),
        WakeOutcome::Rescheduled {
            next_wake: at(2025, 1, 16, 9, 0)
        }
    );
    let mut records = h.records().await;
    records.sort_by(|x, y| x.id.cmp(&y.id));
    let kept: Vec<(&str, i64)> = records.iter().map(|t| (t.id.as_str(), t.wake_time)).collect();
    assert_eq!(kept, vec![("later", now + HOUR), ("r", at(2025, 1, 16, 9, 0))]);

    let mut opened = h.tabs.opened();
    opened.sort();
    assert_eq!(opened, vec!["https://a.example".to_string(), "https://r.example".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_fires_never_lose_a_record() {
    let now = at(2025, 1, 15, 9, 0);
    let h = Arc::new(Harness::new(now));
    for i in 0..16 {
        h.insert(one_shot(&format!("t{}", i), &format!("https://{}.example", i), now))
            .await;
    }
    h.insert(one_shot("later", "https://later.example", now + HOUR)).await;
    h.kv.set_yield_on_access(true);

    let mut handles = Vec::new();
    for i in 0..16 {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move {
            h.scheduler.on_timer_fired(&format!("t{}", i)).await.unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), WakeOutcome::Removed);
    }

    let records = h.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "later");
    assert_eq!(h.tabs.opened().len(), 16);
}

#[tokio::test]
async fn test_fire_for_unknown_id_is_stale() {
    let h = Harness::new(1_000);
    let outcome = h.scheduler.on_timer_fired("ghost").await.unwrap();
    assert_eq!(outcome, WakeOutcome::Stale);
    assert!(h.tabs.opened().is_empty());
    assert!(h.timers.pending().is_empty());
}

#[tokio::test]
async fn test_early_fire_rearms_instead_of_waking() {
    let h = Harness::new(0);
    h.insert(one_shot("a", "https://a.example", 10 * 60_000)).await;

    h.clock.set(5 * 60_000);
    let outcome = h.scheduler.on_timer_fired("a").await.unwrap();

    assert_eq!(
        outcome,
        WakeOutcome::NotDue {
            wake_time: 10 * 60_000
        }
    );
    assert!(h.tabs.opened().is_empty());
    assert_eq!(h.records().await.len(), 1);
    assert_eq!(h.timer("a"), Some(10 * 60_000));
}

#[tokio::test]
async fn test_slightly_early_fire_is_honoured() {
    let h = Harness::new(0);
    h.insert(one_shot("a", "https://a.example", 60_000)).await;
    h.clock.set(30_000);
    let outcome = h.scheduler.on_timer_fired("a").await.unwrap();
    assert_eq!(outcome, WakeOutcome::Removed);
    assert_eq!(h.tabs.opened().len(), 1);
}

#[tokio::test]
async fn test_duplicate_fire_never_reopens_twice() {
    let fired_at = at(2025, 1, 6, 9, 0);
    let h = Harness::new(fired_at);
    h.insert(recurring(
        "d",
        "https://d.example",
        fired_at,
        RecurrencePattern::daily("09:00"),
    ))
    .await;

    let first = h.scheduler.on_timer_fired("d").await.unwrap();
    let second = h.scheduler.on_timer_fired("d").await.unwrap();

    assert_eq!(
        first,
        WakeOutcome::Rescheduled {
            next_wake: at(2025, 1, 7, 9, 0)
        }
    );
    assert!(matches!(second, WakeOutcome::NotDue { .. }));
    assert_eq!(h.tabs.opened().len(), 1);
}

#[tokio::test]
async fn test_fire_of_ended_series_removes_it() {
    let fired_at = at(2025, 1, 6, 9, 0);
    let h = Harness::new(fired_at);
    h.insert(recurring(
        "e",
        "https://e.example",
        fired_at,
        RecurrencePattern::daily("09:00").until(fired_at),
    ))
    .await;

    let outcome = h.scheduler.on_timer_fired("e").await.unwrap();
    assert_eq!(outcome, WakeOutcome::Removed);
    assert!(h.records().await.is_empty());
    assert_eq!(h.tabs.opened().len(), 1);
}

#[tokio::test]
async fn test_tab_open_failure_does_not_block_cleanup() {
    let h = Harness::new(1_000);
    h.tabs.fail_url("https://broken.example");
    h.insert(one_shot("a", "https://broken.example", 1_000)).await;

    let outcome = h.scheduler.on_timer_fired("a").await.unwrap();
    assert_eq!(outcome, WakeOutcome::Removed);
    assert!(h.records().await.is_empty());
    assert_eq!(h.timer("a"), None);
}

#[tokio::test]
async fn test_record_without_url_is_cleaned_up_silently() {
    let h = Harness::new(1_000);
    let mut tab = one_shot("a", "", 1_000);
    tab.url = None;
    h.insert(tab).await;

    let outcome = h.scheduler.on_timer_fired("a").await.unwrap();
    assert_eq!(outcome, WakeOutcome::Removed);
    assert!(h.tabs.opened().is_empty());
}

#[tokio::test]
async fn test_timer_names_are_routed_by_prefix() {
    let h = Harness::new(1_000);
    h.insert(one_shot("a", "https://a.example", 1_000)).await;

    assert!(h.scheduler.on_timer_name("other-alarm").await.is_none());
    let routed = h.scheduler.on_timer_name("delayed-tab-a").await;
    assert_eq!(routed.map(|r| r.unwrap()), Some(WakeOutcome::Removed));
}

// ---------------------------------------------------------------------------
// reconcileOnStartup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_reconcile_scenario_c() {
    let now = at(2025, 1, 6, 12, 0);
    let h = Harness::new(now);
    h.insert(one_shot("past", "https://past.example", now - HOUR)).await;
    h.insert(one_shot("future", "https://future.example", now + HOUR)).await;

    let report = h.scheduler.reconcile_on_startup(now).await.unwrap();

    assert_eq!(
        report,
        ReconcileReport {
            woken: 1,
            rescheduled: 0,
            removed: 1,
            rearmed: 1,
        }
    );
    assert_eq!(h.tabs.opened(), vec!["https://past.example".to_string()]);
    let notes = h.tabs.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].message, "Your delayed tab \"Title\" is now open.");
    let records = h.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "future");
    assert_eq!(h.timer("past"), None);
    assert_eq!(h.timer("future"), Some(now + HOUR));
}

#[tokio::test]
async fn test_reconcile_rolls_missed_recurrence_forward_once() {
    // Missed three daily occurrences while the host was down.
    let now = at(2025, 1, 9, 12, 0);
    let h = Harness::new(now);
    h.insert(recurring(
        "r",
        "https://r.example",
        at(2025, 1, 6, 9, 0),
        RecurrencePattern::daily("09:00"),
    ))
    .await;

    let report = h.scheduler.reconcile_on_startup(now).await.unwrap();

    assert_eq!(report.woken, 1);
    assert_eq!(report.rescheduled, 1);
    assert_eq!(h.tabs.opened().len(), 1);
    assert_eq!(h.records().await[0].wake_time, at(2025, 1, 10, 9, 0));
    assert_eq!(h.timer("r"), Some(at(2025, 1, 10, 9, 0)));
}

#[tokio::test]
async fn test_reconcile_without_due_records_is_idempotent() {
    let now = at(2025, 1, 6, 12, 0);
    let h = Harness::new(now);
    h.insert(one_shot("a", "https://a.example", now + HOUR)).await;
    h.insert(recurring(
        "b",
        "https://b.example",
        now + 2 * HOUR,
        RecurrencePattern::weekly("14:00", vec![1]),
    ))
    .await;
    let before = h.records().await;

    let first = h.scheduler.reconcile_on_startup(now).await.unwrap();
    let timers_after_first = h.timers.pending();
    let second = h.scheduler.reconcile_on_startup(now).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.woken, 0);
    assert_eq!(first.rearmed, 2);
    assert_eq!(h.records().await, before);
    assert_eq!(h.timers.pending(), timers_after_first);
    assert!(h.tabs.opened().is_empty());
}

#[tokio::test]
async fn test_reconcile_rearms_after_host_restart() {
    let h = Harness::new(0);
    let tab = h
        .scheduler
        .schedule(snapshot(1, "https://a.example"), &DelaySpec::after_hours(2))
        .await
        .unwrap();

    h.timers.clear();
    assert_eq!(h.timer(&tab.id), None);

    h.scheduler.reconcile_on_startup(0).await.unwrap();
    assert_eq!(h.timer(&tab.id), Some(tab.wake_time));
}

// ---------------------------------------------------------------------------
// wakeNow / remove / install
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_wake_now_terminates_recurrence() {
    let now = at(2025, 1, 6, 8, 0);
    let h = Harness::new(now);
    let spec = DelaySpec::Recurring {
        pattern: RecurrencePattern::weekdays("09:00"),
    };
    let tab = h
        .scheduler
        .schedule(snapshot(1, "https://standup.example"), &spec)
        .await
        .unwrap();

    let woken = h.scheduler.wake_now(&ids(&[tab.id.as_str()])).await.unwrap();

    assert_eq!(woken.len(), 1);
    assert!(h.records().await.is_empty());
    assert_eq!(h.timer(&tab.id), None);
    assert_eq!(h.tabs.opened(), vec!["https://standup.example".to_string()]);
    // A manual wake is the user's own action; no notification.
    assert!(h.tabs.notifications().is_empty());
}

#[tokio::test]
async fn test_wake_now_ignores_unknown_ids() {
    let h = Harness::new(0);
    h.insert(one_shot("a", "https://a.example", HOUR)).await;

    let woken = h.scheduler.wake_now(&ids(&["nope"])).await.unwrap();
    assert!(woken.is_empty());
    assert_eq!(h.records().await.len(), 1);
    assert!(h.tabs.opened().is_empty());
}

#[tokio::test]
async fn test_wake_now_then_stale_timer_fire_is_harmless() {
    let h = Harness::new(0);
    h.insert(one_shot("a", "https://a.example", HOUR)).await;
    h.scheduler.wake_now(&ids(&["a"])).await.unwrap();

    h.clock.set(HOUR);
    let outcome = h.scheduler.on_timer_fired("a").await.unwrap();
    assert_eq!(outcome, WakeOutcome::Stale);
    assert_eq!(h.tabs.opened().len(), 1);
}

#[tokio::test]
async fn test_remove_deletes_without_reopening() {
    let h = Harness::new(0);
    let created = h
        .scheduler
        .schedule_all(
            vec![snapshot(1, "https://a.example"), snapshot(2, "https://b.example")],
            &DelaySpec::after_hours(1),
        )
        .await
        .unwrap();

    let removed = h.scheduler.remove(&ids(&[created[0].id.as_str()])).await.unwrap();
    assert_eq!(removed.len(), 1);
    assert!(h.tabs.opened().is_empty());
    assert_eq!(h.timer(&created[0].id), None);
    assert!(h.timer(&created[1].id).is_some());
}

#[tokio::test]
async fn test_on_installed_never_wipes_existing_records() {
    let h = Harness::new(0);
    assert!(h.scheduler.on_installed().await.unwrap());
    h.insert(one_shot("a", "https://a.example", HOUR)).await;
    assert!(!h.scheduler.on_installed().await.unwrap());
    assert_eq!(h.records().await.len(), 1);
}

// ---------------------------------------------------------------------------
// start(): end to end through the tokio timer facility
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_started_scheduler_wakes_tab_when_timer_fires() {
    let kv = Arc::new(MemoryKvStore::new());
    let tabs = Arc::new(RecordingTabHost::new());
    let clock = Arc::new(ManualClock::new(0));
    let (timers, fired) = TokioTimerHost::new(clock.clone());
    let scheduler = Arc::new(WakeScheduler::new(
        kv,
        tabs.clone(),
        Arc::new(timers),
        clock.clone(),
        SchedulerConfig::with_wall_clock(WallClock::utc()),
    ));

    let tab = scheduler
        .schedule(snapshot(1, "https://later.example"), &DelaySpec::After { millis: 60_000 })
        .await
        .unwrap();
    let dispatcher = scheduler.start(fired);

    clock.set(60_000);
    tokio::time::advance(Duration::from_secs(61)).await;
    for _ in 0..100 {
        if !tabs.opened().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(tabs.opened(), vec!["https://later.example".to_string()]);
    assert_eq!(scheduler.store().find_by_id(&tab.id).await.unwrap(), None);
    dispatcher.abort();
}
