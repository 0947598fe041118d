//! In-memory collaborators.
//!
//! Used by the test suites and by headless runs that have no browser attached.
//! The recording hosts keep a log of every request so callers can assert on
//! exactly what the scheduler asked the host to do.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Clock, KeyValueStore, TabHandle, TabHost, TimerHost};
use crate::types::delayed_tab::WakeNotification;
use crate::types::errors::{HostError, StoreError};

// === MemoryKvStore ===

/// Key-value store held in a map. Writes can be switched to fail, and every
/// access can be made to yield to the runtime the way a real backend would.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, Value>>,
    fail_writes: AtomicBool,
    yield_on_access: AtomicBool,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `set` fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes `get` and `set` yield before and after touching the map, so
    /// concurrent callers interleave between a read and the following write.
    pub fn set_yield_on_access(&self, yielding: bool) {
        self.yield_on_access.store(yielding, Ordering::SeqCst);
    }

    async fn maybe_yield(&self) {
        if self.yield_on_access.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.maybe_yield().await;
        let value = self.entries.read().await.get(key).cloned();
        self.maybe_yield().await;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.maybe_yield().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("writes disabled".to_string()));
        }
        self.entries.write().await.insert(key.to_string(), value);
        self.maybe_yield().await;
        Ok(())
    }
}

// === RecordingTabHost ===

/// Tab host that records open/close requests instead of touching a browser.
#[derive(Default)]
pub struct RecordingTabHost {
    state: Mutex<TabLog>,
}

#[derive(Default)]
struct TabLog {
    next_handle: TabHandle,
    opened: Vec<String>,
    closed: Vec<TabHandle>,
    notifications: Vec<WakeNotification>,
    failing_urls: HashSet<String>,
    fail_close: bool,
}

impl RecordingTabHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs opened so far, in order.
    pub fn opened(&self) -> Vec<String> {
        self.state.lock().map(|s| s.opened.clone()).unwrap_or_default()
    }

    /// Tab handles closed so far, in order.
    pub fn closed(&self) -> Vec<TabHandle> {
        self.state.lock().map(|s| s.closed.clone()).unwrap_or_default()
    }

    /// Notifications shown so far, in order.
    pub fn notifications(&self) -> Vec<WakeNotification> {
        self.state
            .lock()
            .map(|s| s.notifications.clone())
            .unwrap_or_default()
    }

    /// Opening `url` will fail from now on.
    pub fn fail_url(&self, url: &str) {
        if let Ok(mut s) = self.state.lock() {
            s.failing_urls.insert(url.to_string());
        }
    }

    /// Closing tabs will fail from now on.
    pub fn fail_close(&self) {
        if let Ok(mut s) = self.state.lock() {
            s.fail_close = true;
        }
    }
}

#[async_trait]
impl TabHost for RecordingTabHost {
    async fn open_tab(&self, url: &str) -> Result<TabHandle, HostError> {
        let mut s = self
            .state
            .lock()
            .map_err(|e| HostError::OpenTab(e.to_string()))?;
        if s.failing_urls.contains(url) {
            return Err(HostError::OpenTab(format!("cannot open {}", url)));
        }
        s.next_handle += 1;
        s.opened.push(url.to_string());
        Ok(s.next_handle)
    }

    async fn close_tabs(&self, tab_ids: &[TabHandle]) -> Result<(), HostError> {
        let mut s = self
            .state
            .lock()
            .map_err(|e| HostError::CloseTabs(e.to_string()))?;
        if s.fail_close {
            return Err(HostError::CloseTabs(format!("{:?}", tab_ids)));
        }
        s.closed.extend_from_slice(tab_ids);
        Ok(())
    }

    async fn notify(&self, notification: &WakeNotification) -> Result<(), HostError> {
        let mut s = self
            .state
            .lock()
            .map_err(|e| HostError::Notify(e.to_string()))?;
        s.notifications.push(notification.clone());
        Ok(())
    }
}

// === RecordingTimerHost ===

/// Timer host that only remembers what is pending. Nothing ever fires on its
/// own; tests drive firing by calling the scheduler directly.
#[derive(Default)]
pub struct RecordingTimerHost {
    state: Mutex<TimerLog>,
}

#[derive(Default)]
struct TimerLog {
    pending: BTreeMap<String, i64>,
    registrations: usize,
    fail_register: bool,
}

impl RecordingTimerHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending timers, name to scheduled instant.
    pub fn pending(&self) -> BTreeMap<String, i64> {
        self.state.lock().map(|s| s.pending.clone()).unwrap_or_default()
    }

    /// Total number of `register` calls that succeeded.
    pub fn registrations(&self) -> usize {
        self.state.lock().map(|s| s.registrations).unwrap_or_default()
    }

    /// Forgets every pending timer, as a host restart would.
    pub fn clear(&self) {
        if let Ok(mut s) = self.state.lock() {
            s.pending.clear();
        }
    }

    pub fn fail_register(&self, fail: bool) {
        if let Ok(mut s) = self.state.lock() {
            s.fail_register = fail;
        }
    }
}

#[async_trait]
impl TimerHost for RecordingTimerHost {
    async fn register(&self, name: &str, when_ms: i64) -> Result<(), HostError> {
        let mut s = self
            .state
            .lock()
            .map_err(|e| HostError::Timer(e.to_string()))?;
        if s.fail_register {
            return Err(HostError::Timer(format!("cannot register {}", name)));
        }
        s.pending.insert(name.to_string(), when_ms);
        s.registrations += 1;
        Ok(())
    }

    async fn cancel(&self, name: &str) -> Result<(), HostError> {
        let mut s = self
            .state
            .lock()
            .map_err(|e| HostError::Timer(e.to_string()))?;
        s.pending.remove(name);
        Ok(())
    }
}

// === ManualClock ===

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
