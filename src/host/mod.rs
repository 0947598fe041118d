//! Boundary collaborators of the scheduling core.
//!
//! The scheduler never talks to a browser, a timer wheel or a storage engine
//! directly. It is handed implementations of the traits below, so the same
//! core runs inside the RPC bridge, against SQLite, or entirely in memory in
//! tests.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::Value;

use crate::types::delayed_tab::WakeNotification;
use crate::types::errors::{HostError, StoreError};

pub mod bridge;
pub mod memory;
pub mod timer;

/// Handle the host assigns to a tab it opened.
pub type TabHandle = i64;

/// Persisted-state collaborator: a JSON-compatible key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Tab collaborator: opens and closes real browser tabs and shows the
/// notification announcing a reopened one.
#[async_trait]
pub trait TabHost: Send + Sync {
    async fn open_tab(&self, url: &str) -> Result<TabHandle, HostError>;
    async fn close_tabs(&self, tab_ids: &[TabHandle]) -> Result<(), HostError>;
    async fn notify(&self, notification: &WakeNotification) -> Result<(), HostError>;
}

/// Timer collaborator.
///
/// Registering a name that already has a pending timer replaces it, so a name
/// never has more than one outstanding timer. Cancelling an unknown name is a
/// no-op. Fired names are delivered out of band (see [`timer::TokioTimerHost`]).
#[async_trait]
pub trait TimerHost: Send + Sync {
    async fn register(&self, name: &str, when_ms: i64) -> Result<(), HostError>;
    async fn cancel(&self, name: &str) -> Result<(), HostError>;
}

/// Source of the current instant, in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Reads the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}
