//! Delayed Tab Store for TabSnooze.
//!
//! The whole collection of [`DelayedTab`] records lives under a single key of
//! the persisted-state collaborator. That store has no transactions, so every
//! read-modify-write goes through one async mutex: the list is re-read under
//! the lock, patched, and written back before the lock is released. Concurrent
//! timer fires are therefore strictly ordered and cannot lose each other's
//! updates.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::host::KeyValueStore;
use crate::types::delayed_tab::DelayedTab;
use crate::types::errors::StoreError;

/// Storage key of the delayed-tab collection.
pub const DELAYED_TABS_KEY: &str = "delayedTabs";

/// Persisted collection of delayed tabs, keyed by `id`.
pub struct DelayedTabStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl DelayedTabStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    /// All records, normalized.
    pub async fn list(&self) -> Result<Vec<DelayedTab>, StoreError> {
        self.read().await
    }

    /// All records ordered by wake time, soonest first.
    pub async fn list_sorted(&self) -> Result<Vec<DelayedTab>, StoreError> {
        let mut tabs = self.read().await?;
        tabs.sort_by(|a, b| a.wake_time.cmp(&b.wake_time).then_with(|| a.id.cmp(&b.id)));
        Ok(tabs)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<DelayedTab>, StoreError> {
        Ok(self.read().await?.into_iter().find(|t| t.id == id))
    }

    /// Inserts `record`, replacing any record with the same id.
    pub async fn upsert(&self, record: DelayedTab) -> Result<(), StoreError> {
        self.update(move |tabs| {
            match tabs.iter_mut().find(|t| t.id == record.id) {
                Some(existing) => *existing = record,
                None => tabs.push(record),
            }
        })
        .await
    }

    /// Deletes every record whose id is in `ids` and returns the removed records.
    /// Absent ids are ignored.
    pub async fn remove_many(&self, ids: &HashSet<String>) -> Result<Vec<DelayedTab>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.update(|tabs| {
            let (removed, kept): (Vec<_>, Vec<_>) =
                std::mem::take(tabs).into_iter().partition(|t| ids.contains(&t.id));
            *tabs = kept;
            removed
        })
        .await
    }

    /// Runs `f` against the current collection while holding the write lock.
    ///
    /// The collection is re-read after the lock is taken and written back only
    /// if `f` changed it.
    pub async fn update<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Vec<DelayedTab>) -> R + Send,
        R: Send,
    {
        let _guard = self.write_lock.lock().await;
        let before = self.read().await?;
        let mut tabs = before.clone();
        let result = f(&mut tabs);
        if tabs != before {
            self.write(&tabs).await?;
            debug!(count = tabs.len(), "delayed tabs persisted");
        }
        Ok(result)
    }

    /// Creates an empty collection if none exists yet. Returns whether it wrote.
    pub async fn initialize(&self) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        if self.kv.get(DELAYED_TABS_KEY).await?.is_some() {
            return Ok(false);
        }
        self.write(&[]).await?;
        Ok(true)
    }

    async fn read(&self) -> Result<Vec<DelayedTab>, StoreError> {
        match self.kv.get(DELAYED_TABS_KEY).await? {
            Some(value) => Ok(normalize_delayed_tabs(value)),
            None => Ok(Vec::new()),
        }
    }

    async fn write(&self, tabs: &[DelayedTab]) -> Result<(), StoreError> {
        let value = serde_json::to_value(tabs)?;
        self.kv.set(DELAYED_TABS_KEY, value).await
    }
}

/// Turns the raw stored value into well-formed records.
///
/// Older records carry numeric ids; those are coerced to their decimal string
/// form. Entries that still fail to decode are dropped with a warning, and if
/// two entries share an id the later one wins.
pub fn normalize_delayed_tabs(value: Value) -> Vec<DelayedTab> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Null => return Vec::new(),
        other => {
            warn!(kind = %value_kind(&other), "delayed tab collection is not a list; ignoring");
            return Vec::new();
        }
    };

    let mut tabs: Vec<DelayedTab> = Vec::with_capacity(entries.len());
    for mut entry in entries {
        if let Some(obj) = entry.as_object_mut() {
            if let Some(id) = obj.get("id").and_then(canonical_id) {
                obj.insert("id".to_string(), Value::String(id));
            }
        }
        match serde_json::from_value::<DelayedTab>(entry) {
            Ok(tab) => {
                if let Some(pos) = tabs.iter().position(|t| t.id == tab.id) {
                    tabs.remove(pos);
                }
                tabs.push(tab);
            }
            Err(e) => warn!(error = %e, "dropping malformed delayed tab record"),
        }
    }
    tabs
}

fn canonical_id(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
