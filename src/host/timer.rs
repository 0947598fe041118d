//! Tokio-backed timer facility.
//!
//! Each registration spawns a sleeping task; when it wakes, the timer name is
//! pushed onto an unbounded channel that the scheduler's dispatch loop drains.
//! Timers live only as long as the process, which is why the scheduler
//! re-registers every surviving record on startup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::{Clock, TimerHost};
use crate::types::errors::HostError;

/// Longest single sleep. A timer further out fires early and is re-armed by
/// the scheduler, which treats an early fire as not yet due.
const MAX_SLEEP_MS: u64 = 30 * 24 * 60 * 60 * 1000;

struct PendingTimer {
    generation: u64,
    when_ms: i64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TimerTable {
    next_generation: u64,
    pending: HashMap<String, PendingTimer>,
}

/// Timer facility that dispatches fired names over an mpsc channel.
pub struct TokioTimerHost {
    table: Arc<Mutex<TimerTable>>,
    fired_tx: mpsc::UnboundedSender<String>,
    clock: Arc<dyn Clock>,
}

impl TokioTimerHost {
    /// Creates the facility and the receiving end of its fired-name channel.
    pub fn new(clock: Arc<dyn Clock>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let host = Self {
            table: Arc::new(Mutex::new(TimerTable::default())),
            fired_tx,
            clock,
        };
        (host, fired_rx)
    }

    /// Names with a timer that has not fired or been cancelled yet, sorted.
    pub fn pending_names(&self) -> Vec<String> {
        let table = match self.table.lock() {
            Ok(t) => t,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut names: Vec<String> = table.pending.keys().cloned().collect();
        names.sort();
        names
    }

    /// Scheduled instant of a pending timer.
    pub fn pending_when(&self, name: &str) -> Option<i64> {
        let table = self.table.lock().ok()?;
        table.pending.get(name).map(|p| p.when_ms)
    }
}

#[async_trait]
impl TimerHost for TokioTimerHost {
    async fn register(&self, name: &str, when_ms: i64) -> Result<(), HostError> {
        let delay_ms = when_ms
            .saturating_sub(self.clock.now_millis())
            .clamp(0, MAX_SLEEP_MS as i64) as u64;
        let deadline = tokio::time::Instant::now() + Duration::from_millis(delay_ms);
        let mut table = self
            .table
            .lock()
            .map_err(|e| HostError::Timer(e.to_string()))?;

        table.next_generation += 1;
        let generation = table.next_generation;

        let name_owned = name.to_string();
        let tx = self.fired_tx.clone();
        let table_ref = Arc::clone(&self.table);
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Ok(mut t) = table_ref.lock() {
                // Only clear the slot if it was not re-registered meanwhile.
                if t.pending.get(&name_owned).map(|p| p.generation) == Some(generation) {
                    t.pending.remove(&name_owned);
                }
            }
            trace!(timer = %name_owned, "timer fired");
            let _ = tx.send(name_owned);
        });

        if let Some(previous) = table.pending.insert(
            name.to_string(),
            PendingTimer {
                generation,
                when_ms,
                handle,
            },
        ) {
            previous.handle.abort();
            debug!(timer = %name, "replaced pending timer");
        }
        Ok(())
    }

    async fn cancel(&self, name: &str) -> Result<(), HostError> {
        let mut table = self
            .table
            .lock()
            .map_err(|e| HostError::Timer(e.to_string()))?;
        if let Some(previous) = table.pending.remove(name) {
            previous.handle.abort();
            debug!(timer = %name, "cancelled timer");
        }
        Ok(())
    }
}

impl Drop for TokioTimerHost {
    fn drop(&mut self) {
        if let Ok(mut table) = self.table.lock() {
            for (_, timer) in table.pending.drain() {
                timer.handle.abort();
            }
        }
    }
}
