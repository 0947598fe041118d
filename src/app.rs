//! App Core for TabSnooze.
//!
//! Central struct holding the wake scheduler and the delay settings engine,
//! managing application lifecycle.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::database::{Database, SqliteKvStore};
use crate::host::timer::TokioTimerHost;
use crate::host::{Clock, KeyValueStore, SystemClock, TabHost, TimerHost};
use crate::managers::wake_scheduler::{SchedulerConfig, WakeScheduler};
use crate::services::settings_engine::SettingsEngine;

/// Central application struct.
pub struct App {
    pub scheduler: Arc<WakeScheduler>,
    pub settings_engine: Mutex<SettingsEngine>,
}

impl App {
    /// Builds the app around already-constructed collaborators.
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        tabs: Arc<dyn TabHost>,
        timers: Arc<dyn TimerHost>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        let settings_engine = SettingsEngine::new(Arc::clone(&kv));
        let scheduler = Arc::new(WakeScheduler::new(kv, tabs, timers, clock, config));
        Self {
            scheduler,
            settings_engine: Mutex::new(settings_engine),
        }
    }

    /// Opens the SQLite store at `db_path` and wires a tokio timer facility.
    ///
    /// Returns the app together with the receiver of fired timer names, which
    /// must be handed to [`App::startup`].
    pub fn open(
        db_path: &Path,
        tabs: Arc<dyn TabHost>,
        config: SchedulerConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<String>), Box<dyn std::error::Error>> {
        let db = Arc::new(Database::open(db_path)?);
        let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKvStore::new(db));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let (timers, fired) = TokioTimerHost::new(Arc::clone(&clock));
        let app = Self::new(kv, tabs, Arc::new(timers), clock, config);
        Ok((app, fired))
    }

    /// Startup sequence: load settings, run the install hook, then reconcile
    /// missed wake-ups and start dispatching fired timers.
    pub async fn startup(&self, fired: mpsc::UnboundedReceiver<String>) -> JoinHandle<()> {
        if let Err(e) = self.settings_engine.lock().await.load().await {
            warn!(error = %e, "failed to load delay settings; using defaults");
        }
        match self.scheduler.on_installed().await {
            Ok(true) => info!("first run detected"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "install hook failed"),
        }
        self.scheduler.start(fired)
    }
}
