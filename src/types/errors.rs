use thiserror::Error;

// === StoreError ===

/// Errors raised by the persisted-state collaborator or the delayed-tab store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying key-value backend rejected the operation.
    #[error("Store backend error: {0}")]
    Backend(String),
    /// A stored value could not be encoded or decoded.
    #[error("Store serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

// === HostError ===

/// Errors reported by the tab or timer collaborators.
#[derive(Debug, Error)]
pub enum HostError {
    /// A tab could not be opened.
    #[error("Failed to open tab: {0}")]
    OpenTab(String),
    /// One or more tabs could not be closed.
    #[error("Failed to close tabs: {0}")]
    CloseTabs(String),
    /// A notification could not be shown.
    #[error("Failed to show notification: {0}")]
    Notify(String),
    /// The timer facility rejected a registration or cancellation.
    #[error("Timer error: {0}")]
    Timer(String),
}

// === ScheduleError ===

/// Errors surfaced by scheduler operations that have a caller to report to.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The recurrence pattern has no future occurrence.
    #[error("Recurrence pattern yields no occurrence")]
    NoOccurrence,
    /// The delay request cannot produce a usable wake time.
    #[error("Invalid delay: {0}")]
    InvalidDelay(String),
    /// Nothing to delay.
    #[error("No tabs to delay")]
    NoTabs,
    /// Persisting the record failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// === SettingsError ===

/// Errors related to delay settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The dotted key does not name a setting.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The value does not fit the setting's type.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// Reading or writing the settings key failed.
    #[error("Settings store error: {0}")]
    Store(#[from] StoreError),
}

// === PresetError ===

/// Errors resolving a quick-delay preset to a wake time.
#[derive(Debug, Error)]
pub enum PresetError {
    /// A configured time is not `HH:MM`.
    #[error("Invalid preset time: {0}")]
    InvalidTime(String),
    /// A configured range or day index is out of bounds.
    #[error("Invalid preset setting: {0}")]
    InvalidSetting(String),
    /// The computed local time does not exist in the wall clock.
    #[error("Preset time does not exist locally")]
    Nonexistent,
}
