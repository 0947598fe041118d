use tabsnooze::types::errors::*;

// === StoreError Tests ===

#[test]
fn store_error_display_variants() {
    assert_eq!(
        StoreError::Backend("disk full".to_string()).to_string(),
        "Store backend error: disk full"
    );
    assert_eq!(
        StoreError::Serialization("expected array".to_string()).to_string(),
        "Store serialization error: expected array"
    );
}

#[test]
fn store_error_from_serde_json() {
    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: StoreError = json_err.into();
    assert!(matches!(err, StoreError::Serialization(_)));
}

#[test]
fn store_error_from_rusqlite() {
    let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(matches!(err, StoreError::Backend(_)));
}

// === HostError Tests ===

#[test]
fn host_error_display_variants() {
    assert_eq!(
        HostError::OpenTab("blocked".to_string()).to_string(),
        "Failed to open tab: blocked"
    );
    assert_eq!(
        HostError::CloseTabs("[1, 2]".to_string()).to_string(),
        "Failed to close tabs: [1, 2]"
    );
    assert_eq!(
        HostError::Notify("denied".to_string()).to_string(),
        "Failed to show notification: denied"
    );
    assert_eq!(
        HostError::Timer("quota".to_string()).to_string(),
        "Timer error: quota"
    );
}

// === ScheduleError Tests ===

#[test]
fn schedule_error_display_variants() {
    assert_eq!(
        ScheduleError::NoOccurrence.to_string(),
        "Recurrence pattern yields no occurrence"
    );
    assert_eq!(
        ScheduleError::InvalidDelay("negative offset".to_string()).to_string(),
        "Invalid delay: negative offset"
    );
    assert_eq!(ScheduleError::NoTabs.to_string(), "No tabs to delay");
}

#[test]
fn schedule_error_wraps_store_error_transparently() {
    let err: ScheduleError = StoreError::Backend("locked".to_string()).into();
    assert_eq!(err.to_string(), "Store backend error: locked");
    assert!(matches!(err, ScheduleError::Store(StoreError::Backend(_))));
}

// === SettingsError Tests ===

#[test]
fn settings_error_display_variants() {
    assert_eq!(
        SettingsError::InvalidKey("foo".to_string()).to_string(),
        "Invalid settings key: foo"
    );
    assert_eq!(
        SettingsError::InvalidValue("laterToday".to_string()).to_string(),
        "Invalid settings value: laterToday"
    );
    assert_eq!(
        SettingsError::SerializationError("eof".to_string()).to_string(),
        "Settings serialization error: eof"
    );
}

#[test]
fn settings_error_from_store_error() {
    let err: SettingsError = StoreError::Backend("gone".to_string()).into();
    assert_eq!(err.to_string(), "Settings store error: Store backend error: gone");
}

// === PresetError Tests ===

#[test]
fn preset_error_display_variants() {
    assert_eq!(
        PresetError::InvalidTime("25:00".to_string()).to_string(),
        "Invalid preset time: 25:00"
    );
    assert_eq!(
        PresetError::InvalidSetting("range".to_string()).to_string(),
        "Invalid preset setting: range"
    );
    assert_eq!(
        PresetError::Nonexistent.to_string(),
        "Preset time does not exist locally"
    );
}

#[test]
fn errors_implement_std_error() {
    let errs: Vec<Box<dyn std::error::Error>> = vec![
        Box::new(StoreError::Backend("x".to_string())),
        Box::new(HostError::Timer("x".to_string())),
        Box::new(ScheduleError::NoTabs),
        Box::new(SettingsError::InvalidKey("x".to_string())),
        Box::new(PresetError::Nonexistent),
    ];
    for err in errs {
        assert!(!err.to_string().is_empty());
    }
}
