use serde::{Deserialize, Serialize};

use super::recurrence::RecurrencePattern;

/// A browser tab that was closed and must be reopened at `wake_time`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DelayedTab {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    /// Epoch milliseconds.
    pub wake_time: i64,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<RecurrencePattern>,
}

impl DelayedTab {
    /// The recurrence pattern, only when the record is flagged recurring.
    pub fn active_pattern(&self) -> Option<&RecurrencePattern> {
        if self.is_recurring {
            self.recurrence_pattern.as_ref()
        } else {
            None
        }
    }
}

/// Icon shown when a woken tab has no favicon.
pub const DEFAULT_NOTIFICATION_ICON: &str = "icons/icon128.png";

/// Desktop notification announcing that a delayed tab was reopened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WakeNotification {
    pub title: String,
    pub message: String,
    pub icon_url: String,
}

impl WakeNotification {
    pub fn for_tab(tab: &DelayedTab) -> Self {
        let kind = if tab.is_recurring { "recurring" } else { "delayed" };
        let name = tab
            .title
            .as_deref()
            .or(tab.url.as_deref())
            .unwrap_or("Untitled");
        Self {
            title: "Tab Awakened!".to_string(),
            message: format!("Your {} tab \"{}\" is now open.", kind, name),
            icon_url: tab
                .favicon
                .clone()
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_ICON.to_string()),
        }
    }
}

/// Descriptive snapshot of an open tab, taken when the user delays it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    /// The host's transient tab handle, used only to close the tab now.
    #[serde(default)]
    pub tab_id: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub favicon: Option<String>,
}

impl TabSnapshot {
    pub fn new(tab_id: i64, url: &str, title: &str) -> Self {
        Self {
            tab_id: Some(tab_id),
            url: Some(url.to_string()),
            title: Some(title.to_string()),
            favicon: None,
        }
    }
}

/// Short human-readable time remaining until `wake_time`, e.g. "2d 3h",
/// "4h 5m", "12m", or "now" once it has passed.
pub fn format_time_left(wake_time: i64, now_ms: i64) -> String {
    const MINUTE: i64 = 60 * 1000;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;

    let diff = wake_time.saturating_sub(now_ms);
    if diff <= 0 {
        return "now".to_string();
    }
    let days = diff / DAY;
    let hours = (diff % DAY) / HOUR;
    let minutes = (diff % HOUR) / MINUTE;
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
