use serde::{Deserialize, Serialize};

use super::recurrence::RecurrencePattern;

/// How the initial wake time of a delayed tab is chosen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DelaySpec {
    /// Relative offset from now, in milliseconds.
    After { millis: i64 },
    /// Absolute epoch milliseconds chosen by the caller.
    At {
        #[serde(rename = "wakeTime")]
        wake_time: i64,
    },
    /// First occurrence of a recurrence pattern; the record stays recurring.
    Recurring { pattern: RecurrencePattern },
}

impl DelaySpec {
    pub fn after_hours(hours: i64) -> Self {
        Self::After {
            millis: hours * 60 * 60 * 1000,
        }
    }

    pub fn after_days(days: i64) -> Self {
        Self::After {
            millis: days * 24 * 60 * 60 * 1000,
        }
    }
}

/// Quick-delay choices offered on the main screen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DelayPreset {
    LaterToday,
    Tonight,
    Tomorrow,
    Weekend,
    NextWeek,
    NextMonth,
    Someday,
}

impl DelayPreset {
    pub const ALL: [DelayPreset; 7] = [
        DelayPreset::LaterToday,
        DelayPreset::Tonight,
        DelayPreset::Tomorrow,
        DelayPreset::Weekend,
        DelayPreset::NextWeek,
        DelayPreset::NextMonth,
        DelayPreset::Someday,
    ];
}

impl std::str::FromStr for DelayPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown delay preset: {}", s))
    }
}
