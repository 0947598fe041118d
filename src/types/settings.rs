use serde::{Deserialize, Serialize};

/// User-tunable parameters behind the quick-delay presets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DelaySettings {
    /// Hours added by "later today".
    pub later_today: u32,
    pub tonight_time: String,
    pub tomorrow_time: String,
    pub weekend_day: WeekendDay,
    pub weekend_time: String,
    /// 0 = Sunday .. 6 = Saturday.
    pub next_week_day: u8,
    pub next_week_time: String,
    /// Same day of month next month; otherwise same weekday of the same week-of-month.
    pub next_month_same_day: bool,
    pub someday_min_months: u32,
    pub someday_max_months: u32,
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            later_today: 3,
            tonight_time: "18:00".to_string(),
            tomorrow_time: "09:00".to_string(),
            weekend_day: WeekendDay::Saturday,
            weekend_time: "09:00".to_string(),
            next_week_day: 1,
            next_week_time: "09:00".to_string(),
            next_month_same_day: true,
            someday_min_months: 3,
            someday_max_months: 12,
        }
    }
}

/// Which weekend day the "weekend" preset targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WeekendDay {
    Saturday,
    Sunday,
}

impl WeekendDay {
    /// Weekday index, 0 = Sunday.
    pub fn index(self) -> u32 {
        match self {
            WeekendDay::Saturday => 6,
            WeekendDay::Sunday => 0,
        }
    }
}
