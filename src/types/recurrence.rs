use serde::{Deserialize, Serialize};

/// Kind of repetition a recurring delayed tab follows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    Daily,
    Weekdays,
    Weekly,
    Monthly,
    Custom,
    /// Any tag this build does not understand. Never produces an occurrence.
    #[serde(other)]
    Unknown,
}

/// Rule for computing successive wake times of a recurring delayed tab.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurrencePattern {
    #[serde(rename = "type")]
    pub kind: RecurrenceType,
    /// Wall-clock time of day, `"HH:MM"`.
    pub time: String,
    /// Weekday indices, 0 = Sunday .. 6 = Saturday. Used by `weekly` and `custom`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
    /// 1..=31. Used by `monthly`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u8>,
    /// Epoch milliseconds after which the series produces nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<i64>,
}

impl RecurrencePattern {
    pub fn daily(time: &str) -> Self {
        Self::new(RecurrenceType::Daily, time)
    }

    pub fn weekdays(time: &str) -> Self {
        Self::new(RecurrenceType::Weekdays, time)
    }

    pub fn weekly(time: &str, days_of_week: Vec<u8>) -> Self {
        Self {
            days_of_week: Some(days_of_week),
            ..Self::new(RecurrenceType::Weekly, time)
        }
    }

    pub fn monthly(time: &str, day_of_month: u8) -> Self {
        Self {
            day_of_month: Some(day_of_month),
            ..Self::new(RecurrenceType::Monthly, time)
        }
    }

    /// Returns a copy of this pattern that ends at `end_date` (epoch millis).
    pub fn until(mut self, end_date: i64) -> Self {
        self.end_date = Some(end_date);
        self
    }

    fn new(kind: RecurrenceType, time: &str) -> Self {
        Self {
            kind,
            time: time.to_string(),
            days_of_week: None,
            day_of_month: None,
            end_date: None,
        }
    }
}

/// Parsed `"HH:MM"` wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    /// Parses `"HH:MM"` (also accepts single-digit hours such as `"9:05"`).
    ///
    /// Returns `None` for anything outside 00:00..=23:59.
    pub fn parse(value: &str) -> Option<Self> {
        let (h, m) = value.trim().split_once(':')?;
        let hour: u32 = h.parse().ok()?;
        let minute: u32 = m.parse().ok()?;
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self { hour, minute })
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
