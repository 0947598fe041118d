//! Recurrence Calculator for TabSnooze.
//!
//! Computes the next wake time of a recurring delayed tab. Everything here is a
//! pure function of `(pattern, now, time zone)`; the current instant is always
//! passed in, never read from a clock.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeZone,
    Utc, Weekday,
};

use crate::types::recurrence::{RecurrencePattern, RecurrenceType, TimeOfDay};

/// The wall clock in which `"HH:MM"` times and calendar days are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WallClock {
    /// The host's local time zone, DST included.
    #[default]
    Local,
    /// A fixed UTC offset. Mostly useful for tests and pinned deployments.
    Fixed(FixedOffset),
}

impl WallClock {
    /// Builds a fixed wall clock from an offset in minutes east of UTC.
    pub fn fixed_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(WallClock::Fixed)
    }

    pub fn utc() -> Self {
        WallClock::Fixed(Utc.fix())
    }

    /// See [`compute_next_occurrence`].
    pub fn next_occurrence(&self, pattern: &RecurrencePattern, now_ms: i64) -> Option<i64> {
        match self {
            WallClock::Local => compute_next_occurrence(pattern, now_ms, &Local),
            WallClock::Fixed(offset) => compute_next_occurrence(pattern, now_ms, offset),
        }
    }
}

/// Computes the next wake time (epoch millis) for `pattern` as seen at `now_ms`.
///
/// Returns `None` when the series has ended (`now_ms >= end_date`), when the
/// pattern is underspecified (unparseable time, empty `days_of_week` for a
/// weekly/custom pattern) or when its type is unknown.
///
/// Monthly patterns do not clamp: a `day_of_month` past the end of a short
/// month rolls into the next month, e.g. the 31st of a 30-day month lands on
/// the 1st of the following month.
pub fn compute_next_occurrence<Tz: TimeZone>(
    pattern: &RecurrencePattern,
    now_ms: i64,
    tz: &Tz,
) -> Option<i64> {
    if let Some(end) = pattern.end_date {
        if now_ms >= end {
            return None;
        }
    }

    let time = TimeOfDay::parse(&pattern.time)?;
    let now: DateTime<Tz> = tz.timestamp_millis_opt(now_ms).single()?;
    let today = now.date_naive();

    match pattern.kind {
        RecurrenceType::Daily => {
            let candidate = local_millis(tz, today, time)?;
            if candidate > now_ms {
                Some(candidate)
            } else {
                local_millis(tz, today.succ_opt()?, time)
            }
        }
        RecurrenceType::Weekdays => {
            let mut day = today.succ_opt()?;
            while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                day = day.succ_opt()?;
            }
            local_millis(tz, day, time)
        }
        RecurrenceType::Weekly | RecurrenceType::Custom => {
            let days = sorted_weekdays(pattern.days_of_week.as_deref()?);
            let first = *days.first()?;
            let current = today.weekday().num_days_from_sunday();

            let offset = match days.iter().find(|&&d| d > current) {
                Some(&d) => d - current,
                None => 7 - current + first,
            };
            let day = today + Duration::days(i64::from(offset));
            let candidate = local_millis(tz, day, time)?;

            if day.weekday().num_days_from_sunday() == current && candidate <= now_ms {
                local_millis(tz, day + Duration::days(7), time)
            } else {
                Some(candidate)
            }
        }
        RecurrenceType::Monthly => {
            // 0 means unset, like an absent day.
            let day_of_month = pattern.day_of_month.filter(|&d| d != 0).unwrap_or(1);
            let day = month_day_overflowing(today.year(), today.month(), day_of_month)?;
            let candidate = local_millis(tz, day, time)?;
            if candidate > now_ms {
                Some(candidate)
            } else {
                let (year, month) = next_month(day.year(), day.month());
                let rolled = month_day_overflowing(year, month, day.day() as u8)?;
                local_millis(tz, rolled, time)
            }
        }
        RecurrenceType::Unknown => None,
    }
}

/// Epoch millis of `date` at `time` in `tz`.
///
/// Ambiguous local times (DST fall-back) pick the earlier instant; times that
/// fall in a DST gap are pushed forward by an hour.
pub fn local_millis<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: TimeOfDay) -> Option<i64> {
    let naive = date.and_hms_opt(time.hour, time.minute, 0)?;
    resolve_local(tz, naive)
}

pub(crate) fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<i64> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.timestamp_millis())
}

/// Day `day` of `year`/`month`, overflowing into following months like
/// ordinary calendar arithmetic (day 0 is the last day of the previous month).
pub(crate) fn month_day_overflowing(year: i32, month: u32, day: u8) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    first.checked_add_signed(Duration::days(i64::from(day) - 1))
}

pub(crate) fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// Valid weekday indices, ascending and deduplicated.
fn sorted_weekdays(days: &[u8]) -> Vec<u32> {
    let mut out: Vec<u32> = days
        .iter()
        .filter(|&&d| d <= 6)
        .map(|&d| u32::from(d))
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}
