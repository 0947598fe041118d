//! Quick-delay presets for TabSnooze.
//!
//! Turns a [`DelayPreset`] plus the user's [`DelaySettings`] into an absolute
//! wake time. Like the recurrence calculator, the current instant and the
//! random source are passed in.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Timelike};
use rand::Rng;

use super::recurrence_calculator::{
    local_millis, month_day_overflowing, next_month, resolve_local, WallClock,
};
use crate::types::delay::DelayPreset;
use crate::types::errors::PresetError;
use crate::types::recurrence::TimeOfDay;
use crate::types::settings::DelaySettings;

const HOUR_MS: i64 = 60 * 60 * 1000;

/// Resolves `preset` to epoch milliseconds as seen at `now_ms`.
pub fn resolve_preset<R: Rng + ?Sized>(
    preset: DelayPreset,
    settings: &DelaySettings,
    now_ms: i64,
    wall_clock: WallClock,
    rng: &mut R,
) -> Result<i64, PresetError> {
    match wall_clock {
        WallClock::Local => resolve_in(preset, settings, now_ms, &Local, rng),
        WallClock::Fixed(offset) => resolve_in(preset, settings, now_ms, &offset, rng),
    }
}

fn resolve_in<Tz: TimeZone, R: Rng + ?Sized>(
    preset: DelayPreset,
    settings: &DelaySettings,
    now_ms: i64,
    tz: &Tz,
    rng: &mut R,
) -> Result<i64, PresetError> {
    let now: DateTime<Tz> = tz
        .timestamp_millis_opt(now_ms)
        .single()
        .ok_or(PresetError::Nonexistent)?;
    let today = now.date_naive();
    let current = today.weekday().num_days_from_sunday();

    match preset {
        DelayPreset::LaterToday => Ok(now_ms + i64::from(settings.later_today) * HOUR_MS),
        DelayPreset::Tonight => {
            let time = parse_time(&settings.tonight_time)?;
            let tonight = at(tz, today, time)?;
            if tonight < now_ms {
                Ok(now_ms + HOUR_MS)
            } else {
                Ok(tonight)
            }
        }
        DelayPreset::Tomorrow => {
            let time = parse_time(&settings.tomorrow_time)?;
            at(tz, today + Duration::days(1), time)
        }
        DelayPreset::Weekend => {
            let time = parse_time(&settings.weekend_time)?;
            let target = settings.weekend_day.index();
            let days = if current == target {
                7
            } else if current < target {
                target - current
            } else {
                7 - (current - target)
            };
            at(tz, today + Duration::days(i64::from(days)), time)
        }
        DelayPreset::NextWeek => {
            let time = parse_time(&settings.next_week_time)?;
            let target = u32::from(settings.next_week_day);
            if target > 6 {
                return Err(PresetError::InvalidSetting(format!(
                    "nextWeekDay out of range: {}",
                    target
                )));
            }
            let days = if current == target {
                7
            } else if current < target {
                target - current + 7
            } else {
                7 - (current - target) + 7
            };
            at(tz, today + Duration::days(i64::from(days)), time)
        }
        DelayPreset::NextMonth => {
            let (year, month) = next_month(today.year(), today.month());
            let day = if settings.next_month_same_day {
                let last = days_in_month(year, month)?;
                NaiveDate::from_ymd_opt(year, month, today.day().min(last))
            } else {
                same_weekday_of_week(year, month, today)
            }
            .ok_or(PresetError::Nonexistent)?;
            let clock_time = now.naive_local().time();
            let time = TimeOfDay {
                hour: clock_time.hour(),
                minute: clock_time.minute(),
            };
            at(tz, day, time)
        }
        DelayPreset::Someday => {
            let (min, max) = (settings.someday_min_months, settings.someday_max_months);
            if min > max {
                return Err(PresetError::InvalidSetting(format!(
                    "somedayMinMonths {} exceeds somedayMaxMonths {}",
                    min, max
                )));
            }
            let months = rng.gen_range(min..=max);
            let extra_days = rng.gen_range(0..30);
            let (year, month) = add_months(today.year(), today.month(), months).ok_or_else(|| {
                PresetError::InvalidSetting(format!("someday range too large: {} months", months))
            })?;
            let day = month_day_overflowing(year, month, today.day() as u8)
                .and_then(|d| d.checked_add_signed(Duration::days(extra_days)))
                .ok_or(PresetError::Nonexistent)?;
            resolve_local(tz, day.and_time(now.naive_local().time()))
                .ok_or(PresetError::Nonexistent)
        }
    }
}

fn parse_time(value: &str) -> Result<TimeOfDay, PresetError> {
    TimeOfDay::parse(value).ok_or_else(|| PresetError::InvalidTime(value.to_string()))
}

fn at<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: TimeOfDay) -> Result<i64, PresetError> {
    local_millis(tz, date, time).ok_or(PresetError::Nonexistent)
}

fn add_months(year: i32, month: u32, months: u32) -> Option<(i32, u32)> {
    let zero_based = month.checked_sub(1)?.checked_add(months)?;
    let years = i32::try_from(zero_based / 12).ok()?;
    Some((year.checked_add(years)?, zero_based % 12 + 1))
}

fn days_in_month(year: i32, month: u32) -> Result<u32, PresetError> {
    let (ny, nm) = next_month(year, month);
    NaiveDate::from_ymd_opt(ny, nm, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .ok_or(PresetError::Nonexistent)
}

/// The day in `year`/`month` with the same weekday and week-of-month as
/// `reference`; falls back to the month's last such weekday.
fn same_weekday_of_week(year: i32, month: u32, reference: NaiveDate) -> Option<NaiveDate> {
    let weekday = reference.weekday();
    let week_of_month = (reference.day() + 6) / 7;

    let mut first = NaiveDate::from_ymd_opt(year, month, 1)?;
    while first.weekday() != weekday {
        first = first.succ_opt()?;
    }
    let candidate = first + Duration::weeks(i64::from(week_of_month - 1));
    if candidate.month() == month {
        return Some(candidate);
    }
    let mut last = first;
    while (last + Duration::weeks(1)).month() == month {
        last += Duration::weeks(1);
    }
    Some(last)
}
