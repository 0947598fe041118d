//! Property-based tests for the recurrence calculator.
//!
//! These tests verify determinism, that every valid pattern yields a strictly
//! future occurrence, and that an end date always terminates the series.

use proptest::prelude::*;

use tabsnooze::services::recurrence_calculator::WallClock;
use tabsnooze::types::recurrence::{RecurrencePattern, RecurrenceType};

/// 2000-01-01 .. 2100-01-01 in epoch millis.
const MIN_NOW: i64 = 946_684_800_000;
const MAX_NOW: i64 = 4_102_444_800_000;

fn arb_time() -> impl Strategy<Value = String> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| format!("{:02}:{:02}", h, m))
}

fn arb_pattern() -> impl Strategy<Value = RecurrencePattern> {
    let kind = prop_oneof![
        Just(RecurrenceType::Daily),
        Just(RecurrenceType::Weekdays),
        Just(RecurrenceType::Weekly),
        Just(RecurrenceType::Monthly),
        Just(RecurrenceType::Custom),
    ];
    (
        kind,
        arb_time(),
        prop::collection::vec(0u8..7, 1..7),
        1u8..=31,
    )
        .prop_map(|(kind, time, days, day)| RecurrencePattern {
            kind,
            time,
            days_of_week: Some(days),
            day_of_month: Some(day),
            end_date: None,
        })
}

fn arb_wall_clock() -> impl Strategy<Value = WallClock> {
    (-12 * 60..=14 * 60i32)
        .prop_map(|minutes| WallClock::fixed_minutes(minutes).unwrap_or_else(WallClock::utc))
}

proptest! {
    #[test]
    fn next_occurrence_is_deterministic(
        pattern in arb_pattern(),
        now in MIN_NOW..MAX_NOW,
        clock in arb_wall_clock(),
    ) {
        let first = clock.next_occurrence(&pattern, now);
        let second = clock.next_occurrence(&pattern, now);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn next_occurrence_is_in_the_future(
        pattern in arb_pattern(),
        now in MIN_NOW..MAX_NOW,
        clock in arb_wall_clock(),
    ) {
        let next = clock.next_occurrence(&pattern, now);
        prop_assert!(next.is_some(), "valid pattern produced nothing: {:?}", pattern);
        prop_assert!(next.unwrap_or(i64::MIN) > now);
    }

    #[test]
    fn next_occurrence_is_within_a_few_months(
        pattern in arb_pattern(),
        now in MIN_NOW..MAX_NOW,
        clock in arb_wall_clock(),
    ) {
        // Monthly overflow is the widest jump: at most two calendar months.
        let limit = now + 70 * 24 * 60 * 60 * 1000;
        if let Some(next) = clock.next_occurrence(&pattern, now) {
            prop_assert!(next <= limit);
        }
    }

    #[test]
    fn end_date_terminates_every_series(
        pattern in arb_pattern(),
        now in MIN_NOW..MAX_NOW,
        back in 0i64..10_000_000_000,
        clock in arb_wall_clock(),
    ) {
        let ended = pattern.until(now - back);
        prop_assert_eq!(clock.next_occurrence(&ended, now), None);
    }

    #[test]
    fn end_date_in_the_future_changes_nothing(
        pattern in arb_pattern(),
        now in MIN_NOW..MAX_NOW,
        ahead in 1i64..10_000_000_000,
        clock in arb_wall_clock(),
    ) {
        let open = clock.next_occurrence(&pattern, now);
        let bounded = clock.next_occurrence(&pattern.clone().until(now + ahead), now);
        prop_assert_eq!(open, bounded);
    }
}
