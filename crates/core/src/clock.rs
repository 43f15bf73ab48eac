//! # Status Clock
//!
//! Maps an event's calendar date to its temporal status. Callers supply
//! `today` so the mapping stays pure; the API derives it from the configured
//! timezone.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::models::event::EventStatus;

/// Computes the status of an event dated `event_date` as seen on `today`.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use eventdesk_core::clock::compute_status;
/// use eventdesk_core::models::event::EventStatus;
///
/// let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
/// assert_eq!(compute_status(today, today), EventStatus::Ongoing);
/// ```
pub fn compute_status(event_date: NaiveDate, today: NaiveDate) -> EventStatus {
    match event_date.cmp(&today) {
        Ordering::Less => EventStatus::Past,
        Ordering::Equal => EventStatus::Ongoing,
        Ordering::Greater => EventStatus::Upcoming,
    }
}

/// Returns the recomputed status only when it differs from `stored`.
pub fn status_change(
    stored: EventStatus,
    event_date: NaiveDate,
    today: NaiveDate,
) -> Option<EventStatus> {
    let fresh = compute_status(event_date, today);
    (fresh != stored).then_some(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[rstest]
    #[case(day(9), EventStatus::Past)]
    #[case(day(10), EventStatus::Ongoing)]
    #[case(day(11), EventStatus::Upcoming)]
    fn status_follows_date(#[case] date: NaiveDate, #[case] expected: EventStatus) {
        assert_eq!(compute_status(date, day(10)), expected);
    }

    #[test]
    fn unchanged_status_yields_no_change() {
        assert_eq!(status_change(EventStatus::Upcoming, day(20), day(10)), None);
        assert_eq!(
            status_change(EventStatus::Upcoming, day(10), day(10)),
            Some(EventStatus::Ongoing)
        );
    }
}
