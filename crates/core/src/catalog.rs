//! # Event Catalog
//!
//! Filtering and viewer decoration applied to an already refreshed, ordered
//! event listing.

use std::collections::HashMap;
use uuid::Uuid;

use crate::models::event::{Event, EventStatus, StudentEventResponse};
use crate::models::participation::ParticipationStatus;

/// Status filter accepted by the public event listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    /// `ongoing` in the public filter means "not yet past".
    Active,
    Exact(EventStatus),
    /// An unrecognised value; matches nothing.
    Unmatched,
}

impl StatusFilter {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => StatusFilter::All,
            Some("ongoing") => StatusFilter::Active,
            Some(other) => other
                .parse::<EventStatus>()
                .map(StatusFilter::Exact)
                .unwrap_or(StatusFilter::Unmatched),
        }
    }

    pub fn matches(&self, status: EventStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => matches!(status, EventStatus::Upcoming | EventStatus::Ongoing),
            StatusFilter::Exact(expected) => *expected == status,
            StatusFilter::Unmatched => false,
        }
    }
}

/// Keeps the events matching `filter`, preserving order.
pub fn filter_events(events: Vec<Event>, filter: StatusFilter) -> Vec<Event> {
    events
        .into_iter()
        .filter(|event| filter.matches(event.status))
        .collect()
}

/// Pairs each event with the viewer's participation status, defaulting to pending.
pub fn with_viewer_status(
    events: Vec<Event>,
    statuses: &HashMap<Uuid, ParticipationStatus>,
) -> Vec<StudentEventResponse> {
    events
        .into_iter()
        .map(|event| {
            let user_participation_status = statuses
                .get(&event.id)
                .copied()
                .unwrap_or(ParticipationStatus::Pending);
            StudentEventResponse {
                event,
                user_participation_status,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, StatusFilter::All)]
    #[case(Some(""), StatusFilter::All)]
    #[case(Some("ongoing"), StatusFilter::Active)]
    #[case(Some("upcoming"), StatusFilter::Exact(EventStatus::Upcoming))]
    #[case(Some("past"), StatusFilter::Exact(EventStatus::Past))]
    #[case(Some("cancelled"), StatusFilter::Unmatched)]
    fn parses_query_values(#[case] raw: Option<&str>, #[case] expected: StatusFilter) {
        assert_eq!(StatusFilter::parse(raw), expected);
    }

    #[test]
    fn active_filter_excludes_only_past() {
        let filter = StatusFilter::Active;
        assert!(filter.matches(EventStatus::Upcoming));
        assert!(filter.matches(EventStatus::Ongoing));
        assert!(!filter.matches(EventStatus::Past));
    }
}
