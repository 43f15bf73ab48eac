//! # Participation Ledger
//!
//! Pure transition policy for a single (user, event) participation. The
//! database layer reads the current participation and the event counters
//! under a row lock, asks this module what to do, and writes the result in
//! the same transaction.
//!
//! ## Rules
//!
//! - Joining a full event fails before anything is written.
//! - Entering `joined` from any other state (or from no record) takes a slot.
//! - Leaving `joined` releases a slot; the counter never drops below zero.
//! - Every other transition leaves the counter alone.

use crate::errors::{EventError, EventResult};
use crate::models::participation::{JoinOutcome, ParticipationStatus, SkipOutcome};

/// A planned change to one participation record and its event counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Status before the change, `None` when no record exists yet.
    pub from: Option<ParticipationStatus>,
    pub to: ParticipationStatus,
    /// Counter adjustment, always -1, 0 or +1.
    pub delta: i32,
}

impl Transition {
    /// True when the record must be inserted rather than updated.
    pub fn creates_record(&self) -> bool {
        self.from.is_none()
    }

    /// True when neither the record nor the counter change.
    pub fn is_noop(&self) -> bool {
        self.from == Some(self.to) && self.delta == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinPlan {
    pub transition: Transition,
    pub outcome: JoinOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipPlan {
    pub transition: Transition,
    pub outcome: SkipOutcome,
}

/// An event is full once the counter reaches capacity.
pub fn is_at_capacity(current_participants: i32, max_participants: i32) -> bool {
    current_participants >= max_participants
}

/// Plans a join given the caller's current participation and the event's counters.
///
/// # Errors
///
/// * `EventError::Capacity` - the event is already at capacity
pub fn plan_join(
    current: Option<ParticipationStatus>,
    current_participants: i32,
    max_participants: i32,
) -> EventResult<JoinPlan> {
    if is_at_capacity(current_participants, max_participants) {
        return Err(EventError::Capacity("Event is full".to_string()));
    }

    let plan = match current {
        Some(ParticipationStatus::Joined) => JoinPlan {
            transition: Transition {
                from: current,
                to: ParticipationStatus::Joined,
                delta: 0,
            },
            outcome: JoinOutcome::AlreadyJoined,
        },
        None | Some(ParticipationStatus::Skipped) | Some(ParticipationStatus::Pending) => {
            JoinPlan {
                transition: Transition {
                    from: current,
                    to: ParticipationStatus::Joined,
                    delta: 1,
                },
                outcome: JoinOutcome::Joined,
            }
        }
    };

    Ok(plan)
}

/// Plans a skip. Skipping never fails once the event exists.
pub fn plan_skip(current: Option<ParticipationStatus>, current_participants: i32) -> SkipPlan {
    let delta = match current {
        Some(status) if status.holds_slot() && current_participants > 0 => -1,
        _ => 0,
    };

    SkipPlan {
        transition: Transition {
            from: current,
            to: ParticipationStatus::Skipped,
            delta,
        },
        outcome: SkipOutcome::Skipped,
    }
}

/// Applies a counter delta, flooring the result at zero.
pub fn apply_delta(current_participants: i32, delta: i32) -> i32 {
    current_participants.saturating_add(delta).max(0)
}
