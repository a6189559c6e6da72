use chrono::{DateTime, Utc};

use super::super::domain::Assignment;

/// Raw timing facts the policy layer turns into a verdict.
pub(crate) struct WindowSignals {
    pub opened: bool,
    pub past_deadline: bool,
}

pub(crate) fn window_signals(assignment: &Assignment, now: DateTime<Utc>) -> WindowSignals {
    WindowSignals {
        opened: now >= assignment.start_date,
        past_deadline: now > assignment.deadline,
    }
}
