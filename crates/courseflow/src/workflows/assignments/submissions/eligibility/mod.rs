mod policy;
mod rules;

pub use policy::SubmissionWindow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Assignment, AssignmentId};
use policy::decide_window;
use rules::window_signals;

/// Eligibility read for one assignment at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityOutcome {
    pub assignment_id: AssignmentId,
    pub window: SubmissionWindow,
    pub message: String,
}

impl EligibilityOutcome {
    pub fn can_submit(&self) -> bool {
        self.window.permits_submission()
    }
}

/// Evaluate the submission window for an assignment. Branch order matches
/// the policy the coursework backend enforces: an unopened assignment wins
/// over everything, then late allowance grants unconditional eligibility,
/// then the deadline applies.
pub fn evaluate(assignment: &Assignment, now: DateTime<Utc>) -> EligibilityOutcome {
    let signals = window_signals(assignment, now);
    let window = decide_window(assignment, &signals);
    let message = window.message();

    EligibilityOutcome {
        assignment_id: assignment.id.clone(),
        window,
        message,
    }
}
