use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::domain::Assignment;
use super::rules::WindowSignals;

/// Verdict on whether the submission window admits a first-time submission.
/// The boolean gate and the student-facing explanation both derive from the
/// same variant, so they cannot disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionWindow {
    /// The assignment has not opened yet.
    NotYetOpen { opens_at: DateTime<Utc> },
    /// Inside the regular window.
    Open { closes_at: DateTime<Utc> },
    /// Past the deadline with late submission allowed. There is no ceiling
    /// on lateness: this variant holds however far past the deadline the
    /// clock has moved.
    LateAccepted { fee_cents: Option<u32> },
    /// Past the deadline with late submission disallowed.
    Closed { closed_at: DateTime<Utc> },
}

impl SubmissionWindow {
    pub const fn permits_submission(&self) -> bool {
        matches!(
            self,
            SubmissionWindow::Open { .. } | SubmissionWindow::LateAccepted { .. }
        )
    }

    pub fn message(&self) -> String {
        match self {
            SubmissionWindow::NotYetOpen { opens_at } => format!(
                "This assignment has not started yet. Submissions open on {}.",
                opens_at.format("%Y-%m-%d %H:%M UTC")
            ),
            SubmissionWindow::Open { closes_at } => format!(
                "Submissions are open until {}.",
                closes_at.format("%Y-%m-%d %H:%M UTC")
            ),
            SubmissionWindow::LateAccepted { fee_cents: None } => {
                "The deadline has passed, but late submissions are accepted.".to_string()
            }
            SubmissionWindow::LateAccepted {
                fee_cents: Some(fee),
            } => format!(
                "The deadline has passed. Late submissions are accepted after a fee of {} is paid.",
                format_cents(*fee)
            ),
            SubmissionWindow::Closed { closed_at } => format!(
                "The deadline passed on {} and this assignment does not accept late submissions.",
                closed_at.format("%Y-%m-%d %H:%M UTC")
            ),
        }
    }
}

pub(crate) fn decide_window(assignment: &Assignment, signals: &WindowSignals) -> SubmissionWindow {
    if !signals.opened {
        return SubmissionWindow::NotYetOpen {
            opens_at: assignment.start_date,
        };
    }

    if !signals.past_deadline {
        return SubmissionWindow::Open {
            closes_at: assignment.deadline,
        };
    }

    if assignment.allow_late_submission {
        return SubmissionWindow::LateAccepted {
            fee_cents: assignment.late_fee_cents(),
        };
    }

    SubmissionWindow::Closed {
        closed_at: assignment.deadline,
    }
}

pub(crate) fn format_cents(cents: u32) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}
