use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::Assignment;

/// Query parameter names the payment processor uses interchangeably on the
/// return redirect.
pub const REFERENCE_PARAM_ALIASES: [&str; 2] = ["reference", "trxref"];

/// Payment gate for late submissions, modeled as an explicit state machine
/// with pure transitions. The gate layers on top of eligibility: it never
/// makes an ineligible submission eligible, it only withholds an eligible
/// late submission until the fee clears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LateFeeGate {
    /// No fee stands between the student and the submit action.
    NotRequired,
    /// The deadline has passed, a fee is required, and nothing has been
    /// submitted or paid yet.
    AwaitingPayment { fee_cents: u32 },
    /// The student has been redirected to the payment processor.
    PaymentInFlight { fee_cents: u32 },
    /// Payment verified. The gate stays open for the rest of the session.
    Unlocked,
}

/// Events fed into [`LateFeeGate::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    PaymentStarted,
    PaymentFailed,
    PaymentVerified,
    VerificationFailed,
}

impl LateFeeGate {
    /// Derive the gate from assignment policy and submission state. `paid`
    /// is the externally verified flag from the coursework backend or the
    /// current session; it is never computed locally. A fee only stands
    /// when the late path itself is open: a window closed for good has
    /// nothing to buy.
    pub fn assess(
        assignment: &Assignment,
        has_submission: bool,
        paid: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let past_deadline = now > assignment.deadline;
        let late_path_open = assignment.allow_late_submission && assignment.payment_required;
        if !past_deadline || !late_path_open || has_submission {
            return LateFeeGate::NotRequired;
        }
        if paid {
            return LateFeeGate::Unlocked;
        }
        LateFeeGate::AwaitingPayment {
            fee_cents: assignment.payment_amount_cents,
        }
    }

    /// Pure transition function. Terminal states absorb every event: once
    /// unlocked, the gate does not re-lock for the session, and a gate that
    /// was never required cannot start demanding payment mid-flow.
    pub fn apply(self, event: GateEvent) -> Self {
        match (self, event) {
            (LateFeeGate::AwaitingPayment { fee_cents }, GateEvent::PaymentStarted) => {
                LateFeeGate::PaymentInFlight { fee_cents }
            }
            (LateFeeGate::PaymentInFlight { .. }, GateEvent::PaymentVerified) => {
                LateFeeGate::Unlocked
            }
            (
                LateFeeGate::PaymentInFlight { fee_cents },
                GateEvent::PaymentFailed | GateEvent::VerificationFailed,
            ) => LateFeeGate::AwaitingPayment { fee_cents },
            (state, _) => state,
        }
    }

    pub const fn is_unlocked(&self) -> bool {
        matches!(self, LateFeeGate::Unlocked)
    }

    pub const fn awaiting_payment(&self) -> Option<u32> {
        match self {
            LateFeeGate::AwaitingPayment { fee_cents } => Some(*fee_cents),
            _ => None,
        }
    }

    /// Fee still standing between the student and the submit action, for
    /// both the awaiting and in-flight legs.
    pub const fn blocking_fee(&self) -> Option<u32> {
        match self {
            LateFeeGate::AwaitingPayment { fee_cents }
            | LateFeeGate::PaymentInFlight { fee_cents } => Some(*fee_cents),
            LateFeeGate::NotRequired | LateFeeGate::Unlocked => None,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            LateFeeGate::NotRequired => "not_required",
            LateFeeGate::AwaitingPayment { .. } => "awaiting_payment",
            LateFeeGate::PaymentInFlight { .. } => "payment_in_flight",
            LateFeeGate::Unlocked => "unlocked",
        }
    }
}

/// Pull the payment reference out of a return-redirect query string,
/// returning the query with the parameter removed. Callers replace the
/// visible query with the stripped remainder so a page refresh cannot
/// replay the reference.
pub fn take_payment_reference(query: &str) -> (Option<String>, String) {
    let mut reference = None;
    let mut remaining = Vec::new();

    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (name, value) = match pair.split_once('=') {
            Some((name, value)) => (name, value),
            None => (pair, ""),
        };

        if REFERENCE_PARAM_ALIASES.contains(&name) && !value.is_empty() {
            if reference.is_none() {
                reference = Some(value.to_string());
            }
            continue;
        }

        remaining.push(pair);
    }

    (reference, remaining.join("&"))
}
