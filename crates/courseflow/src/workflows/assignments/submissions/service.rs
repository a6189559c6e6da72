use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::collaborators::{
    ClientError, CourseworkClient, PaymentError, PaymentGateway, PaymentRequest, PaymentSession,
};
use super::domain::{
    Assignment, AssignmentId, EditPermission, StudentId, SubmissionDraft, SubmissionRecord,
};
use super::eligibility::{self, EligibilityOutcome};
use super::gate::{take_payment_reference, GateEvent, LateFeeGate};
use super::payload::{build_payload, PayloadError};

/// Session-scoped gate bookkeeping for one assignment. `handled_references`
/// makes return-redirect verification one-shot: a refreshed return page
/// finds its reference already recorded and skips the gateway call.
#[derive(Debug, Default, Clone)]
struct GateSession {
    unlocked: bool,
    in_flight: bool,
    handled_references: HashSet<String>,
}

/// Everything the submission page needs in one read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionContext {
    pub assignment: Assignment,
    pub submission: Option<SubmissionRecord>,
    pub has_paid: bool,
    pub edit_permission: EditPermission,
    pub eligibility: EligibilityOutcome,
    pub gate: LateFeeGate,
}

/// Result of handling a payment return redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReturnOutcome {
    pub reference: String,
    pub verified: bool,
    pub message: String,
    pub gate: LateFeeGate,
    /// Query string with the reference parameter removed; the caller swaps
    /// this into the address bar so a refresh cannot replay the reference.
    pub remaining_query: String,
}

/// Service composing the eligibility evaluator, the payload builder, and
/// the late-fee gate over the coursework and payment collaborators.
pub struct SubmissionWorkflowService<C, P> {
    client: Arc<C>,
    payments: Arc<P>,
    gates: Mutex<HashMap<AssignmentId, GateSession>>,
}

impl<C, P> SubmissionWorkflowService<C, P>
where
    C: CourseworkClient + 'static,
    P: PaymentGateway + 'static,
{
    pub fn new(client: Arc<C>, payments: Arc<P>) -> Self {
        Self {
            client,
            payments,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Assemble the full submission context for one assignment and student.
    pub fn context(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
        now: DateTime<Utc>,
    ) -> Result<SubmissionContext, SubmissionWorkflowError> {
        let assignment = self.client.fetch_assignment(assignment_id)?;
        let snapshot = self.client.fetch_submission(assignment_id, student_id)?;

        let edit_permission = if snapshot.submission.is_some() {
            self.client.fetch_edit_permission(assignment_id, student_id)?
        } else {
            EditPermission::missing_submission()
        };

        let eligibility = eligibility::evaluate(&assignment, now);
        let gate = self.assess_gate(
            &assignment,
            snapshot.submission.is_some(),
            snapshot.has_paid,
            now,
        );

        Ok(SubmissionContext {
            assignment,
            submission: snapshot.submission,
            has_paid: snapshot.has_paid || self.session_unlocked(assignment_id),
            edit_permission,
            eligibility,
            gate,
        })
    }

    /// Validate a draft and persist it, creating on first submit and
    /// updating thereafter. The update path defers entirely to the
    /// backend's edit ruling.
    pub fn submit(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
        draft: SubmissionDraft,
        now: DateTime<Utc>,
    ) -> Result<SubmissionRecord, SubmissionWorkflowError> {
        let assignment = self.client.fetch_assignment(assignment_id)?;
        let payload = build_payload(assignment.submission_mode, draft)?;

        let outcome = eligibility::evaluate(&assignment, now);
        if !outcome.can_submit() {
            return Err(SubmissionWorkflowError::NotEligible {
                message: outcome.message,
            });
        }

        let snapshot = self.client.fetch_submission(assignment_id, student_id)?;

        let gate = self.assess_gate(
            &assignment,
            snapshot.submission.is_some(),
            snapshot.has_paid,
            now,
        );
        if let Some(fee_cents) = gate.blocking_fee() {
            return Err(SubmissionWorkflowError::PaymentRequired { fee_cents });
        }

        if snapshot.submission.is_some() {
            let permission = self.client.fetch_edit_permission(assignment_id, student_id)?;
            if !permission.allowed {
                return Err(SubmissionWorkflowError::EditDenied {
                    reason: permission.reason,
                });
            }
            let record = self
                .client
                .update_submission(assignment_id, student_id, payload)?;
            info!(assignment = %assignment_id.0, "submission updated");
            return Ok(record);
        }

        let record = self
            .client
            .create_submission(assignment_id, student_id, payload)?;
        info!(assignment = %assignment_id.0, "submission created");
        Ok(record)
    }

    /// Start the late-fee payment. Only legal while a fee still blocks
    /// submission; a gateway failure leaves the gate where it was so the
    /// student can retry.
    pub fn begin_payment(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
        now: DateTime<Utc>,
    ) -> Result<PaymentSession, SubmissionWorkflowError> {
        let assignment = self.client.fetch_assignment(assignment_id)?;
        let snapshot = self.client.fetch_submission(assignment_id, student_id)?;

        // A student can re-initiate from the in-flight leg as well, covering
        // an abandoned checkout tab; only paid or fee-free gates refuse.
        let gate = self.assess_gate(
            &assignment,
            snapshot.submission.is_some(),
            snapshot.has_paid,
            now,
        );
        let fee_cents = gate
            .blocking_fee()
            .ok_or(SubmissionWorkflowError::NoPaymentDue)?;

        let session = self.payments.initialize_late_payment(PaymentRequest {
            assignment_id: assignment_id.clone(),
            student_id: student_id.clone(),
            amount_cents: fee_cents,
        })?;

        {
            let mut gates = self.gates.lock().expect("gate ledger mutex poisoned");
            gates.entry(assignment_id.clone()).or_default().in_flight = true;
        }

        info!(assignment = %assignment_id.0, reference = %session.reference, "late fee payment initialized");
        Ok(session)
    }

    /// Handle the processor's return redirect. A reference is consumed at
    /// most once per session, but only a verification *outcome* consumes it:
    /// a replayed reference short-circuits with the recorded state, while a
    /// transport failure propagates before anything is recorded so the same
    /// return URL stays retriable.
    pub fn handle_payment_return(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentReturnOutcome, SubmissionWorkflowError> {
        let (reference, remaining_query) = take_payment_reference(query);
        let reference = reference.ok_or(SubmissionWorkflowError::MissingReference)?;

        let already_handled = {
            let gates = self.gates.lock().expect("gate ledger mutex poisoned");
            gates
                .get(assignment_id)
                .filter(|session| session.handled_references.contains(&reference))
                .map(|session| session.unlocked)
        };

        if let Some(unlocked) = already_handled {
            let gate = if unlocked {
                LateFeeGate::Unlocked
            } else {
                self.reassess_locked(assignment_id, student_id, now)?
            };
            return Ok(PaymentReturnOutcome {
                reference,
                verified: unlocked,
                message: "payment reference already handled".to_string(),
                gate,
                remaining_query,
            });
        }

        let verification = self.payments.verify_payment(&reference)?;

        {
            let mut gates = self.gates.lock().expect("gate ledger mutex poisoned");
            let session = gates.entry(assignment_id.clone()).or_default();
            session.handled_references.insert(reference.clone());
            if verification.success {
                session.unlocked = true;
            }
            session.in_flight = false;
        }

        if verification.success {
            info!(assignment = %assignment_id.0, reference = %reference, "late fee payment verified");
            return Ok(PaymentReturnOutcome {
                reference,
                verified: true,
                message: verification.message,
                gate: LateFeeGate::Unlocked,
                remaining_query,
            });
        }

        warn!(assignment = %assignment_id.0, reference = %reference, "late fee verification failed");
        let gate = self.reassess_locked(assignment_id, student_id, now)?;
        Ok(PaymentReturnOutcome {
            reference,
            verified: false,
            message: verification.message,
            gate,
            remaining_query,
        })
    }

    /// Gate assessment honoring the session ledger: once a payment has been
    /// verified in this session the gate stays unlocked, whatever a fresh
    /// policy read would say, and an initialized-but-unverified payment
    /// shows as in flight.
    fn assess_gate(
        &self,
        assignment: &Assignment,
        has_submission: bool,
        has_paid: bool,
        now: DateTime<Utc>,
    ) -> LateFeeGate {
        let (unlocked, in_flight) = {
            let gates = self.gates.lock().expect("gate ledger mutex poisoned");
            gates
                .get(&assignment.id)
                .map(|session| (session.unlocked, session.in_flight))
                .unwrap_or((false, false))
        };

        if unlocked {
            return LateFeeGate::Unlocked;
        }

        let gate = LateFeeGate::assess(assignment, has_submission, has_paid, now);
        if in_flight {
            return gate.apply(GateEvent::PaymentStarted);
        }
        gate
    }

    fn session_unlocked(&self, assignment_id: &AssignmentId) -> bool {
        let gates = self.gates.lock().expect("gate ledger mutex poisoned");
        gates
            .get(assignment_id)
            .map(|session| session.unlocked)
            .unwrap_or(false)
    }

    /// Fresh gate read after a failed or replayed verification; falls back
    /// to awaiting-payment when the fee is still owed.
    fn reassess_locked(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
        now: DateTime<Utc>,
    ) -> Result<LateFeeGate, SubmissionWorkflowError> {
        let assignment = self.client.fetch_assignment(assignment_id)?;
        let snapshot = self.client.fetch_submission(assignment_id, student_id)?;
        // Started-then-failed lands back on the assessed state, so a plain
        // reassessment is the round trip through the machine.
        Ok(LateFeeGate::assess(
            &assignment,
            snapshot.submission.is_some(),
            snapshot.has_paid,
            now,
        ))
    }
}

/// Error raised by the submission workflow.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionWorkflowError {
    #[error(transparent)]
    Validation(#[from] PayloadError),
    #[error("{message}")]
    NotEligible { message: String },
    #[error("editing is not allowed: {reason}")]
    EditDenied { reason: String },
    #[error("a late submission fee of {fee_cents} cents is required before submitting")]
    PaymentRequired { fee_cents: u32 },
    #[error("no late submission fee is currently due")]
    NoPaymentDue,
    #[error("no payment reference found in the return redirect")]
    MissingReference,
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
}
