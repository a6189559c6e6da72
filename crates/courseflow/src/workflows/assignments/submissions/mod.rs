//! Submission workflow: eligibility windows, edit authority, the late-fee
//! payment gate, and payload validation, composed over the coursework and
//! payment collaborators.

pub mod collaborators;
pub mod domain;
pub mod eligibility;
pub mod gate;
pub mod payload;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use collaborators::{
    ClientError, CourseworkClient, PaymentError, PaymentGateway, PaymentRequest, PaymentSession,
    PaymentVerification, SubmissionSnapshot,
};
pub use domain::{
    ArchiveRef, Assignment, AssignmentId, CodeBundle, EditPermission, StudentId, SubmissionDraft,
    SubmissionKind, SubmissionMode, SubmissionPayload, SubmissionRecord, SubmissionStatus,
};
pub use eligibility::{evaluate, EligibilityOutcome, SubmissionWindow};
pub use gate::{take_payment_reference, GateEvent, LateFeeGate, REFERENCE_PARAM_ALIASES};
pub use payload::{build_payload, PayloadError};
pub use router::submission_router;
pub use service::{
    PaymentReturnOutcome, SubmissionContext, SubmissionWorkflowError, SubmissionWorkflowService,
};
