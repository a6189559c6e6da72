use serde::{Deserialize, Serialize};

use super::domain::{
    Assignment, AssignmentId, EditPermission, StudentId, SubmissionPayload, SubmissionRecord,
};

/// What the coursework backend knows about a student's submission. Absence
/// of a submission is a normal state, not an error. `has_paid` is the
/// backend's verified record of a cleared late fee; the workflow trusts it
/// outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionSnapshot {
    pub submission: Option<SubmissionRecord>,
    pub has_paid: bool,
}

/// Boundary to the coursework REST backend. Implementations own transport
/// and persistence; the workflow only sequences the calls.
pub trait CourseworkClient: Send + Sync {
    fn fetch_assignment(&self, id: &AssignmentId) -> Result<Assignment, ClientError>;

    fn fetch_submission(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
    ) -> Result<SubmissionSnapshot, ClientError>;

    /// The backend alone decides whether an existing submission may still
    /// be edited. Its ruling is surfaced verbatim and never recomputed from
    /// deadlines on this side.
    fn fetch_edit_permission(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
    ) -> Result<EditPermission, ClientError>;

    fn create_submission(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
        payload: SubmissionPayload,
    ) -> Result<SubmissionRecord, ClientError>;

    fn update_submission(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
        payload: SubmissionPayload,
    ) -> Result<SubmissionRecord, ClientError>;
}

/// Error enumeration for coursework backend failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("assignment not found")]
    AssignmentNotFound,
    #[error("submission not found")]
    SubmissionNotFound,
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("coursework backend unavailable: {0}")]
    Unavailable(String),
}

/// Fee charge request sent to the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub assignment_id: AssignmentId,
    pub student_id: StudentId,
    pub amount_cents: u32,
}

/// Successful initialization: the student's browser is sent to
/// `authorization_url`, and the processor redirects back carrying
/// `reference`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub authorization_url: String,
    pub reference: String,
}

/// Outcome of a verification round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVerification {
    pub success: bool,
    pub message: String,
}

/// Boundary to the external payment processor.
pub trait PaymentGateway: Send + Sync {
    fn initialize_late_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentSession, PaymentError>;

    fn verify_payment(&self, reference: &str) -> Result<PaymentVerification, PaymentError>;
}

/// Transport-level payment failure; the charge itself failing is reported
/// through [`PaymentVerification::success`] instead.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment processor unavailable: {0}")]
    Transport(String),
}
