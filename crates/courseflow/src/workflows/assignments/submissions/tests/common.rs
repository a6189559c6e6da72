use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::workflows::assignments::submissions::collaborators::{
    ClientError, CourseworkClient, PaymentError, PaymentGateway, PaymentRequest, PaymentSession,
    PaymentVerification, SubmissionSnapshot,
};
use crate::workflows::assignments::submissions::domain::{
    ArchiveRef, Assignment, AssignmentId, EditPermission, StudentId, SubmissionDraft,
    SubmissionKind, SubmissionMode, SubmissionPayload, SubmissionRecord, SubmissionStatus,
};
use crate::workflows::assignments::submissions::{submission_router, SubmissionWorkflowService};

/// Fixture anchor. Router handlers read the wall clock, so the fixture
/// windows are laid out around it with day-sized margins.
pub(super) fn base_time() -> DateTime<Utc> {
    Utc::now()
}

pub(super) fn student() -> StudentId {
    StudentId("stu-001".to_string())
}

/// Window open: started yesterday, due tomorrow, no late submissions.
pub(super) fn open_assignment() -> Assignment {
    Assignment {
        id: AssignmentId("asg-open".to_string()),
        title: "Portfolio landing page".to_string(),
        start_date: base_time() - Duration::days(1),
        deadline: base_time() + Duration::days(1),
        allow_late_submission: false,
        payment_required: false,
        payment_amount_cents: 0,
        max_score: 100,
        submission_mode: SubmissionMode::Both,
    }
}

/// Deadline passed two days ago; late submissions accepted without a fee.
pub(super) fn late_allowed_assignment() -> Assignment {
    Assignment {
        id: AssignmentId("asg-late".to_string()),
        title: "Responsive grid exercise".to_string(),
        start_date: base_time() - Duration::days(10),
        deadline: base_time() - Duration::days(2),
        allow_late_submission: true,
        payment_required: false,
        payment_amount_cents: 0,
        max_score: 50,
        submission_mode: SubmissionMode::Both,
    }
}

/// Deadline passed; late submissions accepted once the fee clears.
pub(super) fn fee_assignment() -> Assignment {
    Assignment {
        id: AssignmentId("asg-fee".to_string()),
        title: "Capstone project".to_string(),
        start_date: base_time() - Duration::days(30),
        deadline: base_time() - Duration::days(3),
        allow_late_submission: true,
        payment_required: true,
        payment_amount_cents: 1500,
        max_score: 100,
        submission_mode: SubmissionMode::Both,
    }
}

/// Deadline passed and late submissions are not accepted at all.
pub(super) fn closed_assignment() -> Assignment {
    Assignment {
        id: AssignmentId("asg-closed".to_string()),
        title: "Accessibility audit".to_string(),
        start_date: base_time() - Duration::days(14),
        deadline: base_time() - Duration::days(2),
        allow_late_submission: false,
        payment_required: false,
        payment_amount_cents: 0,
        max_score: 40,
        submission_mode: SubmissionMode::Both,
    }
}

pub(super) fn code_draft() -> SubmissionDraft {
    SubmissionDraft {
        kind: Some(SubmissionKind::Code),
        html: Some("<main>hello</main>".to_string()),
        css: Some("main { color: teal; }".to_string()),
        javascript: None,
        ..SubmissionDraft::default()
    }
}

pub(super) fn link_draft() -> SubmissionDraft {
    SubmissionDraft {
        kind: Some(SubmissionKind::Link),
        submission_link: Some("https://example.com/demo".to_string()),
        ..SubmissionDraft::default()
    }
}

pub(super) fn zip_draft() -> SubmissionDraft {
    SubmissionDraft {
        kind: Some(SubmissionKind::Zip),
        zip_file: Some(ArchiveRef {
            file_name: "solution.zip".to_string(),
            storage_key: "uploads/stu-001/solution.zip".to_string(),
        }),
        ..SubmissionDraft::default()
    }
}

type SubmissionKey = (AssignmentId, StudentId);

/// In-memory coursework backend double recording writes and serving
/// scripted edit rulings and payment flags.
#[derive(Default)]
pub(super) struct MemoryCoursework {
    assignments: Mutex<HashMap<AssignmentId, Assignment>>,
    submissions: Mutex<HashMap<SubmissionKey, SubmissionRecord>>,
    paid: Mutex<HashSet<SubmissionKey>>,
    edit_rulings: Mutex<HashMap<SubmissionKey, EditPermission>>,
    pub(super) creates: Mutex<u32>,
    pub(super) updates: Mutex<u32>,
}

impl MemoryCoursework {
    pub(super) fn with_assignments(assignments: Vec<Assignment>) -> Self {
        let backend = Self::default();
        {
            let mut guard = backend.assignments.lock().expect("assignment mutex poisoned");
            for assignment in assignments {
                guard.insert(assignment.id.clone(), assignment);
            }
        }
        backend
    }

    pub(super) fn set_edit_ruling(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
        ruling: EditPermission,
    ) {
        self.edit_rulings
            .lock()
            .expect("ruling mutex poisoned")
            .insert((assignment_id.clone(), student_id.clone()), ruling);
    }

    pub(super) fn mark_paid(&self, assignment_id: &AssignmentId, student_id: &StudentId) {
        self.paid
            .lock()
            .expect("paid mutex poisoned")
            .insert((assignment_id.clone(), student_id.clone()));
    }

    pub(super) fn set_status(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
        status: SubmissionStatus,
    ) {
        let mut guard = self.submissions.lock().expect("submission mutex poisoned");
        if let Some(record) = guard.get_mut(&(assignment_id.clone(), student_id.clone())) {
            record.status = status;
        }
    }
}

impl CourseworkClient for MemoryCoursework {
    fn fetch_assignment(&self, id: &AssignmentId) -> Result<Assignment, ClientError> {
        self.assignments
            .lock()
            .expect("assignment mutex poisoned")
            .get(id)
            .cloned()
            .ok_or(ClientError::AssignmentNotFound)
    }

    fn fetch_submission(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
    ) -> Result<SubmissionSnapshot, ClientError> {
        let submission = self
            .submissions
            .lock()
            .expect("submission mutex poisoned")
            .get(&(assignment_id.clone(), student_id.clone()))
            .cloned();
        let has_paid = self
            .paid
            .lock()
            .expect("paid mutex poisoned")
            .contains(&(assignment_id.clone(), student_id.clone()));
        Ok(SubmissionSnapshot {
            submission,
            has_paid,
        })
    }

    fn fetch_edit_permission(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
    ) -> Result<EditPermission, ClientError> {
        Ok(self
            .edit_rulings
            .lock()
            .expect("ruling mutex poisoned")
            .get(&(assignment_id.clone(), student_id.clone()))
            .cloned()
            .unwrap_or(EditPermission {
                allowed: true,
                reason: "within edit window".to_string(),
            }))
    }

    fn create_submission(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
        payload: SubmissionPayload,
    ) -> Result<SubmissionRecord, ClientError> {
        *self.creates.lock().expect("create counter poisoned") += 1;
        let record = SubmissionRecord {
            assignment_id: assignment_id.clone(),
            student_id: student_id.clone(),
            payload,
            status: SubmissionStatus::Pending,
            submitted_at: base_time(),
            updated_at: base_time(),
        };
        self.submissions
            .lock()
            .expect("submission mutex poisoned")
            .insert((assignment_id.clone(), student_id.clone()), record.clone());
        Ok(record)
    }

    fn update_submission(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
        payload: SubmissionPayload,
    ) -> Result<SubmissionRecord, ClientError> {
        *self.updates.lock().expect("update counter poisoned") += 1;
        let mut guard = self.submissions.lock().expect("submission mutex poisoned");
        let record = guard
            .get_mut(&(assignment_id.clone(), student_id.clone()))
            .ok_or(ClientError::SubmissionNotFound)?;
        record.payload = payload;
        record.updated_at = base_time() + Duration::hours(1);
        Ok(record.clone())
    }
}

/// Coursework double whose every call fails, for outage propagation tests.
pub(super) struct UnavailableCoursework;

impl CourseworkClient for UnavailableCoursework {
    fn fetch_assignment(&self, _id: &AssignmentId) -> Result<Assignment, ClientError> {
        Err(ClientError::Unavailable("backend offline".to_string()))
    }

    fn fetch_submission(
        &self,
        _assignment_id: &AssignmentId,
        _student_id: &StudentId,
    ) -> Result<SubmissionSnapshot, ClientError> {
        Err(ClientError::Unavailable("backend offline".to_string()))
    }

    fn fetch_edit_permission(
        &self,
        _assignment_id: &AssignmentId,
        _student_id: &StudentId,
    ) -> Result<EditPermission, ClientError> {
        Err(ClientError::Unavailable("backend offline".to_string()))
    }

    fn create_submission(
        &self,
        _assignment_id: &AssignmentId,
        _student_id: &StudentId,
        _payload: SubmissionPayload,
    ) -> Result<SubmissionRecord, ClientError> {
        Err(ClientError::Unavailable("backend offline".to_string()))
    }

    fn update_submission(
        &self,
        _assignment_id: &AssignmentId,
        _student_id: &StudentId,
        _payload: SubmissionPayload,
    ) -> Result<SubmissionRecord, ClientError> {
        Err(ClientError::Unavailable("backend offline".to_string()))
    }
}

/// Payment gateway double counting calls and returning a scripted verdict.
pub(super) struct CountingGateway {
    pub(super) verify_success: Mutex<bool>,
    pub(super) initialized: Mutex<Vec<PaymentRequest>>,
    pub(super) verified: Mutex<Vec<String>>,
    sequence: Mutex<u32>,
}

impl Default for CountingGateway {
    fn default() -> Self {
        Self {
            verify_success: Mutex::new(true),
            initialized: Mutex::new(Vec::new()),
            verified: Mutex::new(Vec::new()),
            sequence: Mutex::new(0),
        }
    }
}

impl CountingGateway {
    pub(super) fn set_verify_success(&self, success: bool) {
        *self.verify_success.lock().expect("verdict mutex poisoned") = success;
    }

    pub(super) fn verify_calls(&self) -> usize {
        self.verified.lock().expect("verify log poisoned").len()
    }
}

impl PaymentGateway for CountingGateway {
    fn initialize_late_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentSession, PaymentError> {
        let mut sequence = self.sequence.lock().expect("sequence mutex poisoned");
        *sequence += 1;
        let reference = format!("ref-{:04}", *sequence);
        self.initialized
            .lock()
            .expect("init log poisoned")
            .push(request);
        Ok(PaymentSession {
            authorization_url: format!("https://pay.example.com/authorize/{reference}"),
            reference,
        })
    }

    fn verify_payment(&self, reference: &str) -> Result<PaymentVerification, PaymentError> {
        self.verified
            .lock()
            .expect("verify log poisoned")
            .push(reference.to_string());
        let success = *self.verify_success.lock().expect("verdict mutex poisoned");
        Ok(PaymentVerification {
            success,
            message: if success {
                "payment verified".to_string()
            } else {
                "payment declined".to_string()
            },
        })
    }
}

/// Gateway double whose verification leg times out a set number of times
/// before answering, for retry-semantics tests.
pub(super) struct FlakyGateway {
    failures_left: Mutex<u32>,
    pub(super) verify_calls: Mutex<u32>,
}

impl FlakyGateway {
    pub(super) fn failing_once() -> Self {
        Self {
            failures_left: Mutex::new(1),
            verify_calls: Mutex::new(0),
        }
    }
}

impl PaymentGateway for FlakyGateway {
    fn initialize_late_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentSession, PaymentError> {
        let reference = format!("ref-{}", request.assignment_id.0);
        Ok(PaymentSession {
            authorization_url: format!("https://pay.example.com/authorize/{reference}"),
            reference,
        })
    }

    fn verify_payment(&self, _reference: &str) -> Result<PaymentVerification, PaymentError> {
        *self.verify_calls.lock().expect("verify counter poisoned") += 1;
        let mut failures = self.failures_left.lock().expect("failure counter poisoned");
        if *failures > 0 {
            *failures -= 1;
            return Err(PaymentError::Transport("verification timed out".to_string()));
        }
        Ok(PaymentVerification {
            success: true,
            message: "payment verified".to_string(),
        })
    }
}

/// Gateway double that cannot be reached at all.
pub(super) struct OfflineGateway;

impl PaymentGateway for OfflineGateway {
    fn initialize_late_payment(
        &self,
        _request: PaymentRequest,
    ) -> Result<PaymentSession, PaymentError> {
        Err(PaymentError::Transport("gateway unreachable".to_string()))
    }

    fn verify_payment(&self, _reference: &str) -> Result<PaymentVerification, PaymentError> {
        Err(PaymentError::Transport("gateway unreachable".to_string()))
    }
}

pub(super) fn build_service() -> (
    Arc<SubmissionWorkflowService<MemoryCoursework, CountingGateway>>,
    Arc<MemoryCoursework>,
    Arc<CountingGateway>,
) {
    let backend = Arc::new(MemoryCoursework::with_assignments(vec![
        open_assignment(),
        late_allowed_assignment(),
        fee_assignment(),
        closed_assignment(),
    ]));
    let gateway = Arc::new(CountingGateway::default());
    let service = Arc::new(SubmissionWorkflowService::new(
        backend.clone(),
        gateway.clone(),
    ));
    (service, backend, gateway)
}

pub(super) fn router_with_service(
    service: Arc<SubmissionWorkflowService<MemoryCoursework, CountingGateway>>,
) -> axum::Router {
    submission_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
