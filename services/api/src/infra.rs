use chrono::{DateTime, Duration, Utc};
use courseflow::workflows::assignments::submissions::{
    ArchiveRef, Assignment, AssignmentId, ClientError, CourseworkClient, EditPermission,
    PaymentError, PaymentGateway, PaymentRequest, PaymentSession, PaymentVerification, StudentId,
    SubmissionMode, SubmissionPayload, SubmissionRecord, SubmissionSnapshot, SubmissionStatus,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

type SubmissionKey = (AssignmentId, StudentId);

/// In-memory coursework backend. Serves the seeded assignment catalog and
/// keeps one submission per assignment per student, the same contract the
/// hosted backend exposes.
#[derive(Default)]
pub(crate) struct InMemoryCoursework {
    assignments: Mutex<HashMap<AssignmentId, Assignment>>,
    submissions: Mutex<HashMap<SubmissionKey, SubmissionRecord>>,
    paid: Mutex<HashSet<SubmissionKey>>,
    edit_rulings: Mutex<HashMap<SubmissionKey, EditPermission>>,
}

impl InMemoryCoursework {
    pub(crate) fn seeded() -> Self {
        let backend = Self::default();
        {
            let mut guard = backend
                .assignments
                .lock()
                .expect("assignment mutex poisoned");
            for assignment in seed_assignments() {
                guard.insert(assignment.id.clone(), assignment);
            }
        }
        backend
    }

    pub(crate) fn set_edit_ruling(
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
}

impl CourseworkClient for InMemoryCoursework {
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
        let key = (assignment_id.clone(), student_id.clone());
        Ok(SubmissionSnapshot {
            submission: self
                .submissions
                .lock()
                .expect("submission mutex poisoned")
                .get(&key)
                .cloned(),
            has_paid: self.paid.lock().expect("paid mutex poisoned").contains(&key),
        })
    }

    fn fetch_edit_permission(
        &self,
        assignment_id: &AssignmentId,
        student_id: &StudentId,
    ) -> Result<EditPermission, ClientError> {
        let key = (assignment_id.clone(), student_id.clone());
        Ok(self
            .edit_rulings
            .lock()
            .expect("ruling mutex poisoned")
            .get(&key)
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
        let now = Utc::now();
        let record = SubmissionRecord {
            assignment_id: assignment_id.clone(),
            student_id: student_id.clone(),
            payload,
            status: SubmissionStatus::Pending,
            submitted_at: now,
            updated_at: now,
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
        let mut guard = self
            .submissions
            .lock()
            .expect("submission mutex poisoned");
        let record = guard
            .get_mut(&(assignment_id.clone(), student_id.clone()))
            .ok_or(ClientError::SubmissionNotFound)?;
        record.payload = payload;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

/// In-memory payment gateway. Issues sequential references and verifies
/// every one, which is enough to drive the gate through its legs.
#[derive(Default)]
pub(crate) struct InMemoryPaymentGateway {
    sequence: Mutex<u32>,
    verified: Mutex<Vec<String>>,
}

impl InMemoryPaymentGateway {
    pub(crate) fn verified_references(&self) -> Vec<String> {
        self.verified.lock().expect("verify log poisoned").clone()
    }
}

impl PaymentGateway for InMemoryPaymentGateway {
    fn initialize_late_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentSession, PaymentError> {
        let mut sequence = self.sequence.lock().expect("sequence mutex poisoned");
        *sequence += 1;
        let reference = format!("ref-{}-{:04}", request.assignment_id.0, *sequence);
        Ok(PaymentSession {
            authorization_url: format!("https://checkout.example.com/authorize/{reference}"),
            reference,
        })
    }

    fn verify_payment(&self, reference: &str) -> Result<PaymentVerification, PaymentError> {
        self.verified
            .lock()
            .expect("verify log poisoned")
            .push(reference.to_string());
        Ok(PaymentVerification {
            success: true,
            message: "payment verified".to_string(),
        })
    }
}

/// Assignment catalog for the demo backend, laid out around the wall clock
/// so each submission window state has a representative.
pub(crate) fn seed_assignments() -> Vec<Assignment> {
    let now = Utc::now();
    vec![
        Assignment {
            id: AssignmentId("css-gallery".to_string()),
            title: "Flexbox image gallery".to_string(),
            start_date: now - Duration::days(2),
            deadline: now + Duration::days(5),
            allow_late_submission: false,
            payment_required: false,
            payment_amount_cents: 0,
            max_score: 100,
            submission_mode: SubmissionMode::Code,
        },
        Assignment {
            id: AssignmentId("js-capstone".to_string()),
            title: "JavaScript capstone project".to_string(),
            start_date: now - Duration::days(28),
            deadline: now - Duration::days(3),
            allow_late_submission: true,
            payment_required: true,
            payment_amount_cents: 2500,
            max_score: 100,
            submission_mode: SubmissionMode::Both,
        },
        Assignment {
            id: AssignmentId("html-basics".to_string()),
            title: "Semantic HTML basics".to_string(),
            start_date: now - Duration::days(40),
            deadline: now - Duration::days(20),
            allow_late_submission: false,
            payment_required: false,
            payment_amount_cents: 0,
            max_score: 60,
            submission_mode: SubmissionMode::Code,
        },
        Assignment {
            id: AssignmentId("portfolio-launch".to_string()),
            title: "Portfolio launch review".to_string(),
            start_date: now + Duration::days(7),
            deadline: now + Duration::days(21),
            allow_late_submission: true,
            payment_required: false,
            payment_amount_cents: 0,
            max_score: 100,
            submission_mode: SubmissionMode::Link,
        },
    ]
}

pub(crate) fn demo_archive() -> ArchiveRef {
    ArchiveRef {
        file_name: "capstone.zip".to_string(),
        storage_key: "uploads/demo/capstone.zip".to_string(),
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}

pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_timestamp(&value).map_err(serde::de::Error::custom))
        .transpose()
}
