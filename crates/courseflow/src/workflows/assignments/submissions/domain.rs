use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for assignments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(pub String);

/// Identifier wrapper for the student owning a submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Assignment policy snapshot as published by the coursework backend. The
/// rule core only reads these fields; it never mutates an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub allow_late_submission: bool,
    pub payment_required: bool,
    pub payment_amount_cents: u32,
    pub max_score: u32,
    pub submission_mode: SubmissionMode,
}

impl Assignment {
    /// Fee charged for a late submission, when one applies at all.
    pub fn late_fee_cents(&self) -> Option<u32> {
        self.payment_required.then_some(self.payment_amount_cents)
    }
}

/// Which submission variants an assignment accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    Code,
    Link,
    Both,
}

impl SubmissionMode {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionMode::Code => "code",
            SubmissionMode::Link => "link",
            SubmissionMode::Both => "both",
        }
    }

    /// Whether a submission of the given kind is offered under this mode.
    /// Link-style modes cover both plain links and GitHub repositories;
    /// code-style modes cover editor bundles and zip archives.
    pub const fn offers(self, kind: SubmissionKind) -> bool {
        match self {
            SubmissionMode::Both => true,
            SubmissionMode::Code => matches!(kind, SubmissionKind::Code | SubmissionKind::Zip),
            SubmissionMode::Link => matches!(kind, SubmissionKind::Link | SubmissionKind::Github),
        }
    }
}

/// Discriminant for the submission payload variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Code,
    Link,
    Github,
    Zip,
}

impl SubmissionKind {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionKind::Code => "code",
            SubmissionKind::Link => "link",
            SubmissionKind::Github => "github",
            SubmissionKind::Zip => "zip",
        }
    }
}

/// Inline code bundle typed directly into the submission editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBundle {
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub javascript: Option<String>,
}

/// Reference to an uploaded archive held by the coursework backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRef {
    pub file_name: String,
    pub storage_key: String,
}

/// Closed payload representation: each variant carries exactly the fields
/// that are meaningful for its kind, so a record can never hold a payload
/// that disagrees with its discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionPayload {
    Code(CodeBundle),
    Link { url: String },
    Github { url: String },
    Zip(ArchiveRef),
}

impl SubmissionPayload {
    pub const fn kind(&self) -> SubmissionKind {
        match self {
            SubmissionPayload::Code(_) => SubmissionKind::Code,
            SubmissionPayload::Link { .. } => SubmissionKind::Link,
            SubmissionPayload::Github { .. } => SubmissionKind::Github,
            SubmissionPayload::Zip(_) => SubmissionKind::Zip,
        }
    }
}

/// Grading lifecycle of a submission. Only the grading collaborator moves a
/// record out of `Pending`; the student-facing workflow never writes this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Reviewed => "reviewed",
            SubmissionStatus::Accepted => "accepted",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

/// One submission per assignment per student, created on first submit and
/// replaced in place on edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub assignment_id: AssignmentId,
    pub student_id: StudentId,
    pub payload: SubmissionPayload,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Server-granted edit ruling. The backend is the sole authority on whether
/// an existing submission may still be edited; this type is displayed and
/// enforced verbatim, never recomputed from deadlines on this side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPermission {
    pub allowed: bool,
    pub reason: String,
}

impl EditPermission {
    /// Default ruling when the student has not submitted yet.
    pub fn missing_submission() -> Self {
        Self {
            allowed: true,
            reason: "no submission found".to_string(),
        }
    }
}

/// Raw form fields as collected from the student, before validation shapes
/// them into a [`SubmissionPayload`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionDraft {
    pub kind: Option<SubmissionKind>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub css: Option<String>,
    #[serde(default)]
    pub javascript: Option<String>,
    #[serde(default)]
    pub submission_link: Option<String>,
    #[serde(default)]
    pub github_link: Option<String>,
    #[serde(default)]
    pub zip_file: Option<ArchiveRef>,
}
