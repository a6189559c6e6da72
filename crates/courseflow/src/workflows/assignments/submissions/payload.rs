use super::domain::{CodeBundle, SubmissionDraft, SubmissionKind, SubmissionMode, SubmissionPayload};

/// Validation errors raised while shaping a draft into a payload. Checks
/// are fail-fast: the first problem found is the one reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("select a submission type")]
    MissingKind,
    #[error("{kind} submissions are not offered for this assignment (mode: {mode})")]
    NotOffered { kind: &'static str, mode: &'static str },
    #[error("HTML content is required for a code submission")]
    MissingHtml,
    #[error("a submission link is required")]
    MissingLink,
    #[error("a GitHub repository link is required")]
    MissingGithubLink,
    #[error("select a zip file to upload")]
    MissingArchive,
}

fn required(value: Option<String>, missing: PayloadError) -> Result<String, PayloadError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(missing),
    }
}

/// Shape raw form fields into the payload variant matching the draft's
/// discriminant. Pure construction; persistence belongs to the coursework
/// collaborator.
pub fn build_payload(
    mode: SubmissionMode,
    draft: SubmissionDraft,
) -> Result<SubmissionPayload, PayloadError> {
    let kind = draft.kind.ok_or(PayloadError::MissingKind)?;

    if !mode.offers(kind) {
        return Err(PayloadError::NotOffered {
            kind: kind.label(),
            mode: mode.label(),
        });
    }

    match kind {
        SubmissionKind::Code => {
            let html = required(draft.html, PayloadError::MissingHtml)?;
            Ok(SubmissionPayload::Code(CodeBundle {
                html,
                css: draft.css,
                javascript: draft.javascript,
            }))
        }
        SubmissionKind::Link => {
            let url = required(draft.submission_link, PayloadError::MissingLink)?;
            Ok(SubmissionPayload::Link { url })
        }
        SubmissionKind::Github => {
            let url = required(draft.github_link, PayloadError::MissingGithubLink)?;
            Ok(SubmissionPayload::Github { url })
        }
        SubmissionKind::Zip => {
            let archive = draft.zip_file.ok_or(PayloadError::MissingArchive)?;
            Ok(SubmissionPayload::Zip(archive))
        }
    }
}
