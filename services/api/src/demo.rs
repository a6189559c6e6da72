use crate::infra::{demo_archive, parse_timestamp, InMemoryCoursework, InMemoryPaymentGateway};
use chrono::{DateTime, Utc};
use clap::Args;
use courseflow::error::AppError;
use courseflow::workflows::assignments::submissions::{
    evaluate, Assignment, AssignmentId, EditPermission, StudentId, SubmissionDraft,
    SubmissionKind, SubmissionMode, SubmissionWorkflowError, SubmissionWorkflowService,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct EligibilityCheckArgs {
    /// Assignment start (RFC 3339, e.g. 2026-03-01T09:00:00Z)
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) start: DateTime<Utc>,
    /// Assignment deadline (RFC 3339)
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) deadline: DateTime<Utc>,
    /// Accept submissions after the deadline
    #[arg(long)]
    pub(crate) allow_late: bool,
    /// Late submission fee in cents (implies a fee is required)
    #[arg(long)]
    pub(crate) fee_cents: Option<u32>,
    /// Evaluate at this instant instead of the current time (RFC 3339)
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Student identifier used throughout the walkthrough
    #[arg(long, default_value = "demo-student")]
    pub(crate) student: String,
    /// Skip the late-fee payment portion of the demo
    #[arg(long)]
    pub(crate) skip_late_fee: bool,
}

pub(crate) fn run_eligibility_check(args: EligibilityCheckArgs) -> Result<(), AppError> {
    let EligibilityCheckArgs {
        start,
        deadline,
        allow_late,
        fee_cents,
        now,
    } = args;

    let assignment = Assignment {
        id: AssignmentId("eligibility-check".to_string()),
        title: "Eligibility check".to_string(),
        start_date: start,
        deadline,
        allow_late_submission: allow_late,
        payment_required: fee_cents.is_some(),
        payment_amount_cents: fee_cents.unwrap_or(0),
        max_score: 0,
        submission_mode: SubmissionMode::Both,
    };

    let evaluated_at = now.unwrap_or_else(Utc::now);
    let outcome = evaluate(&assignment, evaluated_at);

    println!("Evaluated at {}", evaluated_at.to_rfc3339());
    println!(
        "Verdict: {}",
        if outcome.can_submit() {
            "submission allowed"
        } else {
            "submission refused"
        }
    );
    println!("Message: {}", outcome.message);

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        student,
        skip_late_fee,
    } = args;

    let student = StudentId(student);
    let coursework = Arc::new(InMemoryCoursework::seeded());
    let payments = Arc::new(InMemoryPaymentGateway::default());
    let service = SubmissionWorkflowService::new(coursework.clone(), payments.clone());

    println!("Submission workflow demo (student {})", student.0);

    println!("\n1. On-time submission");
    let open_id = AssignmentId("css-gallery".to_string());
    let draft = SubmissionDraft {
        kind: Some(SubmissionKind::Code),
        html: Some("<section class=\"gallery\">demo</section>".to_string()),
        css: Some(".gallery { display: flex; }".to_string()),
        ..SubmissionDraft::default()
    };
    match service.submit(&open_id, &student, draft.clone(), Utc::now()) {
        Ok(record) => println!(
            "  Stored {} submission for '{}' -> status {}",
            record.payload.kind().label(),
            open_id.0,
            record.status.label()
        ),
        Err(err) => println!("  Submission rejected: {err}"),
    }

    println!("\n2. Refusals outside the window");
    for id in ["portfolio-launch", "html-basics"] {
        let assignment_id = AssignmentId(id.to_string());
        match service.submit(&assignment_id, &student, draft.clone(), Utc::now()) {
            Ok(_) => println!("  '{id}' unexpectedly accepted a submission"),
            Err(err) => println!("  '{id}': {err}"),
        }
    }

    println!("\n3. Server-ruled edit rights");
    coursework.set_edit_ruling(
        &open_id,
        &student,
        EditPermission {
            allowed: false,
            reason: "grading has started".to_string(),
        },
    );
    match service.submit(&open_id, &student, draft, Utc::now()) {
        Ok(_) => println!("  Edit unexpectedly allowed"),
        Err(SubmissionWorkflowError::EditDenied { reason }) => {
            println!("  Edit refused by the backend: {reason}")
        }
        Err(err) => println!("  Edit failed: {err}"),
    }

    if skip_late_fee {
        return Ok(());
    }

    println!("\n4. Late submission behind a fee");
    let late_id = AssignmentId("js-capstone".to_string());
    let zip_draft = SubmissionDraft {
        kind: Some(SubmissionKind::Zip),
        zip_file: Some(demo_archive()),
        ..SubmissionDraft::default()
    };

    match service.submit(&late_id, &student, zip_draft.clone(), Utc::now()) {
        Err(SubmissionWorkflowError::PaymentRequired { fee_cents }) => {
            println!("  Submit blocked: {fee_cents} cents due")
        }
        Ok(_) => println!("  Submission unexpectedly accepted before payment"),
        Err(err) => println!("  Submission failed: {err}"),
    }

    let session = service
        .begin_payment(&late_id, &student, Utc::now())
        .map_err(AppError::from)?;
    println!("  Checkout at {}", session.authorization_url);

    let return_query = format!("reference={}", session.reference);
    let outcome = service
        .handle_payment_return(&late_id, &student, &return_query, Utc::now())
        .map_err(AppError::from)?;
    println!(
        "  Return handled: verified={} gate={} ({})",
        outcome.verified,
        outcome.gate.label(),
        outcome.message
    );

    // A refreshed return page replays the same reference; the gateway must
    // not be asked twice.
    match service.handle_payment_return(&late_id, &student, &return_query, Utc::now()) {
        Ok(outcome) => println!(
            "  Replayed return: verified={} ({})",
            outcome.verified, outcome.message
        ),
        Err(err) => println!("  Replayed return failed: {err}"),
    }
    println!(
        "  Gateway verifications: {:?}",
        payments.verified_references()
    );

    match service.submit(&late_id, &student, zip_draft, Utc::now()) {
        Ok(record) => println!(
            "  Late submission stored -> status {}",
            record.status.label()
        ),
        Err(err) => println!("  Late submission failed: {err}"),
    }

    Ok(())
}
