use crate::infra::{load_template_from, InMemoryFollowUpPublisher, InMemoryScreeningRepository};
use chrono::{Duration, Utc};
use clap::Args;
use feasibility_screening::error::AppError;
use feasibility_screening::workflows::import::{ResponseImportError, ResponseImporter};
use feasibility_screening::workflows::screening::{
    EstimateRange, QuestionAnswer, QuestionnaireProgress, ScreeningRepository,
    ScreeningResult, ScreeningService,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Answer as a tenant, which opens the landlord consent question.
    #[arg(long)]
    pub(crate) tenant: bool,
    /// Questionnaire template JSON to use instead of the bundled one.
    #[arg(long)]
    pub(crate) template: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// CSV export with `Question ID` and `Answer` columns
    #[arg(long)]
    pub(crate) responses: PathBuf,
    /// Questionnaire template JSON (defaults to the bundled template)
    #[arg(long)]
    pub(crate) template: Option<PathBuf>,
    /// Print the result as JSON instead of a readable summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_evaluation(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs {
        responses,
        template,
        json,
    } = args;

    let template = Arc::new(load_template_from(template.as_deref())?);
    let imported = ResponseImporter::from_path(&responses, Arc::clone(&template))?;
    let mut session = imported.session;
    let progress = session.snapshot().progress;
    let result = session.submit().map_err(ResponseImportError::from)?;

    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("Result payload unavailable: {err}"),
        }
        return Ok(());
    }

    println!(
        "Screening evaluation: {} v{} ({})",
        template.name,
        template.version,
        responses.display()
    );
    if !imported.unknown_questions.is_empty() {
        println!(
            "Ignored columns not in the template: {}",
            imported.unknown_questions.join(", ")
        );
    }
    render_progress(&progress);
    render_result(&result);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { tenant, template } = args;

    let template = load_template_from(template.as_deref())?;
    let repository = Arc::new(InMemoryScreeningRepository::default());
    let alerts = Arc::new(InMemoryFollowUpPublisher::default());
    let service = ScreeningService::new(repository.clone(), alerts.clone(), template);

    println!(
        "Solar site screening demo ({} v{})",
        service.template().name,
        service.template().version
    );

    let record = match service.start(Some("demo-lead-001".to_string())) {
        Ok(record) => record,
        Err(err) => {
            println!("  Screening could not start: {err}");
            return Ok(());
        }
    };
    let screening_id = record.screening_id.clone();
    println!("- Started screening {screening_id}");

    match service.snapshot(&screening_id) {
        Ok(snapshot) => println!(
            "  {} questions visible before any answer",
            snapshot.visible_question_ids.len()
        ),
        Err(err) => println!("  Snapshot unavailable: {err}"),
    }

    println!("\nAnswering");
    match service.answer(&screening_id, "postal_code", Some(QuestionAnswer::from("ABC"))) {
        Ok(_) => println!("  postal_code=ABC accepted"),
        Err(err) => println!("  postal_code=ABC refused: {err}"),
    }

    for (question_id, value) in scripted_answers(tenant) {
        let shown = describe(&value);
        match service.answer(&screening_id, question_id, Some(value)) {
            Ok(snapshot) => println!(
                "  {question_id}={shown} -> {}% complete, {} visible, score {}",
                snapshot.progress.percent_complete,
                snapshot.visible_question_ids.len(),
                snapshot.progress.current_score
            ),
            Err(err) => println!("  {question_id}={shown} refused: {err}"),
        }
    }

    let result = match service.submit(&screening_id) {
        Ok(result) => result,
        Err(err) => {
            println!("\n  Submission refused: {err}");
            return Ok(());
        }
    };
    println!();
    render_result(&result);

    match repository.fetch(&screening_id) {
        Ok(Some(record)) => match serde_json::to_string_pretty(&record.status_view()) {
            Ok(json) => println!("\nPublic status payload:\n{json}"),
            Err(err) => println!("\nPublic status payload unavailable: {err}"),
        },
        Ok(None) => println!("\nRepository lookup returned no record"),
        Err(err) => println!("\nRepository unavailable: {err}"),
    }

    let events = alerts.events();
    if events.is_empty() {
        println!("Follow-up alerts: none dispatched");
    } else {
        println!("Follow-up alerts:");
        for alert in events {
            println!("- template={} -> {}", alert.template, alert.screening_id);
        }
    }

    Ok(())
}

/// Answers for a well-suited detached house, in questionnaire order.
pub(crate) fn scripted_answers(tenant: bool) -> Vec<(&'static str, QuestionAnswer)> {
    let mut answers = vec![
        ("property_type", QuestionAnswer::from("detached-house")),
        (
            "ownership",
            QuestionAnswer::from(if tenant { "tenant" } else { "owner" }),
        ),
    ];
    if tenant {
        answers.push(("landlord_consent", QuestionAnswer::from(true)));
    }
    answers.extend([
        ("roof_type", QuestionAnswer::from("metal-sheet")),
        ("roof_age_years", QuestionAnswer::from(6)),
        ("roof_area_sqm", QuestionAnswer::from(92)),
        ("shading", QuestionAnswer::from("none")),
        ("orientation", QuestionAnswer::from("south")),
        ("monthly_bill", QuestionAnswer::from(7200)),
        ("daytime_usage_percent", QuestionAnswer::from(60)),
        ("target_capacity_kw", QuestionAnswer::from(10)),
        (
            "interests",
            QuestionAnswer::from(vec!["on-grid".to_string(), "battery".to_string()]),
        ),
        ("battery_budget", QuestionAnswer::from(180000)),
        ("grid_connection", QuestionAnswer::from("single-phase")),
        ("installation_timeline", QuestionAnswer::from("within-3-months")),
        (
            "site_visit_date",
            QuestionAnswer::from(Utc::now() + Duration::days(7)),
        ),
        ("contact_email", QuestionAnswer::from("homeowner@example.com")),
        ("contact_phone", QuestionAnswer::from("+66 81 234 5678")),
        ("postal_code", QuestionAnswer::from("10110")),
        ("site_photos", QuestionAnswer::from("uploads/demo-roof.jpg")),
    ]);
    answers
}

fn describe(value: &QuestionAnswer) -> String {
    match value {
        QuestionAnswer::Boolean(flag) => flag.to_string(),
        QuestionAnswer::Number(number) => number.to_string(),
        QuestionAnswer::Date(instant) => instant.format("%Y-%m-%d").to_string(),
        QuestionAnswer::Text(text) => text.clone(),
        QuestionAnswer::List(items) => items.join("+"),
    }
}

fn render_progress(progress: &QuestionnaireProgress) {
    println!(
        "Progress: {}/{} answered ({}%), required {}/{}",
        progress.answered_questions,
        progress.total_questions,
        progress.percent_complete,
        progress.answered_required_questions,
        progress.required_questions
    );
}

pub(crate) fn render_result(result: &ScreeningResult) {
    println!("Decision: {}", result.summary());
    println!(
        "Score {} of {} ({}%)",
        result.score, result.max_score, result.percentage
    );

    render_list("Risk factors", &result.risk_factors);
    render_list("Recommendations", &result.recommendations);
    render_list("Next steps", &result.next_steps);

    if let Some(size) = &result.estimated_system_size {
        println!("Estimated system size: {}", format_range(size));
    }
    if let Some(investment) = &result.estimated_investment {
        println!("Estimated investment: {}", format_range(investment));
    }
}

fn render_list(heading: &str, items: &[String]) {
    if items.is_empty() {
        println!("{heading}: none");
        return;
    }
    println!("{heading}");
    for item in items {
        println!("- {item}");
    }
}

fn format_range(range: &EstimateRange) -> String {
    format!("{:.2} - {:.2} {}", range.low, range.high, range.unit)
}
