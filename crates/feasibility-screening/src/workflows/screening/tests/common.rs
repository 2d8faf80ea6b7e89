use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;

use crate::workflows::screening::domain::{
    ChoiceOption, Condition, ConditionOperator, ConditionalLogic, Question, QuestionAnswer,
    QuestionOptions, QuestionType, ResponseMap,
};
use crate::workflows::screening::repository::{
    AlertError, FollowUpAlert, FollowUpPublisher, RepositoryError, ScreeningId, ScreeningRecord,
    ScreeningRepository,
};
use crate::workflows::screening::{screening_router, ScreeningService, ScreeningTemplate};

pub(super) fn question(id: &str, question_type: QuestionType) -> Question {
    Question {
        id: id.into(),
        text: format!("Question {id}"),
        question_type,
        options: QuestionOptions::default(),
        is_required: false,
        weight: 1.0,
        conditional_logic: None,
    }
}

pub(super) fn required(mut question: Question) -> Question {
    question.is_required = true;
    question
}

pub(super) fn weighted(mut question: Question, weight: f64) -> Question {
    question.weight = weight;
    question
}

pub(super) fn with_choices(mut question: Question, values: &[&str]) -> Question {
    question.options.choices = values
        .iter()
        .map(|value| ChoiceOption {
            value: value.to_string(),
            label: value.to_uppercase(),
        })
        .collect();
    question
}

pub(super) fn shown_if(mut question: Question, conditions: Vec<Condition>) -> Question {
    question
        .conditional_logic
        .get_or_insert_with(ConditionalLogic::default)
        .show_if = conditions;
    question
}

pub(super) fn hidden_if(mut question: Question, conditions: Vec<Condition>) -> Question {
    question
        .conditional_logic
        .get_or_insert_with(ConditionalLogic::default)
        .hide_if = conditions;
    question
}

pub(super) fn equals(question_id: &str, value: impl Into<QuestionAnswer>) -> Condition {
    Condition::new(question_id, ConditionOperator::Equals, value)
}

pub(super) fn responses(pairs: &[(&str, QuestionAnswer)]) -> ResponseMap {
    pairs
        .iter()
        .map(|(id, answer)| (*id, answer.clone()))
        .collect()
}

/// The two-question flow used throughout the visibility and progress checks.
pub(super) fn gated_pair() -> Vec<Question> {
    vec![
        required(question("a", QuestionType::ShortText)),
        shown_if(question("b", QuestionType::ShortText), vec![equals("a", "yes")]),
    ]
}

pub(super) fn standard_template() -> Arc<ScreeningTemplate> {
    Arc::new(ScreeningTemplate::standard().expect("standard template is valid"))
}

/// Required answers for an owner-occupied house with an unshaded metal roof.
pub(super) fn required_answers() -> Vec<(&'static str, QuestionAnswer)> {
    vec![
        ("property_type", "detached-house".into()),
        ("ownership", "owner".into()),
        ("roof_type", "metal-sheet".into()),
        ("roof_area_sqm", 85.into()),
        ("shading", "none".into()),
        ("monthly_bill", 6500.into()),
        ("grid_connection", "three-phase".into()),
        ("installation_timeline", "within-3-months".into()),
        ("contact_email", "lead@example.com".into()),
        ("contact_phone", "+66 81 234 5678".into()),
        ("postal_code", "10110".into()),
    ]
}

/// Every weighted question in the owner path, answered.
pub(super) fn complete_answers() -> Vec<(&'static str, QuestionAnswer)> {
    let mut answers = required_answers();
    answers.extend([
        ("roof_age_years", 5.into()),
        ("orientation", "south".into()),
        ("daytime_usage_percent", 60.into()),
        ("target_capacity_kw", 8.into()),
        (
            "interests",
            QuestionAnswer::List(vec!["on-grid".to_string(), "ev-charger".to_string()]),
        ),
        ("site_visit_date", "2025-11-03".into()),
        ("site_photos", "uploads/roof-01.jpg".into()),
    ]);
    answers
}

pub(super) fn build_service() -> (
    ScreeningService<MemoryRepository, MemoryAlerts>,
    Arc<MemoryRepository>,
    Arc<MemoryAlerts>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let alerts = Arc::new(MemoryAlerts::default());
    let template = ScreeningTemplate::standard().expect("standard template is valid");
    let service = ScreeningService::new(repository.clone(), alerts.clone(), template);
    (service, repository, alerts)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ScreeningId, ScreeningRecord>>>,
}

impl ScreeningRepository for MemoryRepository {
    fn insert(&self, record: ScreeningRecord) -> Result<ScreeningRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.screening_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.screening_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ScreeningRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.screening_id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &ScreeningId) -> Result<Option<ScreeningRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAlerts {
    events: Arc<Mutex<Vec<FollowUpAlert>>>,
}

impl MemoryAlerts {
    pub(super) fn events(&self) -> Vec<FollowUpAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl FollowUpPublisher for MemoryAlerts {
    fn publish(&self, alert: FollowUpAlert) -> Result<(), AlertError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert);
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl ScreeningRepository for UnavailableRepository {
    fn insert(&self, _record: ScreeningRecord) -> Result<ScreeningRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: ScreeningRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ScreeningId) -> Result<Option<ScreeningRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct OfflineAlerts;

impl FollowUpPublisher for OfflineAlerts {
    fn publish(&self, _alert: FollowUpAlert) -> Result<(), AlertError> {
        Err(AlertError::Transport("crm webhook unreachable".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}

pub(super) fn screening_router_with_service(
    service: ScreeningService<MemoryRepository, MemoryAlerts>,
) -> axum::Router {
    screening_router(Arc::new(service))
}
