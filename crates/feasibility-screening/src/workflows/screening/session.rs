use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::classification::{classify, ScreeningResult};
use super::domain::{QuestionAnswer, QuestionId, ResponseMap};
use super::progress::{compute_progress, missing_required, QuestionnaireProgress};
use super::scoring::score;
use super::template::ScreeningTemplate;
use super::validation::{AnswerRejection, FormatValidator, StandardFormats};
use super::visibility::compute_visible;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Completed,
}

impl SessionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Completed => "completed",
        }
    }
}

/// Visible questions and progress after the latest change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub visible_question_ids: Vec<QuestionId>,
    pub progress: QuestionnaireProgress,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("question '{0}' is not part of this questionnaire")]
    UnknownQuestion(QuestionId),
    #[error("screening has already been submitted")]
    AlreadySubmitted,
    #[error(transparent)]
    Rejected(#[from] AnswerRejection),
    #[error("screening cannot be submitted; unanswered required questions: {}", join_ids(.missing_required))]
    NotSubmittable { missing_required: Vec<QuestionId> },
}

fn join_ids(ids: &[QuestionId]) -> String {
    ids.iter()
        .map(QuestionId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One respondent's pass through a template.
///
/// Owns its response map; nothing about a session lives in shared state. Once
/// submitted, the response map and result are frozen.
pub struct ScreeningSession {
    template: Arc<ScreeningTemplate>,
    formats: Arc<dyn FormatValidator>,
    responses: ResponseMap,
    result: Option<ScreeningResult>,
}

impl ScreeningSession {
    pub fn new(template: Arc<ScreeningTemplate>) -> Self {
        Self::resume(template, ResponseMap::new(), None)
    }

    /// Rebuild a session from stored state.
    pub fn resume(
        template: Arc<ScreeningTemplate>,
        responses: ResponseMap,
        result: Option<ScreeningResult>,
    ) -> Self {
        Self {
            template,
            formats: Arc::new(StandardFormats),
            responses,
            result,
        }
    }

    pub fn with_formats(mut self, formats: Arc<dyn FormatValidator>) -> Self {
        self.formats = formats;
        self
    }

    pub fn template(&self) -> &ScreeningTemplate {
        &self.template
    }

    pub fn responses(&self) -> &ResponseMap {
        &self.responses
    }

    pub fn result(&self) -> Option<&ScreeningResult> {
        self.result.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        if self.result.is_some() {
            SessionStatus::Completed
        } else {
            SessionStatus::Pending
        }
    }

    /// Validate and store one answer, or clear it with `None`.
    ///
    /// A rejected value leaves the response map untouched.
    pub fn answer(
        &mut self,
        question_id: &str,
        value: Option<QuestionAnswer>,
    ) -> Result<SessionSnapshot, SessionError> {
        if self.result.is_some() {
            return Err(SessionError::AlreadySubmitted);
        }

        let constraints = self
            .template
            .questions
            .constraints(question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(QuestionId::from(question_id)))?;

        let accepted = constraints.check(value.as_ref(), self.formats.as_ref())?;
        self.responses
            .set(constraints.question_id().clone(), accepted);

        Ok(self.snapshot())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let visible = compute_visible(self.template.questions.questions(), &self.responses);
        SessionSnapshot {
            visible_question_ids: visible.iter().map(|question| question.id.clone()).collect(),
            progress: compute_progress(&visible, &self.responses),
        }
    }

    /// Score and classify the current answers. Succeeds at most once.
    pub fn submit(&mut self) -> Result<ScreeningResult, SessionError> {
        if self.result.is_some() {
            return Err(SessionError::AlreadySubmitted);
        }

        let visible = compute_visible(self.template.questions.questions(), &self.responses);
        let missing = missing_required(&visible, &self.responses);
        if !missing.is_empty() {
            return Err(SessionError::NotSubmittable {
                missing_required: missing,
            });
        }

        let summary = score(&visible, &self.responses);
        let result = classify(&summary, &self.responses, &self.template.rules);
        self.result = Some(result.clone());
        Ok(result)
    }
}
