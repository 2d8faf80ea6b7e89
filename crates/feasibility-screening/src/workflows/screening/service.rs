use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::classification::{FollowUpPriority, ScreeningResult};
use super::domain::{Question, QuestionAnswer, ResponseMap};
use super::repository::{
    AlertError, FollowUpAlert, FollowUpPublisher, RepositoryError, ScreeningId, ScreeningRecord,
    ScreeningRepository,
};
use super::session::{ScreeningSession, SessionError, SessionSnapshot, SessionStatus};
use super::template::ScreeningTemplate;
use super::validation::{FormatValidator, StandardFormats};
use super::visibility::compute_visible;

/// Fresh ids tried before `start` gives up on a crowded repository.
const START_ATTEMPTS: usize = 8;

/// Service composing the template, repository and follow-up hook.
///
/// Each mutating call runs fetch, change and update under one lock so two answers
/// to the same screening cannot interleave.
pub struct ScreeningService<R, A> {
    template: Arc<ScreeningTemplate>,
    formats: Arc<dyn FormatValidator>,
    repository: Arc<R>,
    alerts: Arc<A>,
    writes: Mutex<()>,
    sequence: AtomicU64,
}

impl<R, A> ScreeningService<R, A>
where
    R: ScreeningRepository + 'static,
    A: FollowUpPublisher + 'static,
{
    pub fn new(repository: Arc<R>, alerts: Arc<A>, template: ScreeningTemplate) -> Self {
        Self {
            template: Arc::new(template),
            formats: Arc::new(StandardFormats),
            repository,
            alerts,
            writes: Mutex::new(()),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn with_formats(mut self, formats: Arc<dyn FormatValidator>) -> Self {
        self.formats = formats;
        self
    }

    pub fn template(&self) -> &ScreeningTemplate {
        &self.template
    }

    /// Open a new screening with an empty response map.
    pub fn start(
        &self,
        lead_reference: Option<String>,
    ) -> Result<ScreeningRecord, ScreeningServiceError> {
        let now = Utc::now();
        let mut attempts = 0;
        let stored = loop {
            attempts += 1;
            let record = ScreeningRecord {
                screening_id: self.next_screening_id(now),
                lead_reference: lead_reference.clone(),
                template_version: self.template.version.clone(),
                responses: ResponseMap::new(),
                status: SessionStatus::Pending,
                result: None,
                started_at: now,
                updated_at: now,
                submitted_at: None,
            };
            let screening_id = record.screening_id.clone();
            match self.repository.insert(record) {
                Ok(stored) => break stored,
                Err(RepositoryError::Conflict) if attempts < START_ATTEMPTS => {
                    warn!(screening_id = %screening_id, "screening id taken, retrying");
                }
                Err(error) => return Err(error.into()),
            }
        };

        info!(
            screening_id = %stored.screening_id,
            template = %self.template.name,
            version = %self.template.version,
            "screening started"
        );
        Ok(stored)
    }

    /// Validate and store one answer, returning the recomputed snapshot.
    pub fn answer(
        &self,
        screening_id: &ScreeningId,
        question_id: &str,
        value: Option<QuestionAnswer>,
    ) -> Result<SessionSnapshot, ScreeningServiceError> {
        let _guard = self.lock_writes()?;
        let mut record = self.fetch_record(screening_id)?;
        let mut session = self.session_for(&record);

        let snapshot = match session.answer(question_id, value) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(
                    screening_id = %screening_id,
                    question_id,
                    error = %error,
                    "answer rejected"
                );
                return Err(error.into());
            }
        };

        record.responses = session.responses().clone();
        record.updated_at = Utc::now();
        self.repository.update(record)?;

        Ok(snapshot)
    }

    pub fn snapshot(
        &self,
        screening_id: &ScreeningId,
    ) -> Result<SessionSnapshot, ScreeningServiceError> {
        let record = self.fetch_record(screening_id)?;
        Ok(self.session_for(&record).snapshot())
    }

    /// Currently visible questions, in authoring order.
    pub fn visible_questions(
        &self,
        screening_id: &ScreeningId,
    ) -> Result<Vec<Question>, ScreeningServiceError> {
        let record = self.fetch_record(screening_id)?;
        Ok(
            compute_visible(self.template.questions.questions(), &record.responses)
                .into_iter()
                .cloned()
                .collect(),
        )
    }

    /// Score and classify a screening, persisting the result. One-shot.
    pub fn submit(
        &self,
        screening_id: &ScreeningId,
    ) -> Result<ScreeningResult, ScreeningServiceError> {
        let _guard = self.lock_writes()?;
        let mut record = self.fetch_record(screening_id)?;
        let mut session = self.session_for(&record);

        let result = match session.submit() {
            Ok(result) => result,
            Err(error) => {
                warn!(screening_id = %screening_id, error = %error, "submission refused");
                return Err(error.into());
            }
        };

        let now = Utc::now();
        record.status = SessionStatus::Completed;
        record.result = Some(result.clone());
        record.updated_at = now;
        record.submitted_at = Some(now);
        let lead_reference = record.lead_reference.clone();
        self.repository.update(record)?;

        info!(
            screening_id = %screening_id,
            percentage = result.percentage,
            rating = result.feasibility_rating.label(),
            qualification = result.qualification_level.label(),
            priority = result.follow_up_priority.label(),
            "screening submitted"
        );

        if result.follow_up_priority == FollowUpPriority::High {
            self.publish_follow_up(screening_id, lead_reference, &result)?;
        }

        Ok(result)
    }

    pub fn get(&self, screening_id: &ScreeningId) -> Result<ScreeningRecord, ScreeningServiceError> {
        self.fetch_record(screening_id)
    }

    fn publish_follow_up(
        &self,
        screening_id: &ScreeningId,
        lead_reference: Option<String>,
        result: &ScreeningResult,
    ) -> Result<(), ScreeningServiceError> {
        let mut details = BTreeMap::new();
        details.insert(
            "feasibility".to_string(),
            result.feasibility_rating.label().to_string(),
        );
        details.insert(
            "qualification".to_string(),
            result.qualification_level.label().to_string(),
        );
        details.insert("percentage".to_string(), result.percentage.to_string());
        if let Some(lead) = lead_reference {
            details.insert("lead_reference".to_string(), lead);
        }
        if let Some(step) = result.next_steps.first() {
            details.insert("next_step".to_string(), step.clone());
        }

        self.alerts.publish(FollowUpAlert {
            template: "screening_high_priority".to_string(),
            screening_id: screening_id.clone(),
            details,
        })?;
        info!(screening_id = %screening_id, "follow-up published");
        Ok(())
    }

    fn session_for(&self, record: &ScreeningRecord) -> ScreeningSession {
        ScreeningSession::resume(
            Arc::clone(&self.template),
            record.responses.clone(),
            record.result.clone(),
        )
        .with_formats(Arc::clone(&self.formats))
    }

    fn fetch_record(
        &self,
        screening_id: &ScreeningId,
    ) -> Result<ScreeningRecord, ScreeningServiceError> {
        let record = self
            .repository
            .fetch(screening_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, ScreeningServiceError> {
        self.writes.lock().map_err(|_| {
            ScreeningServiceError::Repository(RepositoryError::Unavailable(
                "screening write lock poisoned".to_string(),
            ))
        })
    }

    /// `scr-<UTC second>-<sequence>`, so ids stay distinct across restarts.
    fn next_screening_id(&self, now: DateTime<Utc>) -> ScreeningId {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        ScreeningId(format!("scr-{}-{sequence:06}", now.format("%Y%m%d%H%M%S")))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScreeningServiceError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Alert(#[from] AlertError),
}
