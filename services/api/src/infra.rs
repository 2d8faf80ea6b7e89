use feasibility_screening::config::ScreeningConfig;
use feasibility_screening::workflows::screening::{
    AlertError, FollowUpAlert, FollowUpPublisher, RepositoryError, ScreeningId, ScreeningRecord,
    ScreeningRepository, ScreeningTemplate, TemplateError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryScreeningRepository {
    records: Arc<Mutex<HashMap<ScreeningId, ScreeningRecord>>>,
}

impl InMemoryScreeningRepository {
    fn records(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<ScreeningId, ScreeningRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("screening store poisoned".to_string()))
    }
}

impl ScreeningRepository for InMemoryScreeningRepository {
    fn insert(&self, record: ScreeningRecord) -> Result<ScreeningRecord, RepositoryError> {
        let mut guard = self.records()?;
        if guard.contains_key(&record.screening_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.screening_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ScreeningRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records()?;
        if guard.contains_key(&record.screening_id) {
            guard.insert(record.screening_id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ScreeningId) -> Result<Option<ScreeningRecord>, RepositoryError> {
        Ok(self.records()?.get(id).cloned())
    }
}

/// Follow-up hook that keeps alerts in memory until a CRM transport is wired in.
#[derive(Default, Clone)]
pub(crate) struct InMemoryFollowUpPublisher {
    events: Arc<Mutex<Vec<FollowUpAlert>>>,
}

impl FollowUpPublisher for InMemoryFollowUpPublisher {
    fn publish(&self, alert: FollowUpAlert) -> Result<(), AlertError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|_| AlertError::Transport("alert queue poisoned".to_string()))?;
        info!(
            template = %alert.template,
            screening_id = %alert.screening_id,
            "follow-up queued"
        );
        guard.push(alert);
        Ok(())
    }
}

impl InMemoryFollowUpPublisher {
    pub(crate) fn events(&self) -> Vec<FollowUpAlert> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

/// Configured template file, or the bundled standard questionnaire.
pub(crate) fn load_template(config: &ScreeningConfig) -> Result<ScreeningTemplate, TemplateError> {
    load_template_from(config.template_path.as_deref())
}

pub(crate) fn load_template_from(path: Option<&Path>) -> Result<ScreeningTemplate, TemplateError> {
    let template = match path {
        Some(path) => ScreeningTemplate::from_path(path)?,
        None => ScreeningTemplate::standard()?,
    };
    info!(
        template = %template.name,
        version = %template.version,
        questions = template.questions.len(),
        "screening template loaded"
    );
    Ok(template)
}
