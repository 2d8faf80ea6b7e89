use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classification::ScreeningResult;
use super::domain::ResponseMap;
use super::session::SessionStatus;

/// Identifier of one screening session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreeningId(pub String);

impl fmt::Display for ScreeningId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored state of a screening: the answers so far and, once submitted, the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningRecord {
    pub screening_id: ScreeningId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_reference: Option<String>,
    pub template_version: String,
    pub responses: ResponseMap,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ScreeningResult>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl ScreeningRecord {
    pub fn outcome_summary(&self) -> String {
        match &self.result {
            Some(result) => result.summary(),
            None => "awaiting submission".to_string(),
        }
    }

    pub fn status_view(&self) -> ScreeningStatusView {
        ScreeningStatusView {
            screening_id: self.screening_id.clone(),
            lead_reference: self.lead_reference.clone(),
            status: self.status.label(),
            answered: self.responses.len(),
            outcome: self.outcome_summary(),
            result: self.result.clone(),
        }
    }
}

/// Storage abstraction so the service can be exercised without a database.
pub trait ScreeningRepository: Send + Sync {
    fn insert(&self, record: ScreeningRecord) -> Result<ScreeningRecord, RepositoryError>;
    fn update(&self, record: ScreeningRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ScreeningId) -> Result<Option<ScreeningRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook to the CRM's follow-up queue (sales task, e-mail, chat).
pub trait FollowUpPublisher: Send + Sync {
    fn publish(&self, alert: FollowUpAlert) -> Result<(), AlertError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpAlert {
    pub template: String,
    pub screening_id: ScreeningId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}

/// Externally exposed view of a screening.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningStatusView {
    pub screening_id: ScreeningId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_reference: Option<String>,
    pub status: &'static str,
    pub answered: usize,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScreeningResult>,
}
