use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::classification::{ClassificationRules, RulesError};
use super::domain::Question;
use super::questionnaire::{QuestionSet, QuestionnaireError};

const STANDARD_TEMPLATE: &str = include_str!("../../../templates/solar-site-screening.json");

/// A screening flow: the question graph plus the rubric that classifies it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TemplateDocument")]
pub struct ScreeningTemplate {
    pub name: String,
    pub version: String,
    pub questions: QuestionSet,
    pub rules: ClassificationRules,
}

/// Unvalidated on-disk shape of a template.
#[derive(Debug, Deserialize)]
struct TemplateDocument {
    name: String,
    version: String,
    questions: Vec<Question>,
    rules: ClassificationRules,
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to read template {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("template is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Questionnaire(#[from] QuestionnaireError),
    #[error("classification rules are invalid: {0}")]
    Rules(#[from] RulesError),
}

impl ScreeningTemplate {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        questions: QuestionSet,
        rules: ClassificationRules,
    ) -> Result<Self, TemplateError> {
        rules.validate(|question_id| questions.contains(question_id))?;
        Ok(Self {
            name: name.into(),
            version: version.into(),
            questions,
            rules,
        })
    }

    /// The bundled solar site screening questionnaire.
    pub fn standard() -> Result<Self, TemplateError> {
        Self::from_json_str(STANDARD_TEMPLATE)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, TemplateError> {
        let document: TemplateDocument = serde_json::from_str(raw)?;
        Self::try_from(document)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

impl TryFrom<TemplateDocument> for ScreeningTemplate {
    type Error = TemplateError;

    fn try_from(document: TemplateDocument) -> Result<Self, Self::Error> {
        let questions = QuestionSet::new(document.questions)?;
        Self::new(document.name, document.version, questions, document.rules)
    }
}
