//! Import of screening answers exported from the CRM as CSV.
//!
//! Each row carries a `Question ID` and an `Answer`. Answers are converted per
//! question type and then go through the same intake checks as live answers.

mod normalizer;
mod parser;

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::workflows::screening::{
    QuestionAnswer, QuestionType, ScreeningSession, ScreeningTemplate, SessionError,
};

#[derive(Debug)]
pub enum ResponseImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Answer(SessionError),
}

impl std::fmt::Display for ResponseImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseImportError::Io(err) => write!(f, "failed to read response export: {}", err),
            ResponseImportError::Csv(err) => write!(f, "invalid response CSV data: {}", err),
            ResponseImportError::Answer(err) => {
                write!(f, "exported responses were refused: {}", err)
            }
        }
    }
}

impl std::error::Error for ResponseImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResponseImportError::Io(err) => Some(err),
            ResponseImportError::Csv(err) => Some(err),
            ResponseImportError::Answer(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ResponseImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ResponseImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<SessionError> for ResponseImportError {
    fn from(err: SessionError) -> Self {
        Self::Answer(err)
    }
}

/// A session rebuilt from an export, ready to submit.
pub struct ImportedScreening {
    pub session: ScreeningSession,
    /// Question ids in the export that the template does not declare.
    pub unknown_questions: Vec<String>,
}

pub struct ResponseImporter;

impl ResponseImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        template: Arc<ScreeningTemplate>,
    ) -> Result<ImportedScreening, ResponseImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, template)
    }

    /// The first row for a question wins; later duplicates are ignored.
    pub fn from_reader<R: Read>(
        reader: R,
        template: Arc<ScreeningTemplate>,
    ) -> Result<ImportedScreening, ResponseImportError> {
        let mut session = ScreeningSession::new(Arc::clone(&template));
        let mut applied: HashSet<String> = HashSet::new();
        let mut unknown_questions = Vec::new();

        for row in parser::parse_rows(reader)? {
            let Some(question) = template.questions.get(&row.question_id) else {
                if !unknown_questions.contains(&row.question_id) {
                    unknown_questions.push(row.question_id);
                }
                continue;
            };
            if applied.contains(&row.question_id) {
                continue;
            }

            let Some(raw) = row.answer else {
                continue;
            };
            let value = convert_answer(question.question_type, &raw);
            session.answer(&row.question_id, Some(value))?;
            applied.insert(row.question_id);
        }

        Ok(ImportedScreening {
            session,
            unknown_questions,
        })
    }
}

/// Values that do not fit the type fall back to text so intake reports the mismatch.
fn convert_answer(question_type: QuestionType, raw: &str) -> QuestionAnswer {
    match question_type {
        QuestionType::Boolean => parser::parse_boolean(raw)
            .map(QuestionAnswer::Boolean)
            .unwrap_or_else(|| QuestionAnswer::from(raw)),
        QuestionType::Number | QuestionType::Scale => parser::parse_number(raw)
            .map(QuestionAnswer::Number)
            .unwrap_or_else(|| QuestionAnswer::from(raw)),
        QuestionType::MultipleChoice => QuestionAnswer::List(parser::split_choices(raw)),
        _ => QuestionAnswer::from(raw.trim()),
    }
}
