use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::domain::{Question, QuestionId};
use super::validation::AnswerConstraints;

/// Configuration errors found while loading a question set.
#[derive(Debug, thiserror::Error)]
pub enum QuestionnaireError {
    #[error("question id '{0}' is declared more than once")]
    DuplicateQuestion(QuestionId),
    #[error("question '{question}' has a condition on unknown question '{references}'")]
    UnknownReference {
        question: QuestionId,
        references: QuestionId,
    },
    #[error(
        "question '{question}' has a condition on '{references}', which does not appear before it"
    )]
    ForwardReference {
        question: QuestionId,
        references: QuestionId,
    },
    #[error("question '{question}' has invalid weight {weight}")]
    InvalidWeight { question: QuestionId, weight: f64 },
    #[error("choice question '{question}' declares no options")]
    MissingChoices { question: QuestionId },
    #[error("choice question '{question}' declares option '{value}' twice")]
    DuplicateChoice { question: QuestionId, value: String },
    #[error("question '{question}' has an invalid numeric range ({min:?}..{max:?})")]
    InvalidRange {
        question: QuestionId,
        min: Option<f64>,
        max: Option<f64>,
    },
    #[error("scale question '{question}' must declare both min and max")]
    MissingScaleRange { question: QuestionId },
    #[error("scale question '{question}' has invalid step {step}")]
    InvalidStep { question: QuestionId, step: f64 },
    #[error("question '{question}' has min_length {min} greater than max_length {max}")]
    InvalidLengthBounds {
        question: QuestionId,
        min: usize,
        max: usize,
    },
    #[error("question '{question}' has an invalid pattern: {source}")]
    InvalidPattern {
        question: QuestionId,
        #[source]
        source: regex::Error,
    },
}

/// Validated, read-only question list for one screening flow.
///
/// Conditions may only look backwards: every referenced question must be declared
/// strictly earlier, which rules out self references and cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Question>", into = "Vec<Question>")]
pub struct QuestionSet {
    questions: Vec<Question>,
    positions: HashMap<QuestionId, usize>,
    constraints: Vec<AnswerConstraints>,
}

impl QuestionSet {
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionnaireError> {
        let mut positions = HashMap::with_capacity(questions.len());
        for (index, question) in questions.iter().enumerate() {
            if positions.insert(question.id.clone(), index).is_some() {
                return Err(QuestionnaireError::DuplicateQuestion(question.id.clone()));
            }
        }

        let mut constraints = Vec::with_capacity(questions.len());
        for (index, question) in questions.iter().enumerate() {
            if !question.weight.is_finite() || question.weight < 0.0 {
                return Err(QuestionnaireError::InvalidWeight {
                    question: question.id.clone(),
                    weight: question.weight,
                });
            }

            for reference in question.referenced_questions() {
                match positions.get(reference) {
                    None => {
                        return Err(QuestionnaireError::UnknownReference {
                            question: question.id.clone(),
                            references: reference.clone(),
                        })
                    }
                    Some(position) if *position >= index => {
                        return Err(QuestionnaireError::ForwardReference {
                            question: question.id.clone(),
                            references: reference.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }

            constraints.push(AnswerConstraints::for_question(question)?);
        }

        Ok(Self {
            questions,
            positions,
            constraints,
        })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn get(&self, question_id: &str) -> Option<&Question> {
        self.positions
            .get(question_id)
            .map(|index| &self.questions[*index])
    }

    pub fn constraints(&self, question_id: &str) -> Option<&AnswerConstraints> {
        self.positions
            .get(question_id)
            .map(|index| &self.constraints[*index])
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.positions.contains_key(question_id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl TryFrom<Vec<Question>> for QuestionSet {
    type Error = QuestionnaireError;

    fn try_from(questions: Vec<Question>) -> Result<Self, Self::Error> {
        Self::new(questions)
    }
}

impl From<QuestionSet> for Vec<Question> {
    fn from(set: QuestionSet) -> Self {
        set.questions
    }
}
