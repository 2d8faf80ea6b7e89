use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

use super::super::conditions::coerce_to_number;
use super::super::domain::{FormatKind, Question, QuestionAnswer, QuestionId, QuestionType};
use super::super::questionnaire::QuestionnaireError;
use super::formats::FormatValidator;

/// Constraint set for one question, built once when the question set loads.
#[derive(Debug, Clone)]
pub struct AnswerConstraints {
    question_id: QuestionId,
    required: bool,
    message: Option<String>,
    kind: ConstraintKind,
}

/// What a present value must satisfy, per question type.
#[derive(Debug, Clone)]
pub(crate) enum ConstraintKind {
    Text {
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<Regex>,
        format: Option<FormatKind>,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
    },
    Format(FormatKind),
    Date,
    Time,
    DateTime,
    Boolean,
    SingleChoice {
        allowed: Vec<String>,
    },
    MultipleChoice {
        allowed: Vec<String>,
    },
    Scale {
        min: f64,
        max: f64,
        step: Option<f64>,
    },
    FileReference,
}

/// Reason an answer was refused at intake. Refused values never reach the response map.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnswerRejection {
    #[error("question '{question}' requires an answer")]
    Required { question: QuestionId },
    #[error("question '{question}' expects a {expected} answer")]
    WrongType {
        question: QuestionId,
        expected: &'static str,
    },
    #[error("answer to '{question}' must be at least {min} characters")]
    TooShort { question: QuestionId, min: usize },
    #[error("answer to '{question}' must be at most {max} characters")]
    TooLong { question: QuestionId, max: usize },
    #[error("answer to '{question}' does not match the expected pattern")]
    PatternMismatch { question: QuestionId },
    #[error("answer to '{question}' is not a valid {}", .format.label())]
    InvalidFormat {
        question: QuestionId,
        format: FormatKind,
    },
    #[error("answer {value} to '{question}' is outside the allowed range")]
    OutOfRange { question: QuestionId, value: f64 },
    #[error("answer '{value}' to '{question}' is not a valid {expected}")]
    InvalidTemporal {
        question: QuestionId,
        value: String,
        expected: &'static str,
    },
    #[error("'{value}' is not one of the options for '{question}'")]
    UnknownChoice { question: QuestionId, value: String },
    #[error("{message}")]
    Custom { question: QuestionId, message: String },
}

impl AnswerRejection {
    pub fn question(&self) -> &QuestionId {
        match self {
            AnswerRejection::Required { question }
            | AnswerRejection::WrongType { question, .. }
            | AnswerRejection::TooShort { question, .. }
            | AnswerRejection::TooLong { question, .. }
            | AnswerRejection::PatternMismatch { question }
            | AnswerRejection::InvalidFormat { question, .. }
            | AnswerRejection::OutOfRange { question, .. }
            | AnswerRejection::InvalidTemporal { question, .. }
            | AnswerRejection::UnknownChoice { question, .. }
            | AnswerRejection::Custom { question, .. } => question,
        }
    }
}

impl AnswerConstraints {
    pub fn for_question(question: &Question) -> Result<Self, QuestionnaireError> {
        let options = &question.options;
        let id = || question.id.clone();

        let kind = match question.question_type {
            QuestionType::ShortText | QuestionType::LongText => {
                if let (Some(min), Some(max)) = (options.min_length, options.max_length) {
                    if min > max {
                        return Err(QuestionnaireError::InvalidLengthBounds {
                            question: id(),
                            min,
                            max,
                        });
                    }
                }
                let pattern = options
                    .pattern
                    .as_deref()
                    .map(Regex::new)
                    .transpose()
                    .map_err(|source| QuestionnaireError::InvalidPattern {
                        question: id(),
                        source,
                    })?;
                ConstraintKind::Text {
                    min_length: options.min_length,
                    max_length: options.max_length,
                    pattern,
                    format: options.format,
                }
            }
            QuestionType::Number => {
                check_bounds(&question.id, options.min, options.max)?;
                ConstraintKind::Number {
                    min: options.min,
                    max: options.max,
                }
            }
            QuestionType::Email => ConstraintKind::Format(FormatKind::Email),
            QuestionType::Phone => ConstraintKind::Format(FormatKind::Phone),
            QuestionType::Url => ConstraintKind::Format(FormatKind::Url),
            QuestionType::Date => ConstraintKind::Date,
            QuestionType::Time => ConstraintKind::Time,
            QuestionType::DateTime => ConstraintKind::DateTime,
            QuestionType::Boolean => ConstraintKind::Boolean,
            QuestionType::SingleChoice | QuestionType::MultipleChoice => {
                let allowed = choice_values(question)?;
                if question.question_type == QuestionType::SingleChoice {
                    ConstraintKind::SingleChoice { allowed }
                } else {
                    ConstraintKind::MultipleChoice { allowed }
                }
            }
            QuestionType::Scale => {
                let (Some(min), Some(max)) = (options.min, options.max) else {
                    return Err(QuestionnaireError::MissingScaleRange { question: id() });
                };
                check_bounds(&question.id, Some(min), Some(max))?;
                if let Some(step) = options.step {
                    if !step.is_finite() || step <= 0.0 {
                        return Err(QuestionnaireError::InvalidStep {
                            question: id(),
                            step,
                        });
                    }
                }
                ConstraintKind::Scale {
                    min,
                    max,
                    step: options.step,
                }
            }
            QuestionType::FileReference => ConstraintKind::FileReference,
        };

        Ok(Self {
            question_id: question.id.clone(),
            required: question.is_required,
            message: options.error_message.clone(),
            kind,
        })
    }

    pub fn question_id(&self) -> &QuestionId {
        &self.question_id
    }

    /// Accept or reject a candidate value.
    ///
    /// On success returns the normalized value to store; `Ok(None)` means the
    /// optional answer was left empty and any previous value should be cleared.
    pub fn check(
        &self,
        value: Option<&QuestionAnswer>,
        formats: &dyn FormatValidator,
    ) -> Result<Option<QuestionAnswer>, AnswerRejection> {
        let value = match value {
            Some(value) if !value.is_empty_text() => value,
            _ => return self.unanswered(),
        };

        let normalized = match &self.kind {
            ConstraintKind::Text {
                min_length,
                max_length,
                pattern,
                format,
            } => self
                .check_text(value, *min_length, *max_length, pattern.as_ref(), *format, formats)
                .map_err(|rejection| self.with_custom_message(rejection))?,
            ConstraintKind::Number { min, max } => {
                let number = self.expect_number(value)?;
                self.check_range(number, *min, *max)?;
                QuestionAnswer::Number(number)
            }
            ConstraintKind::Format(kind) => {
                let text = self.expect_text(value)?.trim();
                if !formats.is_valid(*kind, text) {
                    return Err(AnswerRejection::InvalidFormat {
                        question: self.question_id.clone(),
                        format: *kind,
                    });
                }
                QuestionAnswer::Text(text.to_string())
            }
            ConstraintKind::Date => QuestionAnswer::Date(self.parse_date(value)?),
            ConstraintKind::DateTime => QuestionAnswer::Date(self.parse_datetime(value)?),
            ConstraintKind::Time => QuestionAnswer::Text(self.parse_time(value)?),
            ConstraintKind::Boolean => match value {
                QuestionAnswer::Boolean(flag) => QuestionAnswer::Boolean(*flag),
                _ => return Err(self.wrong_type("boolean")),
            },
            ConstraintKind::SingleChoice { allowed } => {
                let choice = self.expect_text(value)?;
                self.check_choice(allowed, choice)?;
                QuestionAnswer::Text(choice.to_string())
            }
            ConstraintKind::MultipleChoice { allowed } => {
                let QuestionAnswer::List(choices) = value else {
                    return Err(self.wrong_type("list of options"));
                };
                let mut selected: Vec<String> = Vec::with_capacity(choices.len());
                for choice in choices {
                    self.check_choice(allowed, choice)?;
                    if !selected.contains(choice) {
                        selected.push(choice.clone());
                    }
                }
                QuestionAnswer::List(selected)
            }
            ConstraintKind::Scale { min, max, step } => {
                let number = self.expect_number(value)?;
                self.check_range(number, Some(*min), Some(*max))?;
                QuestionAnswer::Number(snap_to_step(number, *min, *max, *step))
            }
            ConstraintKind::FileReference => {
                let reference = self.expect_text(value)?.trim();
                if reference.is_empty() {
                    return self.unanswered();
                }
                QuestionAnswer::Text(reference.to_string())
            }
        };

        Ok(Some(normalized))
    }

    fn check_text(
        &self,
        value: &QuestionAnswer,
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<&Regex>,
        format: Option<FormatKind>,
        formats: &dyn FormatValidator,
    ) -> Result<QuestionAnswer, AnswerRejection> {
        let text = self.expect_text(value)?;
        let length = text.chars().count();
        let question = || self.question_id.clone();

        if let Some(min) = min_length {
            if length < min {
                return Err(AnswerRejection::TooShort {
                    question: question(),
                    min,
                });
            }
        }
        if let Some(max) = max_length {
            if length > max {
                return Err(AnswerRejection::TooLong {
                    question: question(),
                    max,
                });
            }
        }
        if let Some(pattern) = pattern {
            if !pattern.is_match(text) {
                return Err(AnswerRejection::PatternMismatch {
                    question: question(),
                });
            }
        }
        if let Some(format) = format {
            if !formats.is_valid(format, text) {
                return Err(AnswerRejection::InvalidFormat {
                    question: question(),
                    format,
                });
            }
        }

        Ok(QuestionAnswer::Text(text.to_string()))
    }

    /// Absent or empty input: refused when required, otherwise clears the answer.
    fn unanswered(&self) -> Result<Option<QuestionAnswer>, AnswerRejection> {
        if self.required {
            Err(AnswerRejection::Required {
                question: self.question_id.clone(),
            })
        } else {
            Ok(None)
        }
    }

    fn with_custom_message(&self, rejection: AnswerRejection) -> AnswerRejection {
        match (&self.message, &rejection) {
            (_, AnswerRejection::WrongType { .. }) => rejection,
            (Some(message), _) => AnswerRejection::Custom {
                question: self.question_id.clone(),
                message: message.clone(),
            },
            (None, _) => rejection,
        }
    }

    fn expect_text<'v>(&self, value: &'v QuestionAnswer) -> Result<&'v str, AnswerRejection> {
        value.as_text().ok_or_else(|| self.wrong_type("text"))
    }

    fn expect_number(&self, value: &QuestionAnswer) -> Result<f64, AnswerRejection> {
        let number = match value {
            QuestionAnswer::Number(_) | QuestionAnswer::Text(_) => coerce_to_number(value),
            _ => None,
        };
        number
            .filter(|number| number.is_finite())
            .ok_or_else(|| self.wrong_type("numeric"))
    }

    fn check_range(
        &self,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<(), AnswerRejection> {
        let below = min.map(|min| value < min).unwrap_or(false);
        let above = max.map(|max| value > max).unwrap_or(false);
        if below || above {
            return Err(AnswerRejection::OutOfRange {
                question: self.question_id.clone(),
                value,
            });
        }
        Ok(())
    }

    fn check_choice(&self, allowed: &[String], choice: &str) -> Result<(), AnswerRejection> {
        if allowed.iter().any(|value| value == choice) {
            Ok(())
        } else {
            Err(AnswerRejection::UnknownChoice {
                question: self.question_id.clone(),
                value: choice.to_string(),
            })
        }
    }

    fn parse_date(&self, value: &QuestionAnswer) -> Result<DateTime<Utc>, AnswerRejection> {
        match value {
            QuestionAnswer::Date(instant) => Ok(*instant),
            QuestionAnswer::Text(raw) => {
                let trimmed = raw.trim();
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|midnight| midnight.and_utc())
                    .or_else(|| parse_rfc3339(trimmed))
                    .ok_or_else(|| self.invalid_temporal(raw, "date"))
            }
            _ => Err(self.wrong_type("date")),
        }
    }

    fn parse_datetime(&self, value: &QuestionAnswer) -> Result<DateTime<Utc>, AnswerRejection> {
        match value {
            QuestionAnswer::Date(instant) => Ok(*instant),
            QuestionAnswer::Text(raw) => {
                let trimmed = raw.trim();
                parse_rfc3339(trimmed)
                    .or_else(|| {
                        ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
                            .iter()
                            .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
                            .map(|naive| naive.and_utc())
                    })
                    .ok_or_else(|| self.invalid_temporal(raw, "date and time"))
            }
            _ => Err(self.wrong_type("date and time")),
        }
    }

    fn parse_time(&self, value: &QuestionAnswer) -> Result<String, AnswerRejection> {
        let raw = self.expect_text(value)?;
        let trimmed = raw.trim();
        ["%H:%M:%S", "%H:%M"]
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
            .map(|time| time.format("%H:%M:%S").to_string())
            .ok_or_else(|| self.invalid_temporal(raw, "time"))
    }

    fn wrong_type(&self, expected: &'static str) -> AnswerRejection {
        AnswerRejection::WrongType {
            question: self.question_id.clone(),
            expected,
        }
    }

    fn invalid_temporal(&self, raw: &str, expected: &'static str) -> AnswerRejection {
        AnswerRejection::InvalidTemporal {
            question: self.question_id.clone(),
            value: raw.to_string(),
            expected,
        }
    }
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|instant| instant.with_timezone(&Utc))
}

/// Round to the nearest step on the `min`-anchored grid, staying inside `max`.
fn snap_to_step(value: f64, min: f64, max: f64, step: Option<f64>) -> f64 {
    let Some(step) = step else {
        return value;
    };

    let mut snapped = min + ((value - min) / step).round() * step;
    if snapped > max {
        snapped -= step;
    }
    (snapped * 1e9).round() / 1e9
}

fn check_bounds(
    question: &QuestionId,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<(), QuestionnaireError> {
    let finite = min.map(f64::is_finite).unwrap_or(true) && max.map(f64::is_finite).unwrap_or(true);
    let ordered = match (min, max) {
        (Some(min), Some(max)) => min <= max,
        _ => true,
    };

    if finite && ordered {
        Ok(())
    } else {
        Err(QuestionnaireError::InvalidRange {
            question: question.clone(),
            min,
            max,
        })
    }
}

fn choice_values(question: &Question) -> Result<Vec<String>, QuestionnaireError> {
    let choices = &question.options.choices;
    if choices.is_empty() {
        return Err(QuestionnaireError::MissingChoices {
            question: question.id.clone(),
        });
    }

    let mut values: Vec<String> = Vec::with_capacity(choices.len());
    for choice in choices {
        if values.contains(&choice.value) {
            return Err(QuestionnaireError::DuplicateChoice {
                question: question.id.clone(),
                value: choice.value.clone(),
            });
        }
        values.push(choice.value.clone());
    }

    Ok(values)
}
