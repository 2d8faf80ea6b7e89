use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Stable identifier of a question, shared by the response map and condition targets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl QuestionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for QuestionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Closed set of answer widgets a question can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    ShortText,
    LongText,
    Number,
    Email,
    Phone,
    Url,
    Date,
    Time,
    #[serde(rename = "datetime")]
    DateTime,
    Boolean,
    SingleChoice,
    MultipleChoice,
    Scale,
    FileReference,
}

impl QuestionType {
    pub const fn label(self) -> &'static str {
        match self {
            QuestionType::ShortText => "short-text",
            QuestionType::LongText => "long-text",
            QuestionType::Number => "number",
            QuestionType::Email => "email",
            QuestionType::Phone => "phone",
            QuestionType::Url => "url",
            QuestionType::Date => "date",
            QuestionType::Time => "time",
            QuestionType::DateTime => "datetime",
            QuestionType::Boolean => "boolean",
            QuestionType::SingleChoice => "single-choice",
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::Scale => "scale",
            QuestionType::FileReference => "file-reference",
        }
    }
}

/// Formats checked by an external predicate rather than by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatKind {
    Email,
    Phone,
    Url,
    PostalCode,
    NationalId,
}

impl FormatKind {
    pub const fn label(self) -> &'static str {
        match self {
            FormatKind::Email => "email address",
            FormatKind::Phone => "phone number",
            FormatKind::Url => "URL",
            FormatKind::PostalCode => "postal code",
            FormatKind::NationalId => "national ID number",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

/// Type-specific payload. Which fields matter depends on the question type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoiceOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatKind>,
}

/// One screening question as authored in a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: QuestionOptions,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_logic: Option<ConditionalLogic>,
}

impl Question {
    /// Every question this one's visibility depends on.
    pub fn referenced_questions(&self) -> impl Iterator<Item = &QuestionId> {
        self.conditional_logic
            .iter()
            .flat_map(|logic| logic.show_if.iter().chain(logic.hide_if.iter()))
            .map(|condition| &condition.question_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionalLogic {
    pub show_if: Vec<Condition>,
    pub hide_if: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub question_id: QuestionId,
    pub operator: ConditionOperator,
    pub value: QuestionAnswer,
}

impl Condition {
    pub fn new(
        question_id: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<QuestionAnswer>,
    ) -> Self {
        Self {
            question_id: QuestionId(question_id.into()),
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    /// Any operator the engine does not know; it never matches.
    #[serde(other)]
    Unrecognized,
}

/// A single answer value.
///
/// JSON strings always deserialize as [`QuestionAnswer::Text`]. Only intake for
/// `date` and `datetime` questions produces [`QuestionAnswer::Date`], which
/// serializes back to an RFC 3339 string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuestionAnswer {
    Boolean(bool),
    Number(f64),
    Date(DateTime<Utc>),
    Text(String),
    List(Vec<String>),
}

/// Wire shape of an answer; instants arrive as plain strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnswerRepr {
    Boolean(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl<'de> Deserialize<'de> for QuestionAnswer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match AnswerRepr::deserialize(deserializer)? {
            AnswerRepr::Boolean(flag) => QuestionAnswer::Boolean(flag),
            AnswerRepr::Number(value) => QuestionAnswer::Number(value),
            AnswerRepr::Text(text) => QuestionAnswer::Text(text),
            AnswerRepr::List(items) => QuestionAnswer::List(items),
        })
    }
}

impl QuestionAnswer {
    /// Only an empty string counts as "no answer"; `0`, `false` and `[]` are answers.
    pub fn is_empty_text(&self) -> bool {
        matches!(self, QuestionAnswer::Text(text) if text.is_empty())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            QuestionAnswer::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for QuestionAnswer {
    fn from(value: &str) -> Self {
        QuestionAnswer::Text(value.to_string())
    }
}

impl From<String> for QuestionAnswer {
    fn from(value: String) -> Self {
        QuestionAnswer::Text(value)
    }
}

impl From<f64> for QuestionAnswer {
    fn from(value: f64) -> Self {
        QuestionAnswer::Number(value)
    }
}

impl From<i32> for QuestionAnswer {
    fn from(value: i32) -> Self {
        QuestionAnswer::Number(f64::from(value))
    }
}

impl From<bool> for QuestionAnswer {
    fn from(value: bool) -> Self {
        QuestionAnswer::Boolean(value)
    }
}

impl From<Vec<String>> for QuestionAnswer {
    fn from(value: Vec<String>) -> Self {
        QuestionAnswer::List(value)
    }
}

impl From<DateTime<Utc>> for QuestionAnswer {
    fn from(value: DateTime<Utc>) -> Self {
        QuestionAnswer::Date(value)
    }
}

/// Answers of one screening session keyed by question id.
///
/// `null` values in serialized form mean "unanswered" and are dropped on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<QuestionId, Option<QuestionAnswer>>",
    into = "BTreeMap<QuestionId, QuestionAnswer>"
)]
pub struct ResponseMap {
    answers: BTreeMap<QuestionId, QuestionAnswer>,
}

impl ResponseMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: &str) -> Option<&QuestionAnswer> {
        self.answers.get(question_id)
    }

    /// Replace one answer; `None` clears it. Returns the previous value.
    pub fn set(
        &mut self,
        question_id: QuestionId,
        answer: Option<QuestionAnswer>,
    ) -> Option<QuestionAnswer> {
        match answer {
            Some(answer) => self.answers.insert(question_id, answer),
            None => self.answers.remove(question_id.as_str()),
        }
    }

    /// Present and not an empty string.
    pub fn is_answered(&self, question_id: &str) -> bool {
        self.get(question_id)
            .map(|answer| !answer.is_empty_text())
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &QuestionAnswer)> {
        self.answers.iter()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

impl From<BTreeMap<QuestionId, Option<QuestionAnswer>>> for ResponseMap {
    fn from(raw: BTreeMap<QuestionId, Option<QuestionAnswer>>) -> Self {
        Self {
            answers: raw
                .into_iter()
                .filter_map(|(id, answer)| answer.map(|answer| (id, answer)))
                .collect(),
        }
    }
}

impl From<ResponseMap> for BTreeMap<QuestionId, QuestionAnswer> {
    fn from(map: ResponseMap) -> Self {
        map.answers
    }
}

impl<K: Into<String>> FromIterator<(K, QuestionAnswer)> for ResponseMap {
    fn from_iter<I: IntoIterator<Item = (K, QuestionAnswer)>>(iter: I) -> Self {
        Self {
            answers: iter
                .into_iter()
                .map(|(id, answer)| (QuestionId(id.into()), answer))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn answers_deserialize_into_matching_variants() {
        let parsed: Vec<QuestionAnswer> = serde_json::from_value(json!([
            true,
            42,
            "2025-03-01T08:30:00Z",
            "south-facing",
            ["battery", "ev-charger"]
        ]))
        .expect("answers parse");

        assert_eq!(parsed[0], QuestionAnswer::Boolean(true));
        assert_eq!(parsed[1], QuestionAnswer::Number(42.0));
        assert_eq!(parsed[2], QuestionAnswer::from("2025-03-01T08:30:00Z"));
        assert_eq!(parsed[3], QuestionAnswer::from("south-facing"));
        assert_eq!(
            parsed[4],
            QuestionAnswer::List(vec!["battery".to_string(), "ev-charger".to_string()])
        );
    }

    #[test]
    fn response_map_drops_null_entries() {
        let map: ResponseMap = serde_json::from_value(json!({
            "roof_type": "metal",
            "roof_area": null
        }))
        .expect("map parses");

        assert_eq!(map.len(), 1);
        assert!(map.get("roof_area").is_none());
    }

    #[test]
    fn empty_string_is_not_answered_but_false_and_zero_are() {
        let mut map = ResponseMap::new();
        map.set("a".into(), Some(QuestionAnswer::from("")));
        map.set("b".into(), Some(QuestionAnswer::Boolean(false)));
        map.set("c".into(), Some(QuestionAnswer::Number(0.0)));
        map.set("d".into(), Some(QuestionAnswer::List(Vec::new())));

        assert!(!map.is_answered("a"));
        assert!(map.is_answered("b"));
        assert!(map.is_answered("c"));
        assert!(map.is_answered("d"));
        assert!(!map.is_answered("missing"));
    }

    #[test]
    fn setting_none_clears_the_answer() {
        let mut map: ResponseMap = [("a", QuestionAnswer::from("yes"))].into_iter().collect();
        let previous = map.set("a".into(), None);

        assert_eq!(previous, Some(QuestionAnswer::from("yes")));
        assert!(map.is_empty());
    }

    #[test]
    fn unknown_operator_deserializes_as_unrecognized() {
        let condition: Condition = serde_json::from_value(json!({
            "question_id": "a",
            "operator": "matches_regex",
            "value": "x"
        }))
        .expect("condition parses");

        assert_eq!(condition.operator, ConditionOperator::Unrecognized);
    }
}
