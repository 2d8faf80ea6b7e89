use std::io::Read;

use serde::{Deserialize, Deserializer};

use super::normalizer::normalize_question_id;

#[derive(Debug)]
pub(crate) struct RawResponse {
    pub(crate) question_id: String,
    pub(crate) answer: Option<String>,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<RawResponse>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for record in csv_reader.deserialize::<ResponseRow>() {
        let row = record?;
        let question_id = normalize_question_id(&row.question_id);
        if question_id.is_empty() {
            continue;
        }

        rows.push(RawResponse {
            question_id,
            answer: row.answer,
        });
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct ResponseRow {
    #[serde(rename = "Question ID")]
    question_id: String,
    #[serde(rename = "Answer", default, deserialize_with = "empty_string_as_none")]
    answer: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// `yes`/`no` style spellings used by spreadsheet exports.
pub(crate) fn parse_boolean(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_number(value: &str) -> Option<f64> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|number| number.is_finite())
}

pub(crate) fn split_choices(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|choice| !choice.is_empty())
        .map(str::to_string)
        .collect()
}
