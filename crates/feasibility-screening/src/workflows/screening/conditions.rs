use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{Condition, ConditionOperator, QuestionAnswer, ResponseMap};

/// Evaluate one operator against an answer.
///
/// A missing answer never satisfies anything, negated operators included.
pub fn evaluate(
    answer: Option<&QuestionAnswer>,
    operator: ConditionOperator,
    target: &QuestionAnswer,
) -> bool {
    let Some(answer) = answer else {
        return false;
    };

    match operator {
        ConditionOperator::Equals => same_value(answer, target),
        ConditionOperator::NotEquals => !same_value(answer, target),
        ConditionOperator::Contains => contains(answer, target),
        ConditionOperator::NotContains => !contains(answer, target),
        ConditionOperator::GreaterThan => compare(answer, target, |lhs, rhs| lhs > rhs),
        ConditionOperator::LessThan => compare(answer, target, |lhs, rhs| lhs < rhs),
        ConditionOperator::Unrecognized => false,
    }
}

/// Look up the referenced answer and evaluate the condition against it.
pub fn condition_holds(condition: &Condition, responses: &ResponseMap) -> bool {
    evaluate(
        responses.get(condition.question_id.as_str()),
        condition.operator,
        &condition.value,
    )
}

/// Structural equality. Text naming an instant equals that instant, since
/// instants travel as strings once serialized.
fn same_value(answer: &QuestionAnswer, target: &QuestionAnswer) -> bool {
    match (answer, target) {
        (QuestionAnswer::Date(instant), QuestionAnswer::Text(raw))
        | (QuestionAnswer::Text(raw), QuestionAnswer::Date(instant)) => {
            parse_instant(raw) == Some(*instant)
        }
        _ => answer == target,
    }
}

fn contains(answer: &QuestionAnswer, target: &QuestionAnswer) -> bool {
    match answer {
        QuestionAnswer::List(items) => match target {
            QuestionAnswer::Text(needle) => items.iter().any(|item| item == needle),
            _ => false,
        },
        other => coerce_to_string(other).contains(&coerce_to_string(target)),
    }
}

fn compare(answer: &QuestionAnswer, target: &QuestionAnswer, op: fn(f64, f64) -> bool) -> bool {
    match (coerce_to_number(answer), coerce_to_number(target)) {
        (Some(lhs), Some(rhs)) => op(lhs, rhs),
        _ => false,
    }
}

pub(crate) fn coerce_to_string(answer: &QuestionAnswer) -> String {
    match answer {
        QuestionAnswer::Text(text) => text.clone(),
        QuestionAnswer::Number(value) => format_number(*value),
        QuestionAnswer::Boolean(flag) => flag.to_string(),
        QuestionAnswer::List(items) => items.join(","),
        QuestionAnswer::Date(instant) => instant.to_rfc3339(),
    }
}

/// `None` stands for "not a number"; comparisons against it are always false.
pub(crate) fn coerce_to_number(answer: &QuestionAnswer) -> Option<f64> {
    let value = match answer {
        QuestionAnswer::Number(value) => *value,
        QuestionAnswer::Text(text) => parse_number(text)
            .or_else(|| parse_instant(text).map(|instant| instant.timestamp_millis() as f64))?,
        QuestionAnswer::Boolean(flag) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        QuestionAnswer::List(items) => match items.as_slice() {
            [single] => parse_number(single)?,
            _ => return None,
        },
        QuestionAnswer::Date(instant) => instant.timestamp_millis() as f64,
    };

    (!value.is_nan()).then_some(value)
}

fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// RFC 3339 instants, or `YYYY-MM-DD` dates taken as midnight UTC.
fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    DateTime::parse_from_rfc3339(trimmed)
        .map(|instant| instant.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|midnight| midnight.and_utc())
        })
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
