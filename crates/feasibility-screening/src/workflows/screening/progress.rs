use serde::{Deserialize, Serialize};

use super::domain::{Question, QuestionId, ResponseMap};

/// Live completion view, recomputed after every response change and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireProgress {
    pub total_questions: usize,
    pub answered_questions: usize,
    pub required_questions: usize,
    pub answered_required_questions: usize,
    pub percent_complete: u8,
    pub can_submit: bool,
    /// Presence-weighted estimate shown before submission; the authoritative
    /// score comes from the scoring pass at submit time.
    pub current_score: f64,
}

pub fn compute_progress(visible: &[&Question], responses: &ResponseMap) -> QuestionnaireProgress {
    let mut answered_questions = 0;
    let mut required_questions = 0;
    let mut answered_required_questions = 0;
    let mut current_score = 0.0;

    for question in visible {
        let answered = responses.is_answered(question.id.as_str());
        if answered {
            answered_questions += 1;
            current_score += question.weight;
        }
        if question.is_required {
            required_questions += 1;
            if answered {
                answered_required_questions += 1;
            }
        }
    }

    QuestionnaireProgress {
        total_questions: visible.len(),
        answered_questions,
        required_questions,
        answered_required_questions,
        percent_complete: percent(answered_questions as f64, visible.len() as f64),
        can_submit: answered_required_questions == required_questions,
        current_score,
    }
}

/// Visible required questions still lacking an answer, in authoring order.
pub fn missing_required(visible: &[&Question], responses: &ResponseMap) -> Vec<QuestionId> {
    visible
        .iter()
        .filter(|question| question.is_required && !responses.is_answered(question.id.as_str()))
        .map(|question| question.id.clone())
        .collect()
}

/// `round(100 * part / whole)` clamped to `0..=100`; zero when `whole` is zero.
pub(crate) fn percent(part: f64, whole: f64) -> u8 {
    if whole <= 0.0 || !whole.is_finite() {
        return 0;
    }
    (100.0 * part / whole).round().clamp(0.0, 100.0) as u8
}
