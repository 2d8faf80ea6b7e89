use super::conditions::condition_holds;
use super::domain::{Question, ResponseMap};

/// Questions currently shown to the respondent, in authoring order.
///
/// Recomputed from scratch on every response change; each question's
/// visibility depends only on the responses, never on other questions' visibility.
pub fn compute_visible<'q>(questions: &'q [Question], responses: &ResponseMap) -> Vec<&'q Question> {
    questions
        .iter()
        .filter(|question| is_visible(question, responses))
        .collect()
}

pub fn is_visible(question: &Question, responses: &ResponseMap) -> bool {
    let Some(logic) = &question.conditional_logic else {
        return true;
    };

    let should_show = logic.show_if.is_empty()
        || logic
            .show_if
            .iter()
            .any(|condition| condition_holds(condition, responses));

    if !should_show {
        return false;
    }

    !logic
        .hide_if
        .iter()
        .any(|condition| condition_holds(condition, responses))
}
