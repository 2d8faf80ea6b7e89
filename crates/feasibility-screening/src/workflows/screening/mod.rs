//! Dynamic screening questionnaire: visibility, intake validation, progress,
//! scoring and classification, plus the session, service and HTTP layers that
//! carry them.

pub(crate) mod classification;
pub mod conditions;
pub mod domain;
pub mod progress;
pub mod questionnaire;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod session;
pub mod template;
pub mod validation;
pub mod visibility;

#[cfg(test)]
mod tests;

pub use classification::{
    classify, AnswerRule, BandGuidance, ClassificationRules, EstimateRange, EstimateRules,
    FeasibilityBands, FeasibilityRating, FollowUpPriority, GuidanceKind, GuidanceRule, MatchMode,
    Projection, ProjectionMethod, QualificationLevel, RulesError, ScreeningResult, TableStep,
};
pub use conditions::{condition_holds, evaluate};
pub use domain::{
    ChoiceOption, Condition, ConditionOperator, ConditionalLogic, FormatKind, Question,
    QuestionAnswer, QuestionId, QuestionOptions, QuestionType, ResponseMap,
};
pub use progress::{compute_progress, missing_required, QuestionnaireProgress};
pub use questionnaire::{QuestionSet, QuestionnaireError};
pub use repository::{
    AlertError, FollowUpAlert, FollowUpPublisher, RepositoryError, ScreeningId, ScreeningRecord,
    ScreeningRepository, ScreeningStatusView,
};
pub use router::screening_router;
pub use scoring::{score, ScoreSummary};
pub use service::{ScreeningService, ScreeningServiceError};
pub use session::{ScreeningSession, SessionError, SessionSnapshot, SessionStatus};
pub use template::{ScreeningTemplate, TemplateError};
pub use validation::{
    AnswerConstraints, AnswerRejection, FormatValidator, StandardFormats,
};
pub use visibility::{compute_visible, is_visible};
