//! Mental-health screening questionnaires
//!
//! Fixed PHQ-9 (depression) and GAD-7 (anxiety) definitions, a pure scorer
//! that maps a completed response set to a total and a severity band, and
//! the caller-side policy (crisis notice, follow-up resources) that surfaces
//! apply on top of a score.

pub mod policy;
mod questionnaire;
mod scoring;

pub use policy::{crisis_notice, resources, ScreeningReport, CRISIS_NOTICE};
pub use questionnaire::{Questionnaire, QuestionnaireId, ResponseOption, RESPONSE_OPTIONS};
pub use scoring::{compute_score, score_labels, ScoreResult, Severity};

use thiserror::Error;

/// Highest score a single item can carry
pub const MAX_ITEM_SCORE: u8 = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScreeningError {
    #[error("Unknown questionnaire: {0} (expected PHQ-9 or GAD-7)")]
    UnknownQuestionnaire(String),

    #[error("{questionnaire} expects {expected} responses, got {actual}")]
    WrongLength {
        questionnaire: QuestionnaireId,
        expected: usize,
        actual: usize,
    },

    #[error("Response {index} is {value}, must be between 0 and 3")]
    OutOfRange { index: usize, value: u8 },

    #[error("Unknown response option: {0}")]
    UnknownOption(String),
}
