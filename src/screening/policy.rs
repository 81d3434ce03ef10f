//! What a surface shows next to a score
//!
//! The scorer never looks at individual items. Anything item-specific, such
//! as the PHQ-9 self-harm question, is decided here by the caller.

use super::{compute_score, QuestionnaireId, ScoreResult, ScreeningError, Severity};
use serde::Serialize;

/// 0-indexed position of the PHQ-9 self-harm item
pub const PHQ9_SELF_HARM_ITEM: usize = 8;

pub const CRISIS_NOTICE: &str = "If you are having thoughts of self-harm, please seek help immediately: https://www.opencounseling.com/suicide-hotlines";

const PHQ9_RESOURCES: &[&str] = &["https://www.mentalhealth.gov/get-help"];
const GAD7_RESOURCES: &[&str] = &["https://adaa.org/find-help"];

/// Crisis notice for a submitted response set, if one must be shown.
pub fn crisis_notice(questionnaire: QuestionnaireId, responses: &[u8]) -> Option<&'static str> {
    match questionnaire {
        QuestionnaireId::Phq9 => responses
            .get(PHQ9_SELF_HARM_ITEM)
            .filter(|&&v| v >= 1)
            .map(|_| CRISIS_NOTICE),
        QuestionnaireId::Gad7 => None,
    }
}

/// Follow-up resource links for a questionnaire
pub fn resources(questionnaire: QuestionnaireId) -> &'static [&'static str] {
    match questionnaire {
        QuestionnaireId::Phq9 => PHQ9_RESOURCES,
        QuestionnaireId::Gad7 => GAD7_RESOURCES,
    }
}

/// Everything a surface renders after a submission
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningReport {
    pub questionnaire: QuestionnaireId,
    pub total: u32,
    pub severity: Severity,
    pub crisis_notice: Option<&'static str>,
    pub resources: &'static [&'static str],
}

impl ScreeningReport {
    pub fn new(result: ScoreResult, responses: &[u8]) -> Self {
        Self {
            questionnaire: result.questionnaire,
            total: result.total,
            severity: result.severity,
            crisis_notice: crisis_notice(result.questionnaire, responses),
            resources: resources(result.questionnaire),
        }
    }

    /// Score `responses` and attach the caller policy
    pub fn evaluate(
        questionnaire: QuestionnaireId,
        responses: &[u8],
    ) -> Result<Self, ScreeningError> {
        let result = compute_score(questionnaire, responses)?;
        Ok(Self::new(result, responses))
    }

    /// One-line summary, e.g. "Your PHQ-9 Score: 12 (Moderate)"
    pub fn headline(&self) -> String {
        format!(
            "Your {} Score: {} ({})",
            self.questionnaire, self.total, self.severity
        )
    }
}
