use super::{Questionnaire, QuestionnaireId, ScreeningError, MAX_ITEM_SCORE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity band, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "Minimal")]
    Minimal,
    #[serde(rename = "Mild")]
    Mild,
    #[serde(rename = "Moderate")]
    Moderate,
    #[serde(rename = "Moderately severe")]
    ModeratelySevere,
    #[serde(rename = "Severe")]
    Severe,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Minimal => "Minimal",
            Severity::Mild => "Mild",
            Severity::Moderate => "Moderate",
            Severity::ModeratelySevere => "Moderately severe",
            Severity::Severe => "Severe",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Total score and its severity band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub questionnaire: QuestionnaireId,
    pub total: u32,
    pub severity: Severity,
}

/// Score a completed questionnaire.
///
/// The response set must have exactly one entry per item and every entry
/// must be in `0..=3`; anything else is rejected instead of being summed.
pub fn compute_score(
    questionnaire: QuestionnaireId,
    responses: &[u8],
) -> Result<ScoreResult, ScreeningError> {
    let definition = Questionnaire::get(questionnaire);

    if responses.len() != definition.item_count() {
        return Err(ScreeningError::WrongLength {
            questionnaire,
            expected: definition.item_count(),
            actual: responses.len(),
        });
    }

    if let Some((index, &value)) = responses
        .iter()
        .enumerate()
        .find(|(_, v)| **v > MAX_ITEM_SCORE)
    {
        return Err(ScreeningError::OutOfRange { index, value });
    }

    let total: u32 = responses.iter().map(|&v| u32::from(v)).sum();

    Ok(ScoreResult {
        questionnaire,
        total,
        severity: definition.severity_for(total),
    })
}

/// Score a questionnaire answered with option labels ("Several days", ...).
/// Returns the numeric responses alongside the score so callers can apply
/// item-level policy.
pub fn score_labels<S: AsRef<str>>(
    questionnaire: QuestionnaireId,
    labels: &[S],
) -> Result<(Vec<u8>, ScoreResult), ScreeningError> {
    let definition = Questionnaire::get(questionnaire);
    let responses = labels
        .iter()
        .map(|label| {
            definition
                .option_score(label.as_ref())
                .ok_or_else(|| ScreeningError::UnknownOption(label.as_ref().to_string()))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    let result = compute_score(questionnaire, &responses)?;
    Ok((responses, result))
}
