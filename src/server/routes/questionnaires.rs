use axum::extract::Path;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::screening::{score_labels, Questionnaire, QuestionnaireId, ScreeningReport};
use crate::server::error::ApiError;

#[derive(Serialize)]
pub struct QuestionnaireSummary {
    id: QuestionnaireId,
    title: &'static str,
    item_count: usize,
}

pub async fn list_questionnaires() -> Json<Vec<QuestionnaireSummary>> {
    let summaries = QuestionnaireId::ALL
        .iter()
        .map(|id| {
            let q = Questionnaire::get(*id);
            QuestionnaireSummary {
                id: q.id,
                title: q.title,
                item_count: q.item_count(),
            }
        })
        .collect();
    Json(summaries)
}

pub async fn get_questionnaire(
    Path(id): Path<String>,
) -> Result<Json<&'static Questionnaire>, ApiError> {
    let id: QuestionnaireId = id.parse()?;
    Ok(Json(Questionnaire::get(id)))
}

/// Either numeric scores or option labels, one per item
#[derive(Deserialize)]
pub struct ScreeningRequest {
    pub questionnaire: String,
    #[serde(default)]
    pub responses: Option<Vec<u8>>,
    #[serde(default)]
    pub answers: Option<Vec<String>>,
}

pub async fn submit_screening(
    Json(request): Json<ScreeningRequest>,
) -> Result<Json<ScreeningReport>, ApiError> {
    let id: QuestionnaireId = request.questionnaire.parse()?;

    let report = match (request.responses, request.answers) {
        (Some(responses), None) => ScreeningReport::evaluate(id, &responses)?,
        (None, Some(answers)) => {
            let (responses, result) = score_labels(id, &answers)?;
            ScreeningReport::new(result, &responses)
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Provide exactly one of `responses` or `answers`".to_string(),
            ))
        }
    };

    tracing::info!(questionnaire = %report.questionnaire, "Screening scored");

    Ok(Json(report))
}
