use super::{ScreeningError, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two supported instruments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionnaireId {
    #[serde(rename = "PHQ-9", alias = "phq9", alias = "PHQ9")]
    Phq9,
    #[serde(rename = "GAD-7", alias = "gad7", alias = "GAD7")]
    Gad7,
}

impl QuestionnaireId {
    pub const ALL: [QuestionnaireId; 2] = [QuestionnaireId::Phq9, QuestionnaireId::Gad7];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionnaireId::Phq9 => "PHQ-9",
            QuestionnaireId::Gad7 => "GAD-7",
        }
    }
}

impl fmt::Display for QuestionnaireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionnaireId {
    type Err = ScreeningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "phq9" => Ok(QuestionnaireId::Phq9),
            "gad7" => Ok(QuestionnaireId::Gad7),
            _ => Err(ScreeningError::UnknownQuestionnaire(s.to_string())),
        }
    }
}

/// A labelled answer choice and the score it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResponseOption {
    pub label: &'static str,
    pub score: u8,
}

/// Shared by both instruments: "over the last 2 weeks, how often..."
pub const RESPONSE_OPTIONS: [ResponseOption; 4] = [
    ResponseOption {
        label: "Not at all",
        score: 0,
    },
    ResponseOption {
        label: "Several days",
        score: 1,
    },
    ResponseOption {
        label: "More than half the days",
        score: 2,
    },
    ResponseOption {
        label: "Nearly every day",
        score: 3,
    },
];

const PHQ9_ITEMS: [&str; 9] = [
    "Little interest or pleasure in doing things?",
    "Feeling down, depressed, or hopeless?",
    "Trouble falling or staying asleep, or sleeping too much?",
    "Feeling tired or having little energy?",
    "Poor appetite or overeating?",
    "Feeling bad about yourself - or that you are a failure or have let yourself or your family down?",
    "Trouble concentrating on things, such as reading the newspaper or watching television?",
    "Moving or speaking so slowly that other people could have noticed? Or the opposite - being so fidgety or restless that you have been moving a lot more than usual?",
    "Thoughts that you would be better off dead or of hurting yourself in some way?",
];

const GAD7_ITEMS: [&str; 7] = [
    "Feeling nervous, anxious, or on edge?",
    "Not being able to stop or control worrying?",
    "Worrying too much about different things?",
    "Trouble relaxing?",
    "Being so restless that it is hard to sit still?",
    "Becoming easily annoyed or irritable?",
    "Feeling afraid as if something awful might happen?",
];

/// Upper-exclusive bounds: a total below `bound` falls in `severity`.
/// Totals at or above the last bound are `Severe`.
const PHQ9_BANDS: [(u32, Severity); 4] = [
    (5, Severity::Minimal),
    (10, Severity::Mild),
    (15, Severity::Moderate),
    (20, Severity::ModeratelySevere),
];

const GAD7_BANDS: [(u32, Severity); 3] = [
    (5, Severity::Minimal),
    (10, Severity::Mild),
    (15, Severity::Moderate),
];

/// Immutable questionnaire definition
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Questionnaire {
    pub id: QuestionnaireId,
    pub title: &'static str,
    pub items: &'static [&'static str],
    pub options: &'static [ResponseOption],
    #[serde(skip)]
    bands: &'static [(u32, Severity)],
}

static PHQ9: Questionnaire = Questionnaire {
    id: QuestionnaireId::Phq9,
    title: "PHQ-9 (Depression Screening)",
    items: &PHQ9_ITEMS,
    options: &RESPONSE_OPTIONS,
    bands: &PHQ9_BANDS,
};

static GAD7: Questionnaire = Questionnaire {
    id: QuestionnaireId::Gad7,
    title: "GAD-7 (Anxiety Screening)",
    items: &GAD7_ITEMS,
    options: &RESPONSE_OPTIONS,
    bands: &GAD7_BANDS,
};

impl Questionnaire {
    pub fn get(id: QuestionnaireId) -> &'static Questionnaire {
        match id {
            QuestionnaireId::Phq9 => &PHQ9,
            QuestionnaireId::Gad7 => &GAD7,
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Score carried by an option label, matched case-insensitively
    pub fn option_score(&self, label: &str) -> Option<u8> {
        self.options
            .iter()
            .find(|opt| opt.label.eq_ignore_ascii_case(label.trim()))
            .map(|opt| opt.score)
    }

    /// Step-function lookup of a total against this questionnaire's bands
    pub fn severity_for(&self, total: u32) -> Severity {
        self.bands
            .iter()
            .find(|(bound, _)| total < *bound)
            .map(|(_, severity)| *severity)
            .unwrap_or(Severity::Severe)
    }
}
