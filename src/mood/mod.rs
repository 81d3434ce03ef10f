//! Mood tracker
//!
//! Session-scoped, in-memory mood log with a simple trend and an overall
//! outlook. Nothing here is written to disk.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    VeryHappy,
    Happy,
    Neutral,
    Sad,
    VerySad,
}

impl Mood {
    /// Display order, happiest first
    pub const ALL: [Mood; 5] = [
        Mood::VeryHappy,
        Mood::Happy,
        Mood::Neutral,
        Mood::Sad,
        Mood::VerySad,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Mood::VeryHappy => "Very Happy",
            Mood::Happy => "Happy",
            Mood::Neutral => "Neutral",
            Mood::Sad => "Sad",
            Mood::VerySad => "Very Sad",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::VeryHappy => "😀",
            Mood::Happy => "🙂",
            Mood::Neutral => "😐",
            Mood::Sad => "🙁",
            Mood::VerySad => "😢",
        }
    }

    /// Wellbeing score, higher is better (0..=4)
    pub fn score(&self) -> u8 {
        match self {
            Mood::VeryHappy => 4,
            Mood::Happy => 3,
            Mood::Neutral => 2,
            Mood::Sad => 1,
            Mood::VerySad => 0,
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.emoji(), self.label())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase();

        Mood::ALL
            .into_iter()
            .find(|m| m.label().replace(' ', "").eq_ignore_ascii_case(&key))
            .ok_or_else(|| format!("Unknown mood: {}", s))
    }
}

/// One logged mood
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub date: NaiveDate,
    pub mood: Mood,
    pub emoji: String,
    pub label: String,
    pub note: String,
}

/// A point on the mood trend line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outlook {
    Positive,
    Fluctuating,
    Low,
}

impl Outlook {
    pub fn message(&self) -> &'static str {
        match self {
            Outlook::Positive => "You seem to be feeling positive overall. Keep it up! 😊",
            Outlook::Low => {
                "You've been feeling low. Consider reaching out or using other mental health tools."
            }
            Outlook::Fluctuating => {
                "Your mood is fluctuating. Try to identify patterns or triggers in your notes."
            }
        }
    }
}

/// Everything the mood panel renders
#[derive(Debug, Clone, Serialize)]
pub struct MoodSummary {
    pub entries: Vec<MoodEntry>,
    pub trend: Vec<TrendPoint>,
    pub average: Option<f64>,
    pub outlook: Option<Outlook>,
    pub message: Option<&'static str>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoodHistory {
    entries: Vec<MoodEntry>,
}

impl MoodHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; the note is trimmed
    pub fn log(&mut self, mood: Mood, note: impl Into<String>, date: NaiveDate) -> &MoodEntry {
        self.entries.push(MoodEntry {
            date,
            mood,
            emoji: mood.emoji().to_string(),
            label: mood.label().to_string(),
            note: note.into().trim().to_string(),
        });
        tracing::debug!(mood = mood.label(), %date, "Mood logged");
        &self.entries[self.entries.len() - 1]
    }

    /// Append an entry dated today (local time)
    pub fn log_today(&mut self, mood: Mood, note: impl Into<String>) -> &MoodEntry {
        let today = chrono::Local::now().date_naive();
        self.log(mood, note, today)
    }

    pub fn entries(&self) -> &[MoodEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Scores ordered by date; same-day entries keep logging order
    pub fn trend(&self) -> Vec<TrendPoint> {
        let mut points: Vec<TrendPoint> = self
            .entries
            .iter()
            .map(|e| TrendPoint {
                date: e.date,
                score: e.mood.score(),
            })
            .collect();
        points.sort_by_key(|p| p.date);
        points
    }

    pub fn average_score(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        let sum: u32 = self.entries.iter().map(|e| u32::from(e.mood.score())).sum();
        Some(f64::from(sum) / self.entries.len() as f64)
    }

    pub fn outlook(&self) -> Option<Outlook> {
        self.average_score().map(|avg| {
            if avg >= 3.0 {
                Outlook::Positive
            } else if avg <= 1.0 {
                Outlook::Low
            } else {
                Outlook::Fluctuating
            }
        })
    }

    pub fn summary(&self) -> MoodSummary {
        let outlook = self.outlook();
        MoodSummary {
            entries: self.entries.clone(),
            trend: self.trend(),
            average: self.average_score(),
            outlook,
            message: outlook.map(|o| o.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_parse_mood() {
        assert_eq!("Very Happy".parse::<Mood>(), Ok(Mood::VeryHappy));
        assert_eq!("very_sad".parse::<Mood>(), Ok(Mood::VerySad));
        assert_eq!("neutral".parse::<Mood>(), Ok(Mood::Neutral));
        assert!("ecstatic".parse::<Mood>().is_err());
    }

    #[test]
    fn test_empty_history() {
        let history = MoodHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.average_score(), None);
        assert_eq!(history.outlook(), None);
        assert!(history.trend().is_empty());
    }

    #[test]
    fn test_log_entry() {
        let mut history = MoodHistory::new();
        let entry = history.log(Mood::Happy, "  slept well ", day(1));
        assert_eq!(entry.emoji, "🙂");
        assert_eq!(entry.label, "Happy");
        assert_eq!(entry.note, "slept well");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_trend_sorted_by_date() {
        let mut history = MoodHistory::new();
        history.log(Mood::Sad, "", day(3));
        history.log(Mood::VeryHappy, "", day(1));
        history.log(Mood::Neutral, "", day(2));

        let dates: Vec<NaiveDate> = history.trend().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3)]);
        let scores: Vec<u8> = history.trend().iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![4, 2, 1]);
    }

    #[test]
    fn test_outlook_thresholds() {
        let mut history = MoodHistory::new();
        history.log(Mood::VeryHappy, "", day(1));
        history.log(Mood::Happy, "", day(2));
        assert_eq!(history.outlook(), Some(Outlook::Positive));

        let mut history = MoodHistory::new();
        history.log(Mood::VerySad, "", day(1));
        history.log(Mood::Sad, "", day(2));
        assert_eq!(history.outlook(), Some(Outlook::Low));

        let mut history = MoodHistory::new();
        history.log(Mood::VeryHappy, "", day(1));
        history.log(Mood::VerySad, "", day(2));
        assert_eq!(history.outlook(), Some(Outlook::Fluctuating));
    }

    #[test]
    fn test_summary() {
        let mut history = MoodHistory::new();
        history.log(Mood::Neutral, "work", day(4));
        let summary = history.summary();
        assert_eq!(summary.entries.len(), 1);
        assert_eq!(summary.average, Some(2.0));
        assert_eq!(summary.message, Some(Outlook::Fluctuating.message()));
    }
}
