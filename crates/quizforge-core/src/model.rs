//! Core data model types for quizforge.
//!
//! Field names serialize in camelCase so persisted state and export bundles
//! stay readable by earlier versions of the application.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// One day in milliseconds.
pub const DAY_MS: i64 = 86_400_000;

/// Generate a fresh identity string.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Kind of question, which decides selection and scoring rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Single,
    Multi,
    TrueFalse,
    Text,
    Code,
    Short,
}

impl QuestionType {
    /// Whether the question is answered by picking choices.
    pub fn is_choice_based(self) -> bool {
        matches!(
            self,
            QuestionType::Single | QuestionType::Multi | QuestionType::TrueFalse
        )
    }

    /// Whether the question is answered with free text.
    pub fn is_free_text(self) -> bool {
        !self.is_choice_based()
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::Single => write!(f, "single"),
            QuestionType::Multi => write!(f, "multi"),
            QuestionType::TrueFalse => write!(f, "truefalse"),
            QuestionType::Text => write!(f, "text"),
            QuestionType::Code => write!(f, "code"),
            QuestionType::Short => write!(f, "short"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(QuestionType::Single),
            "multi" | "multiple" => Ok(QuestionType::Multi),
            "truefalse" | "true-false" | "tf" => Ok(QuestionType::TrueFalse),
            "text" => Ok(QuestionType::Text),
            "code" => Ok(QuestionType::Code),
            "short" => Ok(QuestionType::Short),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// Difficulty level attached to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// One selectable answer of a choice-based question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub correct: bool,
}

impl Choice {
    pub fn new(text: impl Into<String>, correct: bool) -> Self {
        Self {
            id: new_id(),
            text: text.into(),
            correct,
        }
    }
}

/// A single quiz question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_sec: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

impl Question {
    /// Ids of every choice marked correct, in choice order.
    pub fn correct_choice_ids(&self) -> Vec<&str> {
        self.choices
            .iter()
            .filter(|c| c.correct)
            .map(|c| c.id.as_str())
            .collect()
    }

    pub fn has_choice(&self, choice_id: &str) -> bool {
        self.choices.iter().any(|c| c.id == choice_id)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// The reference answer: `answer_text`, or the correct choices' texts.
    pub fn answer_summary(&self) -> String {
        match &self.answer_text {
            Some(text) if !text.is_empty() => text.clone(),
            _ => self
                .choices
                .iter()
                .filter(|c| c.correct)
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// A citation backing a question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A quiz owns its questions and the citations attached to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Citations keyed by question id.
    #[serde(default)]
    pub sources: BTreeMap<String, Vec<SourceRef>>,
}

impl Quiz {
    pub fn new(title: impl Into<String>, topic: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            topic: topic.into(),
            questions,
            sources: BTreeMap::new(),
        }
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn sources_for(&self, question_id: &str) -> &[SourceRef] {
        self.sources
            .get(question_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct tags in order of first appearance.
    pub fn tags(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        let mut tags = Vec::new();
        for tag in self.questions.iter().flat_map(|q| q.tags.iter()) {
            if seen.insert(tag.as_str()) {
                tags.push(tag.as_str());
            }
        }
        tags
    }
}

/// Spaced-repetition state for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    pub question_id: String,
    /// Days until the item is expected to be forgotten.
    pub stability: f64,
    /// 0..1, how quickly stability grows on success.
    pub difficulty: f64,
    pub due_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PracticeMode {
    Learn,
    Timed,
    Cram,
}

impl fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PracticeMode::Learn => write!(f, "learn"),
            PracticeMode::Timed => write!(f, "timed"),
            PracticeMode::Cram => write!(f, "cram"),
        }
    }
}

impl FromStr for PracticeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "learn" => Ok(PracticeMode::Learn),
            "timed" => Ok(PracticeMode::Timed),
            "cram" => Ok(PracticeMode::Cram),
            other => Err(format!("unknown practice mode: {other}")),
        }
    }
}

/// Lightweight answer record of a practice session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeAnswer {
    pub question_id: String,
    pub correct: bool,
    #[serde(default)]
    pub time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeAttempt {
    pub id: String,
    pub quiz_id: String,
    pub mode: PracticeMode,
    pub started_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
    #[serde(default)]
    pub answers: Vec<PracticeAnswer>,
}

impl PracticeAttempt {
    pub fn new(quiz_id: impl Into<String>, mode: PracticeMode, now: Timestamp) -> Self {
        Self {
            id: new_id(),
            quiz_id: quiz_id.into(),
            mode,
            started_at: now,
            finished_at: None,
            answers: Vec::new(),
        }
    }
}

/// A named exam format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPreset {
    pub id: String,
    pub name: String,
    pub num_questions: usize,
    pub total_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_names: Option<Vec<String>>,
}

/// The presets every fresh state starts with.
pub fn default_presets() -> Vec<ExamPreset> {
    let preset = |id: &str, name: &str, num_questions, total_minutes| ExamPreset {
        id: id.into(),
        name: name.into(),
        num_questions,
        total_minutes,
        section_names: None,
    };
    vec![
        preset("aws-ccp-65x90", "AWS CCP", 65, 90),
        preset("secplus-90x90", "Security+", 90, 90),
        preset("custom-20x30", "Quick Test", 20, 30),
    ]
}

/// Question count and time limit chosen without a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomExamConfig {
    pub num_questions: usize,
    pub total_minutes: u32,
}

/// A scored answer, frozen when the attempt finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAnswer {
    pub question_id: String,
    #[serde(default)]
    pub selected: Vec<String>,
    pub correct: bool,
    #[serde(default)]
    pub time_ms: u64,
    #[serde(default)]
    pub changed_count: u32,
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub eliminated: Vec<String>,
}

/// A timed run through a subset of a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAttempt {
    pub id: String,
    pub quiz_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomExamConfig>,
    pub started_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
    pub total_minutes: u32,
    pub question_ids: Vec<String>,
    #[serde(default)]
    pub current: usize,
    /// Selected choice ids, or the singleton free-text answer.
    #[serde(default)]
    pub selected: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub eliminated: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub flagged: BTreeMap<String, bool>,
    #[serde(default)]
    pub answers: Vec<ExamAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default)]
    pub auto_submitted: bool,
    /// Milliseconds credited to each question so far.
    #[serde(default)]
    pub time_spent_ms: BTreeMap<String, u64>,
    /// Number of selection changes per question.
    #[serde(default)]
    pub change_counts: BTreeMap<String, u32>,
    /// When the current question was entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entered_current_at: Option<Timestamp>,
}

impl ExamAttempt {
    pub fn contains(&self, question_id: &str) -> bool {
        self.question_ids.iter().any(|id| id == question_id)
    }

    pub fn current_question_id(&self) -> Option<&str> {
        self.question_ids.get(self.current).map(String::as_str)
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// Which answers an exam review shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewFilter {
    Wrong,
    Flagged,
    #[default]
    All,
}

impl fmt::Display for ReviewFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewFilter::Wrong => write!(f, "wrong"),
            ReviewFilter::Flagged => write!(f, "flagged"),
            ReviewFilter::All => write!(f, "all"),
        }
    }
}

impl FromStr for ReviewFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wrong" => Ok(ReviewFilter::Wrong),
            "flagged" => Ok(ReviewFilter::Flagged),
            "all" => Ok(ReviewFilter::All),
            other => Err(format!("unknown review filter: {other}")),
        }
    }
}

/// Cursor over the answers of a finished attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewMode {
    pub attempt_id: String,
    #[serde(default)]
    pub filter: ReviewFilter,
    #[serde(default)]
    pub index: usize,
}

/// Question subset assembled from weak tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroDrill {
    pub quiz_id: String,
    pub question_ids: Vec<String>,
}
