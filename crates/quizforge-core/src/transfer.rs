//! Import and export of quizzes and whole-state bundles.
//!
//! CSV rows are `prompt;answer;tags` with space-separated tags. Import is
//! best-effort and never fails; JSON imports fail with [`QuizError::Import`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::QuizError;
use crate::model::{
    new_id, Difficulty, ExamAttempt, ExamPreset, PracticeAttempt, Question, QuestionType, Quiz,
};

pub const BUNDLE_VERSION: &str = "1.0";
pub const CSV_HEADER: &str = "prompt;answer;tags";

/// Everything a backup carries. Arrays missing from an imported file are
/// treated as empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    #[serde(default)]
    pub exam_presets: Vec<ExamPreset>,
    #[serde(default)]
    pub exam_attempts: Vec<ExamAttempt>,
    #[serde(default)]
    pub practice_attempts: Vec<PracticeAttempt>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    BUNDLE_VERSION.to_string()
}

impl Default for ExportBundle {
    fn default() -> Self {
        Self {
            quizzes: Vec::new(),
            exam_presets: Vec::new(),
            exam_attempts: Vec::new(),
            practice_attempts: Vec::new(),
            version: default_version(),
        }
    }
}

impl ExportBundle {
    pub fn to_json(&self) -> Result<String, QuizError> {
        serde_json::to_string_pretty(self).map_err(|e| QuizError::Import(e.to_string()))
    }
}

/// Parse a backup file.
pub fn parse_bundle(text: &str) -> Result<ExportBundle, QuizError> {
    let bundle: ExportBundle =
        serde_json::from_str(text).map_err(|e| QuizError::Import(e.to_string()))?;
    debug!(
        quizzes = bundle.quizzes.len(),
        exam_attempts = bundle.exam_attempts.len(),
        version = %bundle.version,
        "parsed export bundle"
    );
    Ok(bundle)
}

/// `quizforge-backup-YYYY-MM-DD.json`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("quizforge-backup-{}.json", date.format("%Y-%m-%d"))
}

pub fn export_quiz_json(quiz: &Quiz) -> Result<String, QuizError> {
    serde_json::to_string_pretty(quiz).map_err(|e| QuizError::Import(e.to_string()))
}

pub fn import_quiz_json(text: &str) -> Result<Quiz, QuizError> {
    serde_json::from_str(text).map_err(|e| QuizError::Import(e.to_string()))
}

/// Build a quiz of short-answer questions from semicolon-separated rows.
///
/// The first non-blank line is a header if it contains "prompt" in any case.
/// Missing prompts become `Q{n}`; missing answers and tags become empty.
pub fn import_csv(text: &str, today: NaiveDate) -> Quiz {
    let has_header = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .is_some_and(|l| l.to_lowercase().contains("prompt"));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (line, record) in reader.records().enumerate() {
        match record {
            Ok(record) => {
                let fields: Vec<String> = record.iter().map(str::to_string).collect();
                if fields.iter().all(|f| f.is_empty()) {
                    continue;
                }
                rows.push(fields);
            }
            Err(e) => warn!(line, error = %e, "skipping unreadable CSV row"),
        }
    }
    if has_header && !rows.is_empty() {
        rows.remove(0);
    }

    let questions = rows
        .into_iter()
        .enumerate()
        .map(|(i, fields)| {
            let field = |n: usize| fields.get(n).map(String::as_str).unwrap_or("");
            let prompt = match field(0) {
                "" => format!("Q{}", i + 1),
                p => p.to_string(),
            };
            Question {
                id: new_id(),
                kind: QuestionType::Short,
                prompt,
                choices: Vec::new(),
                answer_text: Some(field(1).to_string()),
                explanation: None,
                tags: field(2).split_whitespace().map(str::to_string).collect(),
                time_limit_sec: None,
                difficulty: Some(Difficulty::Medium),
            }
        })
        .collect::<Vec<_>>();

    debug!(questions = questions.len(), "imported CSV");
    Quiz::new(
        format!("Imported {}", today.format("%Y-%m-%d")),
        "Imported",
        questions,
    )
}

/// Render a quiz as `prompt;answer;tags` rows under a header line.
pub fn export_csv(quiz: &Quiz) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for question in &quiz.questions {
        let fields = [
            question.prompt.clone(),
            question.answer_summary(),
            question.tags.join(" "),
        ];
        let row: Vec<String> = fields.iter().map(|f| escape_csv_field(f)).collect();
        out.push_str(&row.join(";"));
        out.push('\n');
    }
    out
}

/// Quote a field containing a separator, comma, quote or line break.
pub fn escape_csv_field(field: &str) -> String {
    if field.contains([';', ',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
