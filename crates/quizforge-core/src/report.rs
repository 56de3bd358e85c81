//! Exam results report with JSON persistence and Markdown rendering.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analytics::{
    analyze_performance, history_summary, AnalysisResult, HistorySummary, ScoredAttempt,
};
use crate::error::QuizError;
use crate::exam::{human_time, score_attempt, ScoreSummary};
use crate::model::{ExamAttempt, QuestionType, Quiz, Timestamp};

/// A complete results report for one finished exam attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Summary of the quiz (without the full questions).
    pub quiz: QuizSummary,
    pub attempt_id: String,
    #[serde(default)]
    pub preset_id: Option<String>,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    /// Wall-clock time between start and finish.
    pub duration_ms: u64,
    pub total_minutes: u32,
    pub auto_submitted: bool,
    pub score: ScoreSummary,
    /// Score of the attempt before this one on the same quiz.
    #[serde(default)]
    pub previous_score: Option<u32>,
    /// One row per question, in exam order.
    pub rows: Vec<QuestionRow>,
    /// Tag and difficulty breakdown over every attempt of the quiz.
    pub analysis: AnalysisResult,
    pub history: HistorySummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: String,
    pub title: String,
    pub topic: String,
    pub question_count: usize,
}

/// How one question went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRow {
    pub question_id: String,
    pub prompt: String,
    pub kind: QuestionType,
    #[serde(default)]
    pub tags: Vec<String>,
    pub correct: bool,
    /// Selected choice texts, or the free-text answer.
    #[serde(default)]
    pub selected: Vec<String>,
    /// The reference answer.
    pub expected: String,
    pub time_ms: u64,
    pub changed_count: u32,
    pub flagged: bool,
}

impl ExamReport {
    /// Build the report for a finished `attempt` of `quiz`.
    ///
    /// `attempts` should hold every attempt of the quiz, including this one;
    /// it feeds the analysis and history sections.
    pub fn build(
        quiz: &Quiz,
        attempt: &ExamAttempt,
        attempts: &[ScoredAttempt<'_>],
    ) -> Result<Self, QuizError> {
        let finished_at = attempt.finished_at.ok_or_else(|| {
            QuizError::InvalidAttempt(format!("attempt {} is not finished", attempt.id))
        })?;
        if attempt.quiz_id != quiz.id {
            return Err(QuizError::InvalidAttempt(format!(
                "attempt {} belongs to quiz {}",
                attempt.id, attempt.quiz_id
            )));
        }

        let rows = attempt
            .answers
            .iter()
            .map(|answer| {
                let question = quiz.question(&answer.question_id);
                let selected = match question {
                    Some(q) if q.kind.is_choice_based() => answer
                        .selected
                        .iter()
                        .map(|id| {
                            q.choices
                                .iter()
                                .find(|c| &c.id == id)
                                .map(|c| c.text.clone())
                                .unwrap_or_else(|| id.clone())
                        })
                        .collect(),
                    _ => answer.selected.clone(),
                };
                QuestionRow {
                    question_id: answer.question_id.clone(),
                    prompt: question.map(|q| q.prompt.clone()).unwrap_or_default(),
                    kind: question.map(|q| q.kind).unwrap_or(QuestionType::Single),
                    tags: question.map(|q| q.tags.clone()).unwrap_or_default(),
                    correct: answer.correct,
                    selected,
                    expected: question.map(|q| q.answer_summary()).unwrap_or_default(),
                    time_ms: answer.time_ms,
                    changed_count: answer.changed_count,
                    flagged: answer.flagged,
                }
            })
            .collect();

        let previous_score = attempts
            .iter()
            .filter_map(|a| match a {
                ScoredAttempt::Exam(other) if other.id != attempt.id => {
                    let at = other.finished_at?;
                    (at <= finished_at).then_some((at, other.score?))
                }
                _ => None,
            })
            .max_by_key(|(at, _)| *at)
            .map(|(_, score)| score);

        Ok(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            quiz: QuizSummary {
                id: quiz.id.clone(),
                title: quiz.title.clone(),
                topic: quiz.topic.clone(),
                question_count: quiz.questions.len(),
            },
            attempt_id: attempt.id.clone(),
            preset_id: attempt.preset_id.clone(),
            started_at: attempt.started_at,
            finished_at,
            duration_ms: (finished_at - attempt.started_at).max(0) as u64,
            total_minutes: attempt.total_minutes,
            auto_submitted: attempt.auto_submitted,
            score: score_attempt(attempt),
            previous_score,
            rows,
            analysis: analyze_performance(quiz, attempts),
            history: history_summary(attempts),
        })
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ExamReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Change in score against the previous attempt, in percentage points.
    pub fn score_delta(&self) -> Option<i64> {
        self.previous_score
            .map(|prev| self.score.score_pct as i64 - prev as i64)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("# {} results\n\n", self.quiz.title));
        md.push_str(&format!(
            "**Score:** {}% ({}/{} correct)",
            self.score.score_pct, self.score.correct_count, self.score.total
        ));
        if let Some(delta) = self.score_delta() {
            md.push_str(&format!(" ({delta:+} vs previous)"));
        }
        md.push_str("\n\n");
        md.push_str(&format!(
            "**Time:** {} of {} minutes{}\n\n",
            human_time(self.duration_ms),
            self.total_minutes,
            if self.auto_submitted {
                " (auto-submitted)"
            } else {
                ""
            }
        ));

        md.push_str("| # | Question | Result | Your answer | Time | Changes |\n");
        md.push_str("|---|----------|--------|-------------|------|---------|\n");
        for (i, row) in self.rows.iter().enumerate() {
            md.push_str(&format!(
                "| {} | {}{} | {} | {} | {} | {} |\n",
                i + 1,
                row.prompt.replace('|', "\\|"),
                if row.flagged { " (flagged)" } else { "" },
                if row.correct { "correct" } else { "wrong" },
                row.selected.join(", ").replace('|', "\\|"),
                human_time(row.time_ms),
                row.changed_count
            ));
        }
        md.push('\n');

        if !self.analysis.top_weaknesses.is_empty() {
            md.push_str("### Weaknesses\n\n");
            for w in &self.analysis.top_weaknesses {
                md.push_str(&format!(
                    "- **{}**: {:.0}% errors. {}\n",
                    w.tag,
                    w.err_rate * 100.0,
                    w.note
                ));
            }
            md.push('\n');
        }

        if !self.analysis.top_strengths.is_empty() {
            md.push_str("### Strengths\n\n");
            for s in &self.analysis.top_strengths {
                md.push_str(&format!("- **{}**: {:.0}% accuracy\n", s.tag, s.acc_rate * 100.0));
            }
            md.push('\n');
        }

        md
    }
}
