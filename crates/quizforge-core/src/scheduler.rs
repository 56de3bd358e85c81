//! Review scheduling.
//!
//! A deliberately simple stability/difficulty heuristic. Stability may grow
//! without bound under repeated "easy" grades while difficulty stays within
//! [0.15, 0.9]; stored cards depend on this exact behavior.
//!
//! Grades:
//! - 1 (again): stability halves (floor 1), difficulty +0.15 (cap 0.9)
//! - 2 (hard):  stability × (1 + 0.2·difficulty)
//! - 3 (good):  stability × (1 + 0.6·difficulty)
//! - 4 (easy):  stability × (1 + 0.9·difficulty), difficulty −0.1 (floor 0.15)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QuizError;
use crate::model::{ReviewCard, Timestamp, DAY_MS};

const INITIAL_STABILITY: f64 = 1.0;
const INITIAL_DIFFICULTY: f64 = 0.3;
const MAX_DIFFICULTY: f64 = 0.9;
const MIN_DIFFICULTY: f64 = 0.15;

/// Recall grade given after reviewing a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl TryFrom<u8> for Grade {
    type Error = QuizError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Grade::Again),
            2 => Ok(Grade::Hard),
            3 => Ok(Grade::Good),
            4 => Ok(Grade::Easy),
            other => Err(QuizError::InvalidGrade(other.to_string())),
        }
    }
}

impl FromStr for Grade {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "again" => Ok(Grade::Again),
            "2" | "hard" => Ok(Grade::Hard),
            "3" | "good" => Ok(Grade::Good),
            "4" | "easy" => Ok(Grade::Easy),
            other => Err(QuizError::InvalidGrade(other.to_string())),
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Again => write!(f, "again"),
            Grade::Hard => write!(f, "hard"),
            Grade::Good => write!(f, "good"),
            Grade::Easy => write!(f, "easy"),
        }
    }
}

/// A fresh card, due immediately.
pub fn initialize(question_id: &str, now: Timestamp) -> ReviewCard {
    ReviewCard {
        question_id: question_id.to_string(),
        stability: INITIAL_STABILITY,
        difficulty: INITIAL_DIFFICULTY,
        due_at: now,
        last_seen_at: None,
    }
}

/// Apply a grade and compute the next due date.
pub fn grade(card: &ReviewCard, grade: Grade, now: Timestamp) -> ReviewCard {
    let mut stability = if card.stability.is_finite() && card.stability > 0.0 {
        card.stability
    } else {
        INITIAL_STABILITY
    };
    let mut difficulty = if card.difficulty.is_finite() {
        card.difficulty
    } else {
        INITIAL_DIFFICULTY
    };

    match grade {
        Grade::Again => {
            stability = (stability * 0.5).max(1.0);
            difficulty = (difficulty + 0.15).min(MAX_DIFFICULTY);
        }
        Grade::Hard => {
            stability *= 1.0 + 0.2 * difficulty;
        }
        Grade::Good => {
            stability *= 1.0 + 0.6 * difficulty;
        }
        Grade::Easy => {
            stability *= 1.0 + 0.9 * difficulty;
            difficulty = (difficulty - 0.1).max(MIN_DIFFICULTY);
        }
    }

    let next_due_days = stability.max(1.0).round() as i64;
    ReviewCard {
        question_id: card.question_id.clone(),
        stability,
        difficulty,
        due_at: now.saturating_add(next_due_days.saturating_mul(DAY_MS)),
        last_seen_at: Some(now),
    }
}

/// Human explanation of why a card is up for review.
pub fn why_now(card: &ReviewCard, now: Timestamp) -> String {
    let last = card.last_seen_at.unwrap_or(now);
    let days_since = ((now - last) as f64 / DAY_MS as f64).round().max(0.0) as i64;
    let stability = if card.stability > 0.0 {
        card.stability
    } else {
        INITIAL_STABILITY
    };
    let approx = (stability * 10.0).round() / 10.0;
    format!(
        "Scheduled today because stability≈{approx} days; last seen {days_since} days ago."
    )
}

pub fn is_due(card: &ReviewCard, now: Timestamp) -> bool {
    card.due_at <= now
}

/// Cards due at `now`, soonest first.
pub fn due_cards<'a, I>(cards: I, now: Timestamp) -> Vec<&'a ReviewCard>
where
    I: IntoIterator<Item = &'a ReviewCard>,
{
    let mut due: Vec<&ReviewCard> = cards.into_iter().filter(|c| is_due(c, now)).collect();
    due.sort_by(|a, b| {
        a.due_at
            .cmp(&b.due_at)
            .then_with(|| a.question_id.cmp(&b.question_id))
    });
    due
}
