//! Error types for the quiz core and provider integrations.
//!
//! `ProviderError` lives here so the assistant session can classify
//! failures without depending on any particular provider crate.

use thiserror::Error;

/// Errors raised by the state store, the exam machine, and the transfer layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuizError {
    /// No quiz with the given id exists.
    #[error("quiz not found: {0}")]
    QuizNotFound(String),

    /// The quiz exists but has no questions to examine.
    #[error("quiz {0} has no questions")]
    EmptyQuiz(String),

    /// A quiz payload that breaks the quiz invariants.
    #[error("invalid quiz: {0}")]
    InvalidQuiz(String),

    /// A review grade outside 1..=4.
    #[error("invalid review grade: {0} (expected 1-4 or again/hard/good/easy)")]
    InvalidGrade(String),

    /// An exam attempt that violates the attempt invariants.
    #[error("invalid exam attempt: {0}")]
    InvalidAttempt(String),

    /// An action that is not allowed in the current exam phase.
    #[error("cannot {action} while exam is in {phase} phase")]
    InvalidTransition { phase: String, action: String },

    /// An import payload that could not be parsed.
    #[error("import failed: {0}")]
    Import(String),
}

/// Errors that can occur when talking to a text-generation provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No API key has been configured for the provider.
    #[error("no API key found, set one in quizforge.toml or QUIZFORGE_OPENAI_KEY")]
    MissingApiKey,

    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
