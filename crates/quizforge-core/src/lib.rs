//! quizforge-core: quiz model, review scheduling, exams and analytics.
//!
//! This crate holds everything that does not talk to the network or the
//! terminal: the data model, the spaced-repetition scheduler, the exam state
//! machine, performance analysis, CSV/JSON transfer, and the state store that
//! ties them together.

pub mod analytics;
pub mod assistant;
pub mod clock;
pub mod countdown;
pub mod error;
pub mod exam;
pub mod model;
pub mod report;
pub mod scheduler;
pub mod storage;
pub mod store;
pub mod transfer;
pub mod traits;
pub mod trust;

pub use error::{ProviderError, QuizError};
