//! quizforge-report: renders finished exam reports for people.
//!
//! JSON and Markdown rendering live next to [`quizforge_core::report::ExamReport`];
//! this crate adds the self-contained HTML page.

pub mod html;

pub use html::{generate_html, write_html_report};
