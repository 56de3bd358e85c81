//! Question-authoring and study-coach conversations.
//!
//! The assistant keeps the chat history for one session and, in build mode,
//! scans every reply for an embedded JSON array of question items. It never
//! touches application state; callers decide what to do with parsed items.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analytics::AnalysisResult;
use crate::error::ProviderError;
use crate::model::{new_id, Choice, Difficulty, Question, QuestionType};
use crate::traits::{ChatMessage, ChatRequest, LlmProvider};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// System prompt for generating quiz items.
pub const BUILD_SYSTEM_PROMPT: &str = r#"You are an expert exam item writer. Output **strict JSON** only with an array `items`. Each item: { type: "single"|"multi"|"truefalse"|"text", prompt: string, choices?: [{text:string, correct?:boolean}], answerText?: string, tags?: string[], difficulty?: "easy"|"medium"|"hard", explanation?: string }.

Follow the project style. Keep explanations concise. Prefer 30–60 word prompts when needed. Avoid ambiguous stems."#;

/// System prompt for the study coach.
pub const STUDY_SYSTEM_PROMPT: &str = "You are a calm study coach. Use Socratic hints first, then short explanations with one key takeaway. If I paste a mistake summary, propose a 5-question micro-drill. Keep responses < 200 words unless I ask for more.";

static FENCED_ARRAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\[.*?\])\s*```").expect("valid fenced array regex")
});
static BRACKETED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("valid bracket regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantMode {
    Build,
    Study,
}

impl AssistantMode {
    pub fn system_prompt(self) -> &'static str {
        match self {
            AssistantMode::Build => BUILD_SYSTEM_PROMPT,
            AssistantMode::Study => STUDY_SYSTEM_PROMPT,
        }
    }
}

impl fmt::Display for AssistantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssistantMode::Build => write!(f, "build"),
            AssistantMode::Study => write!(f, "study"),
        }
    }
}

impl FromStr for AssistantMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "build" => Ok(AssistantMode::Build),
            "study" => Ok(AssistantMode::Study),
            other => Err(format!("unknown assistant mode: {other}")),
        }
    }
}

/// A question as written by the model, before it gets identities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedItem {
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub prompt: String,
    #[serde(default)]
    pub choices: Option<Vec<ParsedChoice>>,
    #[serde(default)]
    pub answer_text: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedChoice {
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

#[derive(Deserialize)]
struct ItemsEnvelope {
    items: Vec<serde_json::Value>,
}

fn parse_array(candidate: &str) -> Option<Vec<ParsedItem>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(candidate).ok()?;
    Some(collect_items(values))
}

fn collect_items(values: Vec<serde_json::Value>) -> Vec<ParsedItem> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<ParsedItem>(value) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!(error = %e, "skipping malformed item");
                None
            }
        })
        .collect()
}

/// Find question items in a model reply.
///
/// Tries a fenced JSON array, then the widest bracketed span, then the whole
/// text (an array, or an object with an `items` array).
pub fn extract_items(text: &str) -> Option<Vec<ParsedItem>> {
    if let Some(items) = FENCED_ARRAY_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_array(m.as_str()))
    {
        return Some(items);
    }

    if let Some(items) = BRACKETED_RE
        .find(text)
        .and_then(|m| parse_array(m.as_str()))
    {
        return Some(items);
    }

    if let Some(items) = parse_array(text.trim()) {
        return Some(items);
    }

    match serde_json::from_str::<ItemsEnvelope>(text.trim()) {
        Ok(envelope) => Some(collect_items(envelope.items)),
        Err(_) => {
            warn!("no question items found in response");
            None
        }
    }
}

/// Turn parsed items into questions with fresh identities.
pub fn items_to_questions(items: &[ParsedItem], fallback_tag: &str) -> Vec<Question> {
    items
        .iter()
        .map(|item| Question {
            id: new_id(),
            kind: item.kind,
            prompt: item.prompt.clone(),
            choices: item
                .choices
                .iter()
                .flatten()
                .map(|c| Choice::new(c.text.clone(), c.correct))
                .collect(),
            answer_text: item.answer_text.clone(),
            explanation: Some(item.explanation.clone().unwrap_or_default()),
            tags: item
                .tags
                .clone()
                .unwrap_or_else(|| vec![fallback_tag.to_string()]),
            time_limit_sec: None,
            difficulty: Some(item.difficulty.unwrap_or(Difficulty::Medium)),
        })
        .collect()
}

/// Opening message for the study coach after an exam.
pub fn coach_message(analysis: &AnalysisResult) -> String {
    let tags: Vec<&str> = analysis
        .top_weaknesses
        .iter()
        .map(|w| w.tag.as_str())
        .collect();
    if tags.is_empty() {
        "I just finished an exam. Give me study tips for improvement.".to_string()
    } else {
        format!(
            "I'm weak on {}. Explain the main misconceptions and give a 6-step plan for the next week.",
            tags.join(", ")
        )
    }
}

/// Result of one exchange with the assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub content: String,
    /// Items found in the reply (build mode only).
    pub items: Option<Vec<ParsedItem>>,
}

/// One assistant conversation.
#[derive(Debug, Clone)]
pub struct Assistant {
    mode: AssistantMode,
    model: String,
    temperature: f64,
    max_tokens: u32,
    history: Vec<ChatMessage>,
}

impl Assistant {
    pub fn new(mode: AssistantMode) -> Self {
        Self {
            mode,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            history: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn mode(&self) -> AssistantMode {
        self.mode
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Send a user message. Blank input is ignored and returns `Ok(None)`.
    ///
    /// A failed call is recorded in the history as `Error: ...` and returned.
    pub async fn send(
        &mut self,
        provider: &dyn LlmProvider,
        input: &str,
    ) -> Result<Option<AssistantReply>, ProviderError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        if self.history.is_empty() {
            self.history
                .push(ChatMessage::system(self.mode.system_prompt()));
        }
        self.history.push(ChatMessage::user(input));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: self.history.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        match provider.chat(&request).await {
            Ok(response) => {
                self.history
                    .push(ChatMessage::assistant(response.content.clone()));
                let items = match self.mode {
                    AssistantMode::Build => extract_items(&response.content),
                    AssistantMode::Study => None,
                };
                Ok(Some(AssistantReply {
                    content: response.content,
                    items,
                }))
            }
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "assistant request failed");
                self.history.push(ChatMessage::assistant(format!("Error: {e}")));
                Err(e)
            }
        }
    }
}
