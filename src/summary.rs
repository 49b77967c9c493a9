//! Request and result records shared by the extractor, the agent and the front ends.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::router::Mode;

/// A single summarization request as received from a front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizationRequest {
    /// URL or literal text to summarize
    pub input: String,
    /// Mode picked by the caller; `None` means auto-detect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
}

impl SummarizationRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Outcome of extracting a web page.
///
/// Either `success` with `content` populated, or a failure with `error` set and empty
/// `content` and `title`. Build values through [`ExtractionResult::ok`] and
/// [`ExtractionResult::failed`] to keep that shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractionResult {
    /// The extracted text content
    pub content: String,
    /// The page title
    pub title: String,
    /// Whether the fetch was successful
    pub success: bool,
    /// Error message if fetch failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn ok(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            title: title.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            title: String::new(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Outcome of one orchestration call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub text: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SummaryResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Ceiling on tool invocations within one orchestration call.
///
/// Created fresh for every request and consumed as tools run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolInvocationBudget {
    limit: usize,
    used: usize,
}

impl ToolInvocationBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    /// Take one invocation from the budget, returning `false` when none is left.
    pub fn try_consume(&mut self) -> bool {
        if self.used < self.limit {
            self.used += 1;
            true
        } else {
            false
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
