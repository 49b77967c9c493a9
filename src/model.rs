//! Provider-neutral view of a generative model that can call tools.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::tools::ToolDeclaration;

/// Errors surfaced by a model endpoint.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model endpoint unreachable: {0}")]
    Transport(String),
    #[error("model endpoint returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("malformed model response: {0}")]
    InvalidResponse(String),
    #[error("model returned no answer: {0}")]
    Empty(String),
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// A request from the model to run a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
    /// Opaque token some endpoints require to be echoed back with the call
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    ToolCall(ToolCall),
    ToolResult { name: String, output: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }
}

/// One model turn to generate.
#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub system: &'a str,
    pub transcript: &'a [Message],
    pub tools: &'a [ToolDeclaration],
    /// When false the model must answer in text
    pub allow_tools: bool,
}

/// What the model produced for one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_call(name: impl Into<String>, args: Value) -> Self {
        Self {
            text: None,
            tool_calls: vec![ToolCall {
                name: name.into(),
                args,
                signature: None,
            }],
        }
    }

    /// The message to append to the transcript for this reply.
    pub fn to_message(&self) -> Message {
        let mut parts = Vec::new();
        if let Some(text) = &self.text {
            parts.push(Part::Text(text.clone()));
        }
        parts.extend(self.tool_calls.iter().cloned().map(Part::ToolCall));
        Message {
            role: Role::Model,
            parts,
        }
    }
}

/// A generative model endpoint.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Produce the next turn for the given conversation.
    async fn generate(&self, request: ModelRequest<'_>) -> Result<ModelReply, ModelError>;
}
