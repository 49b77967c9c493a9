//! Tools the agent can offer to the model.
//!
//! A tool is described by a [`ToolDeclaration`] (name, description and JSON schemas derived
//! with schemars) and invoked with untrusted JSON arguments. Arguments are checked against
//! the typed input record before anything runs.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::{JsonSchema, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::router::parse_web_url;
use crate::scraper::Extractor;
use crate::summary::ExtractionResult;

pub const FETCH_WEB_CONTENT: &str = "fetch-web-content";

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidInput { tool: String, reason: String },
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("tool invocation budget exhausted after {0} calls")]
    BudgetExhausted(usize),
    #[error("failed to encode tool output: {0}")]
    Output(#[from] serde_json::Error),
}

/// What the model is told about a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
}

/// A capability the model may invoke during orchestration.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call this tool.
    fn name(&self) -> &str;

    fn declaration(&self) -> ToolDeclaration;

    /// Run the tool with raw model-supplied arguments.
    async fn invoke(&self, args: Value) -> Result<Value, ToolError>;
}

/// The set of tools offered in one orchestration call.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools.iter().map(|tool| tool.declaration()).collect()
    }

    /// Invoke the tool registered under `name`.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|tool| tool.name() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.invoke(args).await
    }
}

/// Input accepted by the fetch-web-content tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchWebContentInput {
    /// The URL of the web page to fetch
    #[schemars(url)]
    pub url: String,
}

/// Fetches and extracts the main content of a web page.
pub struct FetchWebContentTool {
    extractor: Extractor,
}

impl FetchWebContentTool {
    pub fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }

    fn parse_input(args: Value) -> Result<FetchWebContentInput, ToolError> {
        let invalid = |reason: String| ToolError::InvalidInput {
            tool: FETCH_WEB_CONTENT.to_string(),
            reason,
        };
        let input: FetchWebContentInput =
            serde_json::from_value(args).map_err(|e| invalid(e.to_string()))?;
        parse_web_url(&input.url).map_err(|reason| invalid(format!("url: {reason}")))?;
        Ok(input)
    }
}

#[async_trait]
impl Tool for FetchWebContentTool {
    fn name(&self) -> &str {
        FETCH_WEB_CONTENT
    }

    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name().to_string(),
            description: "Fetches and extracts the main content from a web page URL. Use this \
                when you need to get the text content of an article or web page."
                .to_string(),
            input_schema: schema_value::<FetchWebContentInput>(),
            output_schema: schema_value::<ExtractionResult>(),
        }
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let input = Self::parse_input(args)?;
        tracing::info!(url = %input.url, "model requested page fetch");
        let result = self.extractor.extract(&input.url).await;
        Ok(serde_json::to_value(result)?)
    }
}

/// JSON schema for `T` without the `$schema` meta key, which model endpoints reject.
pub fn schema_value<T: JsonSchema>() -> Value {
    let schema: Schema = schemars::schema_for!(T);
    let mut value = schema.to_value();
    if let Value::Object(map) = &mut value {
        map.remove("$schema");
    }
    value
}
