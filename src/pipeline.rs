//! End-to-end summarization: validate, route, extract, orchestrate, normalize.

use std::sync::Arc;

use thiserror::Error;

use crate::agent::{Agent, AgentError};
use crate::config::{Config, RoutingPolicy};
use crate::gemini::GeminiClient;
use crate::response::SummaryResponse;
use crate::router::{classify, Mode};
use crate::scraper::{Extractor, ScraperError};
use crate::summary::{ExtractionResult, SummarizationRequest, SummaryResult, ToolInvocationBudget};
use crate::tools::{FetchWebContentTool, ToolSet};

/// Rejections raised before any network or model call.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RequestError {
    #[error("Input is required")]
    EmptyInput,
}

impl From<RequestError> for SummaryResponse {
    fn from(err: RequestError) -> Self {
        SummaryResponse::failure(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("failed to build HTTP client: {0}")]
    Scraper(#[from] ScraperError),
}

/// A validated request ready for the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInput {
    pub input: String,
    pub mode: Mode,
}

/// Validate a request and resolve its mode.
pub fn validate(request: &SummarizationRequest) -> Result<ValidatedInput, RequestError> {
    let input = request.input.trim();
    if input.is_empty() {
        return Err(RequestError::EmptyInput);
    }
    Ok(ValidatedInput {
        input: input.to_string(),
        mode: classify(input, request.mode),
    })
}

/// Shared, request-independent summarization service.
#[derive(Clone)]
pub struct Pipeline {
    agent: Agent,
    extractor: Extractor,
    url_tools: ToolSet,
    max_steps: usize,
    routing: RoutingPolicy,
}

impl Pipeline {
    pub fn new(agent: Agent, extractor: Extractor) -> Self {
        let url_tools =
            ToolSet::new().with(Arc::new(FetchWebContentTool::new(extractor.clone())));
        Self {
            agent,
            extractor,
            url_tools,
            max_steps: 5,
            routing: RoutingPolicy::Tool,
        }
    }

    /// Build the pipeline against the configured Gemini endpoint
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        let model = GeminiClient::from_config(config)?;
        let extractor = Extractor::new(&config.scraper)?;
        Ok(Self::new(Agent::new(Arc::new(model)), extractor)
            .with_max_steps(config.agent.max_steps)
            .with_routing(config.agent.routing))
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_routing(mut self, routing: RoutingPolicy) -> Self {
        self.routing = routing;
        self
    }

    /// Run one request through the whole pipeline.
    pub async fn run(&self, request: SummarizationRequest) -> SummaryResponse {
        match validate(&request) {
            Ok(validated) => self.summarize(&validated.input, validated.mode).await.into(),
            Err(err) => {
                tracing::info!(error = %err, "rejected request");
                err.into()
            }
        }
    }

    /// Summarize already-validated input in the given mode.
    pub async fn summarize(&self, input: &str, mode: Mode) -> SummaryResult {
        let budget = ToolInvocationBudget::new(self.max_steps);
        tracing::info!(?mode, routing = ?self.routing, "summarizing input");

        match (mode, self.routing) {
            (Mode::Text, _) => self.agent.summarize(input, &ToolSet::new(), budget).await,
            (Mode::Url, RoutingPolicy::Tool) => {
                self.agent.summarize(input, &self.url_tools, budget).await
            }
            (Mode::Url, RoutingPolicy::Prefetch) => {
                let extraction = self.extractor.extract(input).await;
                let task = prefetched_task(input, &extraction);
                self.agent.summarize(&task, &ToolSet::new(), budget).await
            }
        }
    }
}

/// Task text handed to the model after a deterministic fetch.
fn prefetched_task(url: &str, extraction: &ExtractionResult) -> String {
    match &extraction.error {
        None => format!(
            "Summarize the web page at {url}. Its content has already been retrieved.\n\n\
             Title: {}\n\n{}",
            extraction.title, extraction.content
        ),
        Some(error) => format!(
            "The user asked for a summary of the web page at {url}, but it could not be \
             retrieved: {error}"
        ),
    }
}
