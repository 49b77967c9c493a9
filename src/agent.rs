//! LLM agent module for structured summarization.
//!
//! The agent runs a bounded conversation with a [`ModelClient`]: the model may ask for tool
//! calls, which are run and fed back, until it answers in text or the tool budget runs out.

use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;

use crate::config::ConfigError;
use crate::model::{Message, ModelClient, ModelError, ModelRequest, Part, Role, ToolCall};
use crate::summary::{SummaryResult, ToolInvocationBudget};
use crate::tools::{ToolError, ToolSet};

/// System instructions given to the model on every turn.
pub const INSTRUCTIONS: &str = "You are an expert content summarizer. Your job is to create clear, concise, and informative summaries.

When given a URL:
1. Use the fetch-web-content tool to retrieve the page content before summarizing
2. If the fetch fails, inform the user politely and explain what went wrong. Never invent content you could not retrieve

When summarizing content (from URL or direct text):
1. Create a structured summary with exactly three sections:
   - **Main Topic**: One sentence describing what the content is about
   - **Key Points**: 3-5 bullet points highlighting the most important information
   - **Key Takeaway**: One sentence capturing the essential message

Guidelines:
- Be concise but informative
- Focus on facts and main ideas, not minor details
- Use clear, professional language
- If the content is too short to summarize meaningfully, say so instead of inventing structure
- If the content is unclear or low-quality, mention that in your response";

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM request failed: {0}")]
    RequestFailed(#[from] ModelError),
    #[error("no final answer after {0} tool calls")]
    NoFinalAnswer(usize),
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}

/// Orchestration state between model turns.
#[derive(Debug)]
enum State {
    AwaitingModelTurn,
    ToolInvocationPending(Vec<ToolCall>),
    Done(SummaryResult),
}

/// Drives one summarization conversation per call.
#[derive(Clone)]
pub struct Agent {
    model: Arc<dyn ModelClient>,
}

impl Agent {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Summarize `input`, letting the model call `tools` at most `budget` times.
    ///
    /// Never fails outright: model errors become a failed [`SummaryResult`].
    pub async fn summarize(
        &self,
        input: &str,
        tools: &ToolSet,
        mut budget: ToolInvocationBudget,
    ) -> SummaryResult {
        let declarations = tools.declarations();
        let mut transcript = vec![Message::user_text(input)];
        let mut model_turns = 0usize;
        let mut state = State::AwaitingModelTurn;

        tracing::info!(
            tools = declarations.len(),
            budget = budget.limit(),
            chars = input.chars().count(),
            "starting summarization"
        );

        loop {
            state = match state {
                State::AwaitingModelTurn => {
                    let allow_tools = !declarations.is_empty() && !budget.is_exhausted();
                    model_turns += 1;

                    let reply = self
                        .model
                        .generate(ModelRequest {
                            system: INSTRUCTIONS,
                            transcript: &transcript,
                            tools: &declarations,
                            allow_tools,
                        })
                        .await;

                    match reply {
                        Err(err) => {
                            tracing::warn!(turn = model_turns, error = %err, "model call failed");
                            State::Done(SummaryResult::failed(AgentError::from(err).to_string()))
                        }
                        Ok(reply) => {
                            transcript.push(reply.to_message());
                            match (reply.tool_calls.is_empty(), reply.text) {
                                (false, _) if allow_tools => {
                                    State::ToolInvocationPending(reply.tool_calls)
                                }
                                (_, Some(text)) if !text.trim().is_empty() => {
                                    State::Done(SummaryResult::ok(text))
                                }
                                (true, _) => State::Done(SummaryResult::failed(
                                    AgentError::from(ModelError::Empty(
                                        "empty text".to_string(),
                                    ))
                                    .to_string(),
                                )),
                                (false, _) => State::Done(SummaryResult::failed(
                                    AgentError::NoFinalAnswer(budget.used()).to_string(),
                                )),
                            }
                        }
                    }
                }
                State::ToolInvocationPending(calls) => {
                    let mut parts = Vec::with_capacity(calls.len());
                    for call in calls {
                        let output = if budget.try_consume() {
                            tracing::debug!(
                                tool = %call.name,
                                used = budget.used(),
                                limit = budget.limit(),
                                "invoking tool"
                            );
                            match tools.invoke(&call.name, call.args).await {
                                Ok(output) => output,
                                Err(err) => tool_error(&err),
                            }
                        } else {
                            tracing::warn!(tool = %call.name, "tool budget exhausted");
                            tool_error(&ToolError::BudgetExhausted(budget.limit()))
                        };
                        parts.push(Part::ToolResult {
                            name: call.name,
                            output,
                        });
                    }
                    transcript.push(Message {
                        role: Role::User,
                        parts,
                    });
                    State::AwaitingModelTurn
                }
                State::Done(result) => {
                    tracing::info!(
                        turns = model_turns,
                        tool_calls = budget.used(),
                        success = result.success,
                        "summarization finished"
                    );
                    return result;
                }
            };
        }
    }
}

fn tool_error(err: &ToolError) -> Value {
    tracing::warn!(error = %err, "tool call rejected");
    json!({ "success": false, "error": err.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::{ScriptedModel, StubTool};
    use crate::model::ModelReply;

    fn agent(model: &Arc<ScriptedModel>) -> Agent {
        Agent::new(model.clone())
    }

    #[tokio::test]
    async fn text_reply_finishes_without_tools() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(ModelReply::text(
            "**Main Topic**: Sky.",
        ))]));

        let result = agent(&model)
            .summarize("The sky is blue.", &ToolSet::new(), ToolInvocationBudget::new(5))
            .await;

        assert_eq!(result, SummaryResult::ok("**Main Topic**: Sky."));
        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].allow_tools);
        assert!(calls[0].tools.is_empty());
        assert_eq!(calls[0].system, INSTRUCTIONS);
    }

    #[tokio::test]
    async fn tool_result_is_fed_back_to_the_model() {
        let tool = Arc::new(StubTool::new(json!({ "success": true, "content": "page" })));
        let tools = ToolSet::new().with(tool.clone());
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(ModelReply::tool_call(
                StubTool::NAME,
                json!({ "url": "https://example.com" }),
            )),
            Ok(ModelReply::text("summary of page")),
        ]));

        let result = agent(&model)
            .summarize("https://example.com", &tools, ToolInvocationBudget::new(5))
            .await;

        assert!(result.success);
        assert_eq!(tool.invocations(), 1);

        let calls = model.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].allow_tools);
        assert_eq!(calls[0].tools, vec![StubTool::NAME.to_string()]);
        let last = calls[1].transcript.last().expect("tool result message");
        assert_eq!(last.role, Role::User);
        assert!(matches!(
            &last.parts[0],
            Part::ToolResult { output, .. } if output["content"] == "page"
        ));
    }

    #[tokio::test]
    async fn exhausted_budget_forces_a_text_turn() {
        let tool = Arc::new(StubTool::new(json!({ "success": true })));
        let tools = ToolSet::new().with(tool.clone());
        let call = || {
            Ok(ModelReply::tool_call(
                StubTool::NAME,
                json!({ "url": "https://example.com" }),
            ))
        };
        let model = Arc::new(ScriptedModel::new(vec![
            call(),
            call(),
            Ok(ModelReply::text("final")),
        ]));

        let result = agent(&model)
            .summarize("https://example.com", &tools, ToolInvocationBudget::new(2))
            .await;

        assert_eq!(result, SummaryResult::ok("final"));
        assert_eq!(tool.invocations(), 2);
        let allowed: Vec<bool> = model.calls().iter().map(|c| c.allow_tools).collect();
        assert_eq!(allowed, vec![true, true, false]);
    }

    #[tokio::test]
    async fn tool_call_after_budget_without_text_fails() {
        let tools = ToolSet::new().with(Arc::new(StubTool::new(json!({}))));
        let call = || Ok(ModelReply::tool_call(StubTool::NAME, json!({})));
        let model = Arc::new(ScriptedModel::new(vec![call(), call()]));

        let result = agent(&model)
            .summarize("https://example.com", &tools, ToolInvocationBudget::new(1))
            .await;

        assert!(!result.success);
        assert!(result.text.is_empty());
        assert!(result.error.expect("error").contains("no final answer"));
    }

    #[tokio::test]
    async fn calls_beyond_budget_in_one_turn_are_refused() {
        let tool = Arc::new(StubTool::new(json!({ "success": true })));
        let tools = ToolSet::new().with(tool.clone());
        let mut double = ModelReply::tool_call(StubTool::NAME, json!({}));
        double.tool_calls.push(double.tool_calls[0].clone());
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(double),
            Ok(ModelReply::text("done")),
        ]));

        let result = agent(&model)
            .summarize("input", &tools, ToolInvocationBudget::new(1))
            .await;

        assert!(result.success);
        assert_eq!(tool.invocations(), 1);
        let calls = model.calls();
        let results = &calls[1].transcript.last().expect("results").parts;
        assert!(matches!(
            &results[1],
            Part::ToolResult { output, .. } if output["error"].as_str().is_some_and(|e| e.contains("budget"))
        ));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_the_model() {
        let tools = ToolSet::new().with(Arc::new(StubTool::new(json!({}))));
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(ModelReply::tool_call("rm-rf", json!({}))),
            Ok(ModelReply::text("sorry")),
        ]));

        let result = agent(&model)
            .summarize("input", &tools, ToolInvocationBudget::new(5))
            .await;

        assert!(result.success);
        let calls = model.calls();
        assert!(matches!(
            &calls[1].transcript.last().expect("results").parts[0],
            Part::ToolResult { output, .. } if output["success"] == false
        ));
    }

    #[tokio::test]
    async fn model_failure_becomes_failed_result() {
        let model = Arc::new(ScriptedModel::new(vec![Err(ModelError::Api {
            status: 429,
            message: "Quota exceeded".to_string(),
        })]));

        let result = agent(&model)
            .summarize("text", &ToolSet::new(), ToolInvocationBudget::new(5))
            .await;

        assert!(!result.success);
        assert!(result.error.expect("error").contains("Quota exceeded"));
    }

    #[tokio::test]
    async fn blank_text_is_a_failure() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(ModelReply::text("   "))]));

        let result = agent(&model)
            .summarize("text", &ToolSet::new(), ToolInvocationBudget::new(5))
            .await;

        assert!(!result.success);
    }
}
