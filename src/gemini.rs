//! Gemini `generateContent` client with function calling.
//!
//! Issues one HTTP request per model turn. Tool declarations are sent as
//! `functionDeclarations` with JSON schemas; function calls come back as tool calls and
//! their results are replayed as `functionResponse` parts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agent::AgentError;
use crate::config::Config;
use crate::model::{Message, ModelClient, ModelError, ModelReply, ModelRequest, Part, Role, ToolCall};
use crate::tools::ToolDeclaration;

const USER_AGENT: &str = concat!("summa/", env!("CARGO_PKG_VERSION"));

pub struct GeminiClient {
    http: Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_base: api_base.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Build a client from the `[agent]` section and the configured API key
    pub fn from_config(config: &Config) -> Result<Self, AgentError> {
        let api_key = config.api_key()?;
        Ok(Self::new(
            api_key,
            config.agent.model.as_str(),
            config.agent.api_base.as_str(),
            Duration::from_secs(config.agent.timeout_secs),
        )?)
    }

    fn endpoint(&self) -> String {
        let model = self
            .model
            .trim_start_matches("models/")
            .trim_start_matches("google/");
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            model
        )
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, request: ModelRequest<'_>) -> Result<ModelReply, ModelError> {
        let payload = build_payload(&request);

        tracing::debug!(
            model = %self.model,
            messages = request.transcript.len(),
            tools = request.tools.len(),
            allow_tools = request.allow_tools,
            "calling model"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Transport(format!("request to {} timed out", self.model))
                } else {
                    ModelError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<WireErrorBody>(&body)
                .map(|wire| wire.error.message)
                .unwrap_or(body);
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let wire: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
        parse_reply(wire)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: WireContent,
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    function_declarations: Vec<WireFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireFunctionDeclaration {
    name: String,
    description: String,
    parameters_json_schema: Value,
    response_json_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    prompt_feedback: Option<WirePromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<WireContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    message: String,
}

fn build_payload(request: &ModelRequest<'_>) -> GenerateContentRequest {
    let system_instruction = WireContent {
        role: None,
        parts: vec![WirePart {
            text: Some(request.system.to_string()),
            ..Default::default()
        }],
    };

    let contents = request.transcript.iter().map(to_wire_content).collect();

    let (tools, tool_config) = if request.tools.is_empty() {
        (Vec::new(), None)
    } else {
        let mode = if request.allow_tools { "AUTO" } else { "NONE" };
        (
            vec![WireTool {
                function_declarations: request.tools.iter().map(to_wire_declaration).collect(),
            }],
            Some(json!({ "functionCallingConfig": { "mode": mode } })),
        )
    };

    GenerateContentRequest {
        system_instruction,
        contents,
        tools,
        tool_config,
    }
}

fn to_wire_declaration(declaration: &ToolDeclaration) -> WireFunctionDeclaration {
    WireFunctionDeclaration {
        name: declaration.name.clone(),
        description: declaration.description.clone(),
        parameters_json_schema: declaration.input_schema.clone(),
        response_json_schema: declaration.output_schema.clone(),
    }
}

fn to_wire_content(message: &Message) -> WireContent {
    let role = match message.role {
        Role::User => "user",
        Role::Model => "model",
    };

    let parts = message
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => WirePart {
                text: Some(text.clone()),
                ..Default::default()
            },
            Part::ToolCall(call) => WirePart {
                function_call: Some(WireFunctionCall {
                    name: call.name.clone(),
                    args: call.args.clone(),
                }),
                thought_signature: call.signature.clone(),
                ..Default::default()
            },
            Part::ToolResult { name, output } => WirePart {
                function_response: Some(WireFunctionResponse {
                    name: name.clone(),
                    // functionResponse.response must be a JSON object
                    response: match output {
                        Value::Object(_) => output.clone(),
                        other => json!({ "output": other }),
                    },
                }),
                ..Default::default()
            },
        })
        .collect();

    WireContent {
        role: Some(role.to_string()),
        parts,
    }
}

fn parse_reply(wire: GenerateContentResponse) -> Result<ModelReply, ModelError> {
    let Some(candidate) = wire.candidates.into_iter().next() else {
        let reason = wire
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .map(|reason| format!("prompt blocked ({reason})"))
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(ModelError::Empty(reason));
    };

    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for part in candidate.content.unwrap_or_default().parts {
        if part.thought == Some(true) {
            continue;
        }
        if let Some(call) = part.function_call {
            tool_calls.push(ToolCall {
                name: call.name,
                args: call.args,
                signature: part.thought_signature,
            });
        } else if let Some(chunk) = part.text {
            text.push_str(&chunk);
        }
    }

    if text.trim().is_empty() && tool_calls.is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "empty candidate".to_string());
        return Err(ModelError::Empty(format!("finish reason {reason}")));
    }

    Ok(ModelReply {
        text: (!text.trim().is_empty()).then(|| text.trim().to_string()),
        tool_calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(
            "test-key",
            "gemini-test",
            server.base_url(),
            Duration::from_secs(5),
        )
        .expect("client")
    }

    fn declaration() -> ToolDeclaration {
        ToolDeclaration {
            name: "fetch-web-content".to_string(),
            description: "fetch".to_string(),
            input_schema: json!({ "type": "object" }),
            output_schema: json!({ "type": "object" }),
        }
    }

    #[tokio::test]
    async fn text_reply_is_returned() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/gemini-test:generateContent")
                    .header("x-goog-api-key", "test-key")
                    .body_contains("systemInstruction");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": { "role": "model", "parts": [
                            { "text": "thinking...", "thought": true },
                            { "text": "**Main Topic**: Sky. " }
                        ]},
                        "finishReason": "STOP"
                    }]
                }));
            })
            .await;

        let transcript = vec![Message::user_text("The sky is blue.")];
        let reply = client(&server)
            .generate(ModelRequest {
                system: "be brief",
                transcript: &transcript,
                tools: &[],
                allow_tools: false,
            })
            .await
            .expect("reply");

        mock.assert_async().await;
        assert_eq!(reply.text.as_deref(), Some("**Main Topic**: Sky."));
        assert!(reply.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn function_calls_keep_their_signature() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/gemini-test:generateContent")
                    .body_contains("functionDeclarations")
                    .body_contains("\"mode\":\"AUTO\"");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": { "role": "model", "parts": [{
                            "functionCall": {
                                "name": "fetch-web-content",
                                "args": { "url": "https://example.com" }
                            },
                            "thoughtSignature": "sig-1"
                        }]}
                    }]
                }));
            })
            .await;

        let transcript = vec![Message::user_text("https://example.com")];
        let tools = [declaration()];
        let reply = client(&server)
            .generate(ModelRequest {
                system: "summarize",
                transcript: &transcript,
                tools: &tools,
                allow_tools: true,
            })
            .await
            .expect("reply");

        assert!(reply.text.is_none());
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].name, "fetch-web-content");
        assert_eq!(reply.tool_calls[0].args["url"], "https://example.com");
        assert_eq!(reply.tool_calls[0].signature.as_deref(), Some("sig-1"));
    }

    #[tokio::test]
    async fn error_status_surfaces_api_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(429).json_body(json!({
                    "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
                }));
            })
            .await;

        let transcript = vec![Message::user_text("hello")];
        let err = client(&server)
            .generate(ModelRequest {
                system: "s",
                transcript: &transcript,
                tools: &[],
                allow_tools: false,
            })
            .await
            .unwrap_err();

        match err {
            ModelError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Quota exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn blocked_prompt_is_an_empty_reply() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200)
                    .json_body(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
            })
            .await;

        let transcript = vec![Message::user_text("hello")];
        let err = client(&server)
            .generate(ModelRequest {
                system: "s",
                transcript: &transcript,
                tools: &[],
                allow_tools: false,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ModelError::Empty(reason) if reason.contains("SAFETY")));
    }

    #[test]
    fn payload_replays_tool_turns() {
        let transcript = vec![
            Message::user_text("https://example.com"),
            Message {
                role: Role::Model,
                parts: vec![Part::ToolCall(ToolCall {
                    name: "fetch-web-content".to_string(),
                    args: json!({ "url": "https://example.com" }),
                    signature: Some("sig".to_string()),
                })],
            },
            Message {
                role: Role::User,
                parts: vec![Part::ToolResult {
                    name: "fetch-web-content".to_string(),
                    output: json!("plain"),
                }],
            },
        ];
        let tools = [declaration()];
        let payload = build_payload(&ModelRequest {
            system: "s",
            transcript: &transcript,
            tools: &tools,
            allow_tools: false,
        });
        let value = serde_json::to_value(&payload).expect("json");

        assert_eq!(value["toolConfig"]["functionCallingConfig"]["mode"], "NONE");
        assert_eq!(value["contents"][1]["role"], "model");
        assert_eq!(value["contents"][1]["parts"][0]["thoughtSignature"], "sig");
        assert_eq!(
            value["contents"][2]["parts"][0]["functionResponse"]["response"]["output"],
            "plain"
        );
        assert_eq!(
            value["tools"][0]["functionDeclarations"][0]["parametersJsonSchema"]["type"],
            "object"
        );
    }
}
