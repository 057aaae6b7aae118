//! OpenAI-compatible chat completions backend.
//!
//! Works with any server implementing `POST {base_url}/chat/completions`:
//! OpenAI itself, OpenRouter, vLLM, LM Studio, Ollama's `/v1` endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use super::{AiModel, AssistantReply};
use crate::config::ModelConfig;
use crate::message::{Message, ToolCall};

/// Chat completions client for one model on one endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatModel {
    model: String,
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Value]>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

impl OpenAiCompatModel {
    /// Creates a client. `base_url` should include the version path, e.g.
    /// `https://api.openai.com/v1`.
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        })
    }

    /// Creates a client from the `[model]` config section.
    pub fn from_config(config: &ModelConfig, api_key: Option<String>) -> Result<Self> {
        Self::new(config.model_name(), config.base_url(), api_key, config.timeout())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl AiModel for OpenAiCompatModel {
    async fn completions(&self, messages: &[Message], tools: Option<&[Value]>) -> Result<AssistantReply> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            model = %self.model,
            message_count = messages.len(),
            tool_count = tools.map_or(0, |t| t.len()),
            "requesting chat completion"
        );

        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            tools: tools.filter(|t| !t.is_empty()),
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref api_key) = self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, url = %url, "failed to reach chat completions endpoint");
            anyhow::anyhow!("Network error calling {}: {}", url, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, url = %url, "chat completions returned error status");
            anyhow::bail!("API error ({}): {}", status, error_text);
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse chat completions response")?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| anyhow::anyhow!("No choices in chat completions response"))?;

        Ok(AssistantReply {
            content: message.content,
            tool_calls: message.tool_calls.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model_for(server: &mockito::ServerGuard, api_key: Option<&str>) -> OpenAiCompatModel {
        OpenAiCompatModel::new(
            "test-model",
            format!("{}/v1", server.url()),
            api_key.map(String::from),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_text_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "Hello!"}}]}"#)
            .create_async()
            .await;

        let reply = model_for(&server, Some("test-key"))
            .completions(&[Message::user("hi")], None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply.content.as_deref(), Some("Hello!"));
        assert!(reply.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_tool_call_reply_with_null_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::PartialJson(json!({
                "model": "test-model",
                "tools": [{"type": "function", "function": {"name": "read_file"}}]
            })))
            .with_status(200)
            .with_body(
                json!({
                    "choices": [{
                        "message": {
                            "role": "assistant",
                            "content": null,
                            "tool_calls": [{
                                "id": "call_1",
                                "type": "function",
                                "function": {"name": "read_file", "arguments": "{\"path\":\"a\"}"}
                            }]
                        }
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let tools = vec![json!({"type": "function", "function": {"name": "read_file"}})];
        let reply = model_for(&server, None)
            .completions(&[Message::user("read a")], Some(&tools))
            .await
            .unwrap();

        assert_eq!(reply.content, None);
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].name(), "read_file");
        assert_eq!(reply.tool_calls[0].arguments(), r#"{"path":"a"}"#);
    }

    #[tokio::test]
    async fn test_error_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body(r#"{"error": "Rate limit exceeded"}"#)
            .create_async()
            .await;

        let err = model_for(&server, None)
            .completions(&[Message::user("hi")], None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = model_for(&server, None)
            .completions(&[Message::user("hi")], None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No choices"));
    }

    #[test]
    fn test_request_omits_empty_tools() {
        let messages = [Message::user("hi")];
        let body = ChatCompletionRequest {
            model: "m",
            messages: &messages,
            tools: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("tools").is_none());
        assert_eq!(value["messages"][0], json!({"role": "user", "content": "hi"}));
    }
}
