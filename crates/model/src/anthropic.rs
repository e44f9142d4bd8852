use std::future::Future;
use std::time::Duration;

use ask_protocol::{is_cancelled, CancelSignal, Role, Turn};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;

use crate::client::{ChunkSink, ModelClient, StreamSummary};
use crate::error::{ModelError, Result};
use crate::sse::{SseParser, StreamEvent};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const BASE_URL_ENV: &str = "ASK_API_BASE_URL";

const API_VERSION: &str = "2023-06-01";
const CONTEXT_1M_BETA: &str = "context-1m-2025-08-07";
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    /// Full model id, aliases already resolved.
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Extended thinking budget in tokens; `None` disables thinking.
    pub thinking_budget: Option<u32>,
    pub context_1m: bool,
    /// Limit for the first response byte and for each gap between stream reads.
    pub timeout: Duration,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            max_tokens: 32_000,
            temperature: 1.0,
            thinking_budget: None,
            context_1m: false,
            timeout: Duration::from_secs(300),
        }
    }

    /// Build from `ANTHROPIC_API_KEY`, honouring `ASK_API_BASE_URL` when set.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ModelError::MissingApiKey)?;
        let mut config = Self::new(api_key.trim(), model);
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                config.base_url = base_url.trim().to_string();
            }
        }
        Ok(config)
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ThinkingParam>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ThinkingParam {
    #[serde(rename = "type")]
    kind: &'static str,
    budget_tokens: u32,
}

/// Client for the Anthropic Messages API.
#[derive(Debug)]
pub struct AnthropicClient {
    http: Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        if config.max_tokens == 0 {
            return Err(ModelError::InvalidConfig("max_tokens must be positive".into()));
        }
        if let Some(budget) = config.thinking_budget {
            if budget >= config.max_tokens {
                return Err(ModelError::InvalidConfig(format!(
                    "thinking budget {budget} must be below max_tokens {}",
                    config.max_tokens
                )));
            }
        }
        let http = Client::builder()
            .connect_timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.config.api_key)
                .map_err(|_| ModelError::InvalidConfig("API key is not a valid header".into()))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if self.config.context_1m {
            headers.insert("anthropic-beta", HeaderValue::from_static(CONTEXT_1M_BETA));
        }
        Ok(headers)
    }

    fn body<'a>(&'a self, turns: &'a [Turn], stream: bool) -> MessagesRequest<'a> {
        build_request(&self.config, turns, stream)
    }

    async fn post(&self, turns: &[Turn], stream: bool, cancel: &CancelSignal) -> Result<Option<Response>> {
        let request = self
            .http
            .post(self.config.endpoint())
            .headers(self.headers()?)
            .json(&self.body(turns, stream))
            .send();
        log::debug!(
            "POST {} model={} turns={} stream={stream}",
            self.config.endpoint(),
            self.config.model,
            turns.len()
        );

        let Some(response) = self.with_timeout(request, cancel).await? else {
            return Ok(None);
        };
        Ok(Some(check_status(response?).await?))
    }

    async fn with_timeout<F: Future>(&self, future: F, cancel: &CancelSignal) -> Result<Option<F::Output>> {
        match await_or_cancel(tokio::time::timeout(self.config.timeout, future), cancel).await {
            None => Ok(None),
            Some(Ok(output)) => Ok(Some(output)),
            Some(Err(_)) => Err(ModelError::Timeout {
                secs: self.config.timeout.as_secs(),
            }),
        }
    }
}

fn build_request<'a>(
    config: &'a AnthropicConfig,
    turns: &'a [Turn],
    stream: bool,
) -> MessagesRequest<'a> {
    let messages = turns
        .iter()
        .filter(|turn| !turn.content.trim().is_empty())
        .map(|turn| Message {
            role: match turn.role {
                Role::Human => "user",
                Role::Ai => "assistant",
            },
            content: turn.content.as_str(),
        })
        .collect();

    let thinking = config.thinking_budget.map(|budget_tokens| ThinkingParam {
        kind: "enabled",
        budget_tokens,
    });
    let temperature = if thinking.is_some() {
        1.0
    } else {
        config.temperature
    };

    MessagesRequest {
        model: &config.model,
        max_tokens: config.max_tokens,
        temperature,
        messages,
        thinking,
        stream,
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    fn model_id(&self) -> &str {
        &self.config.model
    }

    async fn send_history(&self, turns: &[Turn]) -> Result<String> {
        let never = ask_protocol::new_cancel_signal();
        let Some(response) = self.post(turns, false, &never).await? else {
            return Ok(String::new());
        };
        let value: Value = response.json().await?;
        extract_text(&value)
    }

    async fn stream_history(
        &self,
        turns: &[Turn],
        cancel: &CancelSignal,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<StreamSummary> {
        let cancelled = |output_tokens| StreamSummary {
            output_tokens,
            cancelled: true,
        };

        let Some(mut response) = self.post(turns, true, cancel).await? else {
            return Ok(cancelled(0));
        };

        let mut parser = SseParser::default();
        let mut text_len = 0usize;
        let mut reported: Option<usize> = None;

        'read: loop {
            let running = reported.unwrap_or(text_len / 4);
            if is_cancelled(cancel) {
                return Ok(cancelled(running));
            }
            let Some(next) = self.with_timeout(response.chunk(), cancel).await? else {
                return Ok(cancelled(running));
            };
            let Some(bytes) = next? else {
                break;
            };

            for event in parser.feed(&bytes) {
                match event {
                    StreamEvent::TextDelta(text) => {
                        if is_cancelled(cancel) {
                            return Ok(cancelled(reported.unwrap_or(text_len / 4)));
                        }
                        text_len += text.len();
                        let running = reported.unwrap_or(0).max(text_len / 4);
                        on_chunk(&text, running).map_err(ModelError::Sink)?;
                    }
                    StreamEvent::ThinkingDelta(thinking) => {
                        log::trace!("thinking: {thinking}");
                    }
                    StreamEvent::Usage { output_tokens } => reported = Some(output_tokens),
                    StreamEvent::MessageStop => break 'read,
                    StreamEvent::Error { kind, message } => {
                        return Err(ModelError::Api {
                            status: None,
                            message: format!("{kind}: {message}"),
                        });
                    }
                }
            }
        }

        let output_tokens = reported.unwrap_or(text_len / 4);
        log::info!("Stream finished: {output_tokens} output tokens");
        Ok(StreamSummary {
            output_tokens,
            cancelled: false,
        })
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ModelError::Api {
        status: Some(status.as_u16()),
        message: error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string()),
    })
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value.pointer("/error/message")?.as_str()?;
    Some(match value.pointer("/error/type").and_then(Value::as_str) {
        Some(kind) => format!("{kind}: {message}"),
        None => message.to_string(),
    })
}

fn extract_text(value: &Value) -> Result<String> {
    let blocks = value
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| ModelError::Malformed("response has no content array".into()))?;
    Ok(blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect())
}

/// Await `future`, giving up once `cancel` is raised.
async fn await_or_cancel<F: Future>(future: F, cancel: &CancelSignal) -> Option<F::Output> {
    let mut future = Box::pin(future);
    loop {
        if is_cancelled(cancel) {
            return None;
        }
        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            return Some(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config() -> AnthropicConfig {
        AnthropicConfig::new("key", "claude-test")
    }

    #[test]
    fn maps_roles_and_skips_empty_turns() {
        let turns = vec![
            Turn::new(1, Role::Human, "hi"),
            Turn::new(2, Role::Ai, "hello"),
            Turn::new(3, Role::Human, "  "),
            Turn::new(4, Role::Human, "again"),
        ];
        let body = serde_json::to_value(build_request(&config(), &turns, true)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "claude-test",
                "max_tokens": 32000,
                "temperature": 1.0,
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                    {"role": "user", "content": "again"}
                ],
                "stream": true
            })
        );
    }

    #[test]
    fn thinking_forces_temperature_one() {
        let mut config = config();
        config.temperature = 0.2;
        config.thinking_budget = Some(1024);
        let turns = vec![Turn::new(1, Role::Human, "think")];
        let body = serde_json::to_value(build_request(&config, &turns, false)).unwrap();
        assert_eq!(body["temperature"], json!(1.0));
        assert_eq!(body["thinking"], json!({"type": "enabled", "budget_tokens": 1024}));
    }

    #[test]
    fn rejects_budget_at_or_above_max_tokens() {
        let mut config = config();
        config.max_tokens = 2000;
        config.thinking_budget = Some(2000);
        assert!(matches!(
            AnthropicClient::new(config),
            Err(ModelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn extracts_text_blocks_only() {
        let value = json!({"content": [
            {"type": "thinking", "thinking": "..."},
            {"type": "text", "text": "Hello"},
            {"type": "text", "text": " there"}
        ]});
        assert_eq!(extract_text(&value).unwrap(), "Hello there");
        assert!(extract_text(&json!({})).is_err());
    }

    #[test]
    fn formats_api_error_bodies() {
        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad"}}"#;
        assert_eq!(
            error_message(body).as_deref(),
            Some("invalid_request_error: bad")
        );
        assert_eq!(error_message("<html>"), None);
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let mut config = config();
        config.base_url = "http://localhost:8080/".into();
        assert_eq!(config.endpoint(), "http://localhost:8080/v1/messages");
    }

    #[tokio::test]
    async fn await_or_cancel_stops_on_signal() {
        let cancel = ask_protocol::new_cancel_signal();
        ask_protocol::raise(&cancel);
        let out = await_or_cancel(std::future::pending::<()>(), &cancel).await;
        assert!(out.is_none());
    }
}
