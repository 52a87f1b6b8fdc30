//! Generative-text client
//!
//! [`TextGenerator`] is the seam the pipeline depends on. [`ChatCompletionClient`]
//! implements it against any OpenAI-compatible `/chat/completions` endpoint.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stak_common::config::LlmConfig;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

/// Generative client errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// One JSON-mode request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Token accounting reported by the service
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost_usd: f64,
}

/// Raw model output plus accounting
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
}

impl Completion {
    /// Parse the content as a JSON object, tolerating code fences
    pub fn json_object(&self) -> Result<serde_json::Map<String, Value>, LlmError> {
        extract_json_object(&self.content)
    }
}

/// Anything that can answer a JSON-mode prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// `Completion::model` carries the model that served the call
    async fn generate_json(&self, request: &GenerationRequest) -> Result<Completion, LlmError>;
}

/// Per-1000-token pricing
#[derive(Debug, Clone, Copy)]
pub struct Pricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl Pricing {
    pub fn cost(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        (prompt_tokens as f64 / 1000.0) * self.input_per_1k
            + (completion_tokens as f64 / 1000.0) * self.output_per_1k
    }
}

/// OpenAI-compatible chat completion client
pub struct ChatCompletionClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    pricing: Pricing,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl ChatCompletionClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        requests_per_minute: u32,
        pricing: Pricing,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            pricing,
            rate_limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        })
    }

    /// Build a client from the `[llm]` TOML section and a resolved API key
    pub fn from_config(config: &LlmConfig, api_key: Option<String>) -> Result<Self, LlmError> {
        Self::new(
            config.base_url.clone(),
            config.model.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
            config.requests_per_minute,
            Pricing {
                input_per_1k: config.input_cost_per_1k,
                output_per_1k: config.output_cost_per_1k,
            },
        )
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait]
impl TextGenerator for ChatCompletionClient {
    async fn generate_json(&self, request: &GenerationRequest) -> Result<Completion, LlmError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        tracing::debug!(model = %self.model, "Sending chat completion request");

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(status.as_u16(), body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                cost_usd: self.pricing.cost(u.prompt_tokens, u.completion_tokens),
            })
            .unwrap_or_default();

        Ok(Completion {
            content,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            usage,
        })
    }
}

/// Parse model output as a JSON object
///
/// Accepts bare JSON or JSON wrapped in a Markdown code fence.
pub fn extract_json_object(content: &str) -> Result<serde_json::Map<String, Value>, LlmError> {
    let trimmed = strip_code_fence(content.trim());
    if trimmed.is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(LlmError::MalformedResponse(format!(
            "expected JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(LlmError::MalformedResponse(e.to_string())),
    }
}

fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    // Drop the info string ("json") on the opening line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::json;

    #[test]
    fn test_extract_bare_object() {
        let map = extract_json_object(r#"{"title": {"value": "CTO"}}"#).unwrap();
        assert!(map.contains_key("title"));
    }

    #[test]
    fn test_extract_fenced_object() {
        let content = "```json\n{\"bio\": {\"value\": \"x\", \"confidence\": 0.8}}\n```";
        let map = extract_json_object(content).unwrap();
        assert_eq!(map["bio"]["confidence"], json!(0.8));

        let bare_fence = "```\n{}\n```";
        assert!(extract_json_object(bare_fence).unwrap().is_empty());
    }

    #[test]
    fn test_extract_rejects_non_objects() {
        assert!(matches!(
            extract_json_object("[1, 2]"),
            Err(LlmError::MalformedResponse(_))
        ));
        assert!(matches!(
            extract_json_object("not json"),
            Err(LlmError::MalformedResponse(_))
        ));
        assert!(matches!(extract_json_object("  "), Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn test_pricing() {
        let pricing = Pricing {
            input_per_1k: 0.001,
            output_per_1k: 0.002,
        };
        assert!((pricing.cost(2000, 500) - 0.003).abs() < 1e-12);
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: String) -> ChatCompletionClient {
        ChatCompletionClient::new(
            base_url,
            "test-model",
            Some("sk-test".into()),
            Duration::from_secs(5),
            600,
            Pricing {
                input_per_1k: 1.0,
                output_per_1k: 2.0,
            },
        )
        .unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            system: "sys".into(),
            user: "usr".into(),
            temperature: 0.2,
        }
    }

    #[tokio::test]
    async fn test_round_trip_against_local_server() {
        let router = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["response_format"]["type"], "json_object");
                assert_eq!(body["messages"][0]["role"], "system");
                Json(json!({
                    "model": "test-model-0613",
                    "choices": [{"message": {"content": "{\"title\": {\"value\": \"CTO\"}}"}}],
                    "usage": {"prompt_tokens": 1000, "completion_tokens": 500}
                }))
            }),
        );
        let base = serve(router).await;

        let completion = client(base).generate_json(&request()).await.unwrap();

        assert_eq!(completion.model, "test-model-0613");
        assert_eq!(completion.usage.prompt_tokens, 1000);
        assert!((completion.usage.cost_usd - 2.0).abs() < 1e-9);
        assert!(completion.json_object().unwrap().contains_key("title"));
    }

    #[tokio::test]
    async fn test_http_error_maps_to_api_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = serve(router).await;

        let err = client(base).generate_json(&request()).await.unwrap_err();
        match err {
            LlmError::Api(status, body) => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_choices_is_empty_response() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );
        let base = serve(router).await;

        let err = client(base).generate_json(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }
}
