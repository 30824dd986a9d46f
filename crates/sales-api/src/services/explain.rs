//! 예측 설명 서비스.
//!
//! 타임라인을 프롬프트로 만들어 OpenAI 호환 chat completion API(Groq)에 보냅니다.
//! 외부 호출이 실패해도 요청은 실패시키지 않고 고정 문구를 돌려줍니다.

use std::time::Duration;

use async_trait::async_trait;
use sales_analytics::explain::{
    build_prompt, extract_request, normalize_points, TimelineError, SYSTEM_PROMPT,
};
use sales_core::ExplainConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::metrics::record_explain_call;

/// 외부 호출 실패 시 반환하는 요약.
pub const FALLBACK_SUMMARY: &str = "* Unable to generate insight at the moment.";

/// API 키 환경 변수.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// 설명 API 호출 에러.
#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("GROQ_API_KEY is not set")]
    MissingApiKey,

    #[error("The explanation service timed out")]
    Timeout,

    #[error("Network error calling explanation service: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Explanation API error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Explanation API returned an unexpected response format")]
    MalformedResponse,

    #[error("Invalid explanation client configuration: {0}")]
    Config(String),
}

impl ExplainError {
    /// 메트릭 라벨.
    pub fn label(&self) -> &'static str {
        match self {
            ExplainError::MissingApiKey => "missing_key",
            ExplainError::Timeout => "timeout",
            ExplainError::Network(_) => "network",
            ExplainError::Upstream { .. } => "upstream",
            ExplainError::MalformedResponse => "malformed",
            ExplainError::Config(_) => "config",
        }
    }
}

impl From<reqwest::Error> for ExplainError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExplainError::Timeout
        } else if err.is_decode() {
            ExplainError::MalformedResponse
        } else {
            ExplainError::Network(err)
        }
    }
}

/// 텍스트 생성 클라이언트 trait.
#[async_trait]
pub trait ExplainClient: Send + Sync {
    /// system/user 메시지로 답변 생성.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ExplainError>;

    /// 클라이언트 이름.
    fn name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Groq (OpenAI 호환) chat completion 클라이언트.
pub struct GroqClient {
    client: reqwest::Client,
    api_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    api_key: Option<SecretString>,
}

impl GroqClient {
    /// 설정과 API 키로 클라이언트 생성.
    pub fn new(config: &ExplainConfig, api_key: Option<SecretString>) -> Result<Self, ExplainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExplainError::Config(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            api_key,
        })
    }

    /// `GROQ_API_KEY` 환경 변수에서 키를 읽어 생성.
    pub fn from_env(config: &ExplainConfig) -> Result<Self, ExplainError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);
        Self::new(config, api_key)
    }

    /// API 키 설정 여부.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl ExplainClient for GroqClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ExplainError> {
        let api_key = self.api_key.as_ref().ok_or(ExplainError::MissingApiKey)?;

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExplainError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ExplainError::MalformedResponse)
    }

    fn name(&self) -> &str {
        "groq"
    }
}

/// 설명 요청 처리.
///
/// 본문이 잘못되면 `TimelineError`를 반환하고, 외부 API 실패는
/// [`FALLBACK_SUMMARY`]로 대신합니다.
pub async fn explain_forecast(
    client: &dyn ExplainClient,
    body: &Value,
) -> Result<String, TimelineError> {
    let request = extract_request(body)?;
    let points = normalize_points(&request.timeline)?;
    let prompt = build_prompt(&points, request.focus.as_ref());
    debug!(points = points.len(), focus = request.focus.is_some(), "Explanation prompt built");

    match client.complete(SYSTEM_PROMPT, &prompt).await {
        Ok(text) => {
            record_explain_call("ok");
            Ok(text.trim().to_string())
        }
        Err(e) => {
            record_explain_call(e.label());
            error!(client = client.name(), error = %e, "Explanation call failed");
            Ok(FALLBACK_SUMMARY.to_string())
        }
    }
}
