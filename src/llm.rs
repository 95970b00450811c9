use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::env;

use pitchside::{GenerationError, TextGenerator};

/// Printed before exiting when the generation quota is exhausted.
pub const QUOTA_HELP: &str = "\
OpenAI quota exceeded. Add billing or increase limits at:
  https://platform.openai.com/account/billing";

#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl LlmClient {
    pub fn from_env(model_override: Option<String>) -> Option<Self> {
        let api_key = env::var("OPENAI_API_KEY").ok()?;
        let api_base =
            env::var("OPENAI_API_BASE").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model = model_override
            .or_else(|| env::var("OPENAI_MODEL").ok())
            .unwrap_or_else(|| "gpt-4o-mini".to_string());
        let client = reqwest::Client::new();
        Some(Self {
            client,
            api_key,
            api_base,
            model,
        })
    }
}

impl TextGenerator for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let request = ChatRequest {
            model: self.model.clone(),
            temperature: 0.9,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_else(|_| String::new());
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(GenerationError::RateLimited {
                    quota_exhausted: body_signals_quota(&error_body),
                });
            }
            return Err(GenerationError::Api {
                status: status.as_u16(),
                detail: error_body.trim().to_string(),
            });
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .first()
            .ok_or(GenerationError::EmptyResponse)?
            .message
            .content
            .trim()
            .to_string();
        Ok(content)
    }
}

/// A 429 can be a burst limit (retry next tick) or an exhausted quota
/// (stop the process). The error payload carries the distinction; the raw
/// text is checked too since the payload shape is not guaranteed.
fn body_signals_quota(body: &str) -> bool {
    if let Ok(payload) = serde_json::from_str::<ErrorResponse>(body) {
        if let Some(error) = payload.error {
            if error.error_type.as_deref() == Some("insufficient_quota") {
                return true;
            }
        }
    }
    let lowered = body.to_lowercase();
    lowered.contains("insufficient_quota")
        || lowered.contains("quota")
        || lowered.contains("insufficient")
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    error_type: Option<String>,
}
