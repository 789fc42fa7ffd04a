use crate::ai::{context_from_post, Message, ReplyGenerator, DEFAULT_SYSTEM_PROMPT};
use crate::config::OpenAIConfig;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    auth_headers: header::HeaderMap,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

#[derive(Debug, Serialize)]
struct OpenAICompletionRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAICompletionResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}

impl OpenAIClient {
    pub fn new(config: &OpenAIConfig) -> Result<Self, String> {
        let mut auth_headers = header::HeaderMap::new();
        auth_headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let auth_value = header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| format!("Invalid API key format: {}", e))?;
        auth_headers.insert(header::AUTHORIZATION, auth_value);

        Ok(Self {
            client: crate::http::shared_client().clone(),
            auth_headers,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        })
    }

    fn build_request<'a>(&'a self, messages: &'a [Message]) -> OpenAICompletionRequest<'a> {
        OpenAICompletionRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Single chat completion. Failures are returned as-is; there is no retry.
    pub async fn generate_text(&self, messages: Vec<Message>) -> Result<String, String> {
        let request = self.build_request(&messages);

        log::info!(
            "[OPENAI] Sending request to {} with model {} (temperature {})",
            self.endpoint,
            self.model,
            self.temperature
        );

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.auth_headers.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("OpenAI API request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read OpenAI response: {}", e))?;

        if !status.is_success() {
            return Err(describe_error(status, &body));
        }

        log::debug!("[OPENAI] Raw response:\n{}", body);
        parse_completion(&body)
    }
}

#[async_trait]
impl ReplyGenerator for OpenAIClient {
    async fn generate_reply(&self, context_text: &str) -> Result<String, String> {
        let messages = vec![
            Message::system(self.system_prompt.as_str()),
            Message::user(context_from_post(context_text)),
        ];
        self.generate_text(messages).await
    }
}

fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(body) {
        return format!("OpenAI API error ({}): {}", status, error_response.error.message);
    }

    // Don't include HTML error pages or overly long error bodies
    let trimmed = body.trim_start();
    if trimmed.starts_with("<!DOCTYPE") || trimmed.starts_with("<html") || trimmed.starts_with("<HTML") {
        return format!("OpenAI API returned error status: {} (HTML error page)", status);
    }

    let truncated: String = if body.chars().count() > 200 {
        format!("{}...", body.chars().take(200).collect::<String>())
    } else {
        body.to_string()
    };
    format!("OpenAI API returned error status: {}, body: {}", status, truncated)
}

fn parse_completion(body: &str) -> Result<String, String> {
    let response_data: OpenAICompletionResponse = serde_json::from_str(body)
        .map_err(|e| format!("Failed to parse OpenAI response: {}", e))?;

    let choice = response_data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| "OpenAI API returned no choices".to_string())?;

    let content = choice.message.content.unwrap_or_default();
    let content = content.trim();
    if content.is_empty() {
        return Err(format!(
            "OpenAI API returned empty content (finish_reason: {:?})",
            choice.finish_reason
        ));
    }

    log::info!(
        "[OPENAI] Response - content_len: {}, finish_reason: {:?}",
        content.len(),
        choice.finish_reason
    );
    Ok(content.to_string())
}
