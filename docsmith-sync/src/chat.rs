//! OpenAI-compatible chat-completions backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use docsmith_core::config::GenerationConfig;
use docsmith_renderer::TemplateId;

use crate::error::GenerateError;
use crate::generation::{GenerationRequest, TextGenerator};

const SYSTEM_PROMPT: &str =
    "You are an expert technical writer. Reply with the README in Markdown only.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat-completions client. The scaffold and update templates may use
/// different models.
#[derive(Debug, Clone)]
pub struct ChatBackend {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    scaffold_model: String,
    update_model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatBackend {
    /// Build from config, reading the API key from the configured variable.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenerateError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerateError::MissingApiKey {
                var: config.api_key_env.clone(),
            })?;
        Self::with_key(config, api_key)
    }

    pub fn with_key(config: &GenerationConfig, api_key: String) -> Result<Self, GenerateError> {
        // Per-attempt deadlines are enforced by the generation client.
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| GenerateError::Transport { message: e.to_string() })?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key,
            scaffold_model: config.scaffold_model.clone(),
            update_model: config.update_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model_for(&self, template: TemplateId) -> &str {
        match template {
            TemplateId::Scaffold => &self.scaffold_model,
            TemplateId::Update => &self.update_model,
        }
    }
}

#[async_trait]
impl TextGenerator for ChatBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        let body = ChatRequest {
            model: self.model_for(request.template),
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &request.prompt },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateError::Transport { message: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            if code == 401 || code == 403 {
                return Err(GenerateError::Auth { status: code });
            }
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Status {
                status: code,
                body: truncate(&body, 500),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Malformed { message: e.to_string() })?;
        extract_content(parsed)
    }
}

fn extract_content(response: ChatResponse) -> Result<String, GenerateError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| GenerateError::Malformed {
            message: "response carried no message content".to_string(),
        })
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
