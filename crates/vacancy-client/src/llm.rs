use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use vacancy_core::error::AppError;
use vacancy_core::traits::{Extractor, VisionExtractor};

use crate::fetcher::transport_error;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_SYSTEM_PROMPT: &str = "You extract structured information about job vacancies. \
    Respond ONLY with valid JSON matching the requested schema. \
    Leave a field empty rather than guessing.";

/// OpenAI-compatible chat-completions client used for text and image extraction.
///
/// Any endpoint that speaks the chat-completions protocol with JSON-schema
/// response formats works, e.g. OpenAI itself or Gemini's compatibility layer.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
    system_prompt: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str) -> Result<Self, AppError> {
        Self::build(api_key, DEFAULT_MODEL, DEFAULT_BASE_URL, DEFAULT_LLM_TIMEOUT)
    }

    pub fn with_model(self, model: &str) -> Result<Self, AppError> {
        Self::build(&self.api_key, model, &self.base_url, self.timeout())
    }

    pub fn with_base_url(self, base_url: &str) -> Result<Self, AppError> {
        Self::build(&self.api_key, &self.model, base_url, self.timeout())
    }

    pub fn with_timeout(self, timeout: Duration) -> Result<Self, AppError> {
        Self::build(&self.api_key, &self.model, &self.base_url, timeout)
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn build(
        api_key: &str,
        model: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::ConfigError("LLM API key must not be empty".into()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout_secs: timeout.as_secs(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        })
    }

    fn request(&self, user: Content, schema: &serde_json::Value) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: Content::Text(self.system_prompt.clone()),
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaWrapper {
                    name: "vacancy_extraction",
                    strict: true,
                    schema: schema.clone(),
                },
            },
        }
    }

    async fn complete(&self, request: &ChatRequest) -> Result<serde_json::Value, AppError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            if status_code == 429 {
                return Err(AppError::RateLimitExceeded);
            }
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status_code}: {body}"));
            return Err(AppError::LlmError {
                message,
                status_code,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse LLM response: {e}")))?;

        parse_completion(chat)
    }
}

fn parse_completion(chat: ChatResponse) -> Result<serde_json::Value, AppError> {
    let content = chat
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AppError::LlmError {
            message: "Empty response from LLM".into(),
            status_code: 200,
        })?;

    serde_json::from_str(&content).map_err(|e| {
        AppError::SchemaValidationError(format!("LLM returned invalid JSON: {e}. Raw: {content}"))
    })
}

fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

// ---- OpenAI API types ----

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Content,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaWrapper,
}

#[derive(Serialize)]
struct JsonSchemaWrapper {
    name: &'static str,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl Extractor for OpenAiClient {
    async fn extract(
        &self,
        content: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        let user = Content::Text(format!(
            "Extract data according to this JSON schema:\n```json\n{}\n```\n\n\
             From the following content:\n\n{}",
            serde_json::to_string_pretty(schema)?,
            content
        ));
        self.complete(&self.request(user, schema)).await
    }
}

impl VisionExtractor for OpenAiClient {
    async fn extract_from_image(
        &self,
        png: &[u8],
        instruction: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        let user = Content::Parts(vec![
            ContentPart::Text {
                text: instruction.to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: png_data_uri(png),
                },
            },
        ]);
        self.complete(&self.request(user, schema)).await
    }
}
