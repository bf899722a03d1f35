//! Gemini `generateContent` adapter for the `TextGenerator` port.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use legal_types::{GenerationError, GenerationRequest, TextGenerator, TurnRole};

use super::retry::RetryPolicy;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Keeps the key out of the URL, and so out of error messages and logs.
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiContent,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    message: String,
}

impl GeminiContent {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![GeminiPart {
                text: Some(text.to_string()),
            }],
        }
    }
}

impl GeminiResponse {
    /// First text part of the first candidate.
    fn reply(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Gemini names the assistant side `model`.
const fn convert_role(role: TurnRole) -> &'static str {
    match role {
        TurnRole::User => "user",
        TurnRole::Bot => "model",
    }
}

/// HTTP client for the Gemini API.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl GeminiGenerator {
    pub fn new(
        api_key: String,
        model: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry,
        })
    }

    /// Override the API base URL (for testing).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    fn build_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(request: &GenerationRequest) -> GeminiRequest {
        GeminiRequest {
            contents: request
                .history
                .iter()
                .map(|turn| GeminiContent::text(Some(convert_role(turn.role)), &turn.text))
                .collect(),
            system_instruction: GeminiContent::text(None, &request.instruction),
        }
    }

    async fn call(&self, url: &str, body: &GeminiRequest) -> Result<Option<String>, GenerationError> {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        debug!(status = %status, "generation response received");

        let parsed = serde_json::from_str::<GeminiResponse>(&text);

        if !status.is_success() {
            let message = match parsed {
                Ok(GeminiResponse {
                    error: Some(err), ..
                }) => err.message,
                _ => text,
            };
            error!(status = %status, message = %message, "Gemini API error");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = parsed.map_err(|e| GenerationError::Decode(e.to_string()))?;
        if let Some(err) = parsed.error {
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: err.message,
            });
        }

        Ok(parsed.reply())
    }
}

fn transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Transport(e.without_url().to_string())
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    #[instrument(skip(self, request), fields(model = %self.model, turns = request.history.len()))]
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Option<String>, GenerationError> {
        let url = self.build_url();
        let body = Self::build_request(request);

        self.retry
            .run("gemini.generate", GenerationError::is_transient, || {
                self.call(&url, &body)
            })
            .await
    }
}
