//! Gemini REST client.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDate;
use herald_core::{CaptionError, Captioner, DayCategory};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{GeminiError, caption_prompt, greeting_prompt};

/// Public Gemini endpoint.
pub const GEMINI_API: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Client for one Gemini model.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    team_name: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        team_name: impl Into<String>,
    ) -> Result<Self, GeminiError> {
        Self::with_base_url(GEMINI_API, api_key, team_name)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        team_name: impl Into<String>,
    ) -> Result<Self, GeminiError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| GeminiError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            team_name: team_name.into(),
        })
    }

    /// Use a different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one `generateContent` call and return the concatenated text.
    async fn generate(&self, parts: Vec<Part<'_>>) -> Result<String, GeminiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: vec![Content { parts }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("failed to read response: {}", e));
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response: GenerateResponse = response.json().await?;
        extract_text(response)
    }
}

fn extract_text(response: GenerateResponse) -> Result<String, GeminiError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(GeminiError::Empty("no candidates".to_string()));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    let text = text.trim();

    if text.is_empty() {
        return Err(GeminiError::Empty(
            candidate
                .finish_reason
                .unwrap_or_else(|| "unknown".to_string()),
        ));
    }
    Ok(text.to_string())
}

#[async_trait]
impl Captioner for GeminiClient {
    async fn describe_image(&self, bytes: &[u8], mime_type: &str) -> Result<String, CaptionError> {
        let prompt = caption_prompt(&self.team_name);
        let parts = vec![
            Part::Text { text: &prompt },
            Part::InlineData {
                inline_data: InlineData {
                    mime_type,
                    data: BASE64.encode(bytes),
                },
            },
        ];
        debug!(size = bytes.len(), mime_type, model = %self.model, "requesting caption");
        let caption = self.generate(parts).await?;
        info!("caption generated");
        Ok(caption)
    }

    async fn greeting(
        &self,
        date: NaiveDate,
        category: DayCategory,
    ) -> Result<String, CaptionError> {
        let prompt = greeting_prompt(date, category, &self.team_name);
        debug!(date = %date, category = ?category, "requesting greeting");
        let greeting = self.generate(vec![Part::Text { text: &prompt }]).await?;
        info!("greeting generated");
        Ok(greeting)
    }
}
