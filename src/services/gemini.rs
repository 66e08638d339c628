use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};

use crate::models::ImageBlob;
use crate::prompts::CALORIE_ANALYSIS_PROMPT;
use crate::services::{VisionService, ANALYSIS_TIMEOUT};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_MODEL: &str = "models/gemma-3-27b-it";

/// A selectable model, as offered on the settings surface.
#[derive(Debug, Clone, Copy)]
pub struct ModelOption {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const MODEL_CATALOG: &[ModelOption] = &[
    ModelOption {
        id: "models/gemma-3-27b-it",
        name: "Gemma 3 27B IT",
        description: "Default - Most capable model",
    },
    ModelOption {
        id: "models/gemma-3-12b-it",
        name: "Gemma 3 12B IT",
        description: "Balanced performance and speed",
    },
    ModelOption {
        id: "models/gemini-robotics-er-1.5-preview",
        name: "Gemini Robotics ER 1.5",
        description: "Specialized for robotics tasks",
    },
    ModelOption {
        id: "models/gemma-3n-e4b-it",
        name: "Gemma 3N E4B IT",
        description: "Efficient smaller model",
    },
];

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Inline { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Direct client for the Gemini `generateContent` API.
pub struct GeminiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }

    /// Reuse an existing connection pool (the server shares one per process).
    pub fn with_client(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client,
        }
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);

        log::info!("🤖 Sending analysis request to Gemini model: {}", self.model);
        log::debug!(
            "📤 Request payload size: {} bytes",
            serde_json::to_string(request)?.len()
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(request)
            .timeout(ANALYSIS_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 Gemini response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await?;
            log::error!("❌ Gemini API error response: {}", error_text);
            anyhow::bail!("Gemini API error ({}): {}", status, error_text);
        }

        let generated: GenerateResponse = response.json().await?;
        let candidate = generated
            .candidates
            .into_iter()
            .next()
            .context("Gemini returned no candidates")?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if text.is_empty() {
            anyhow::bail!("Gemini returned an empty analysis");
        }

        log::info!("💬 Gemini analysis received ({} chars)", text.chars().count());
        Ok(text)
    }

    /// Cheap key check against the model listing endpoint, as the settings
    /// surface does before saving a key.
    pub async fn validate_key(client: &reqwest::Client, api_key: &str) -> Result<bool> {
        let response = client
            .get(format!("{}/models", GEMINI_API_BASE))
            .query(&[("key", api_key)])
            .timeout(ANALYSIS_TIMEOUT)
            .send()
            .await
            .context("Error validating API key. Please check your connection.")?;

        Ok(response.status().is_success())
    }
}

#[async_trait::async_trait]
impl VisionService for GeminiClient {
    async fn analyze_food_image(&self, image: &ImageBlob) -> Result<String> {
        log::debug!(
            "📸 Analyzing image {} ({} bytes, {})",
            image.filename(),
            image.len(),
            image.mime_type()
        );

        let encoded = general_purpose::STANDARD.encode(image.bytes());

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: CALORIE_ANALYSIS_PROMPT.to_string(),
                    },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: image.mime_type().to_string(),
                            data: encoded,
                        },
                    },
                ],
            }],
        };

        self.generate(&request).await
    }
}
