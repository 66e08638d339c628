use anyhow::Result;
use reqwest::multipart;

use crate::models::{AnalysisResponse, ErrorDetail, ImageBlob};
use crate::services::{VisionService, ANALYSIS_TIMEOUT};

/// Thin wrapper around a running analysis server: multipart upload in, the
/// `AnalysisResponse` envelope out. Failures collapse into one of two
/// human-readable messages depending on whether the server answered at all.
pub struct AnalyzeClient {
    base_url: String,
    api_key: Option<String>,
    model: Option<String>,
    client: reqwest::Client,
}

impl AnalyzeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: None,
            client: reqwest::Client::new(),
        }
    }

    /// Attach the stored credential and model selector to every request.
    pub fn with_credentials(mut self, api_key: Option<String>, model: Option<String>) -> Self {
        self.api_key = api_key;
        self.model = model;
        self
    }

    pub async fn analyze(&self, image: &ImageBlob) -> Result<AnalysisResponse> {
        let part = multipart::Part::bytes(image.bytes().to_vec())
            .file_name(image.filename().to_string())
            .mime_str(image.mime_type())?;

        let mut form = multipart::Form::new().part("file", part);
        if let Some(key) = &self.api_key {
            form = form.text("api_key", key.clone());
        }
        if let Some(model) = &self.model {
            form = form.text("model", model.clone());
        }

        log::info!(
            "📤 Uploading {} ({} bytes) to {}/analyze-calories",
            image.filename(),
            image.len(),
            self.base_url
        );

        let response = self
            .client
            .post(format!("{}/analyze-calories", self.base_url))
            .multipart(form)
            .timeout(ANALYSIS_TIMEOUT)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                // Request was made but no response received.
                log::error!("❌ No response from analysis server: {}", e);
                anyhow::bail!("Unable to connect to the analysis server. Please check your connection.");
            }
        };

        let status = response.status();
        if !status.is_success() {
            // Server responded with an error status; surface its detail.
            let detail = response
                .json::<ErrorDetail>()
                .await
                .map(|body| body.detail)
                .unwrap_or_else(|_| "Analysis failed".to_string());
            log::error!("❌ Analysis server error ({}): {}", status, detail);
            anyhow::bail!("{}", detail);
        }

        Ok(response.json::<AnalysisResponse>().await?)
    }

    pub async fn check_health(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|_| anyhow::anyhow!("Health check failed"))?;

        if !response.status().is_success() {
            anyhow::bail!("Health check failed");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl VisionService for AnalyzeClient {
    async fn analyze_food_image(&self, image: &ImageBlob) -> Result<String> {
        Ok(self.analyze(image).await?.analysis)
    }
}
