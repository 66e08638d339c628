use anyhow::Result;

use crate::models::ImageBlob;

/// Trait for anything that can turn a food image into analysis text: the
/// direct Gemini client, or the HTTP wrapper talking to a running server.
#[async_trait::async_trait]
pub trait VisionService: Send + Sync {
    async fn analyze_food_image(&self, image: &ImageBlob) -> Result<String>;
}
