//! Analysis HTTP service: the multipart `/analyze-calories` endpoint plus
//! liveness routes, mirroring the deployment this advisor's clients expect.

/// Hard cap on uploaded image size.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// Axum integration (optional - requires the api-server feature)
#[cfg(feature = "api-server")]
pub mod http {
    use std::sync::Arc;

    use axum::{
        extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use tower_http::cors::CorsLayer;

    use super::MAX_UPLOAD_BYTES;
    use crate::models::{AnalysisResponse, ErrorDetail, ImageBlob};
    use crate::services::{GeminiClient, VisionService, DEFAULT_MODEL};

    pub struct AppState {
        /// Shared connection pool for upstream requests.
        pub http: reqwest::Client,
        /// Server-side credential used when the request carries none.
        pub fallback_api_key: Option<String>,
    }

    pub fn create_router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_check))
            .route("/analyze-calories", post(analyze_calories))
            // The multipart body is the image plus form fields; leave headroom
            // above the file cap so oversized files get our 400, not a 413.
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 2 * 1024 * 1024))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Error body in the `{"detail": ...}` shape clients parse.
    struct ApiError {
        status: StatusCode,
        detail: String,
    }

    impl ApiError {
        fn bad_request(detail: impl Into<String>) -> Self {
            Self {
                status: StatusCode::BAD_REQUEST,
                detail: detail.into(),
            }
        }

        fn internal(detail: impl Into<String>) -> Self {
            Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: detail.into(),
            }
        }
    }

    impl From<MultipartError> for ApiError {
        fn from(e: MultipartError) -> Self {
            Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                detail: format!("Malformed multipart request: {}", e),
            }
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            (
                self.status,
                Json(ErrorDetail {
                    detail: self.detail,
                }),
            )
                .into_response()
        }
    }

    async fn root_handler() -> Json<serde_json::Value> {
        Json(json!({"message": "Calories Advisor API", "status": "running"}))
    }

    async fn health_check() -> Json<serde_json::Value> {
        Json(json!({"status": "healthy"}))
    }

    async fn analyze_calories(
        State(state): State<Arc<AppState>>,
        mut multipart: Multipart,
    ) -> Result<Json<AnalysisResponse>, ApiError> {
        let mut file: Option<ImageBlob> = None;
        let mut api_key: Option<String> = None;
        let mut model: Option<String> = None;

        while let Some(field) = multipart.next_field().await? {
            // `bytes`/`text` consume the field, so copy the metadata out first.
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "file" => {
                    let filename = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field.content_type().unwrap_or("").to_string();
                    let bytes = field.bytes().await?;
                    file = Some(ImageBlob::new(bytes.to_vec(), content_type, filename));
                }
                "api_key" => api_key = Some(field.text().await?),
                "model" => model = Some(field.text().await?),
                _ => {}
            }
        }

        let image = file.ok_or_else(|| ApiError::bad_request("No image uploaded"))?;

        if image.is_empty() {
            return Err(ApiError::bad_request("No image uploaded"));
        }
        if !image.mime_type().starts_with("image/") {
            return Err(ApiError::bad_request("File must be an image"));
        }
        if image.len() > MAX_UPLOAD_BYTES {
            return Err(ApiError::bad_request("File size too large"));
        }

        let api_key = api_key
            .filter(|k| !k.is_empty())
            .or_else(|| state.fallback_api_key.clone())
            .ok_or_else(|| ApiError::bad_request("No API key provided"))?;
        let model = model
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        log::info!(
            "📨 Analyze request: {} ({} bytes, {}) with model {}",
            image.filename(),
            image.len(),
            image.mime_type(),
            model
        );

        let gemini = GeminiClient::with_client(state.http.clone(), api_key, model);
        let analysis = gemini.analyze_food_image(&image).await.map_err(|e| {
            log::error!("❌ Image analysis failed: {}", e);
            ApiError::internal(format!("Error processing image: {}", e))
        })?;

        log::info!("✅ Analysis complete for {}", image.filename());

        Ok(Json(AnalysisResponse {
            success: true,
            analysis,
            filename: image.filename().to_string(),
            content_type: image.mime_type().to_string(),
        }))
    }

}
