pub mod client;
pub mod gemini; // Gemini vision API client
pub mod settings;
pub mod vision;

pub use client::AnalyzeClient;
pub use gemini::{GeminiClient, DEFAULT_MODEL, MODEL_CATALOG};
pub use settings::SettingsStore;
pub use vision::VisionService;

/// One timeout for every outbound analysis-path request.
pub(crate) const ANALYSIS_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
