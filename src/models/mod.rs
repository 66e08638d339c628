use serde::{Deserialize, Serialize};

/// An immutable in-memory image payload with its MIME type and filename.
///
/// Produced by reading a file from disk or by confirming a camera capture.
/// Fields are private so a blob can never be half-mutated after creation;
/// ownership passes to whichever service submits it upstream.
#[derive(Debug, Clone)]
pub struct ImageBlob {
    bytes: Vec<u8>,
    mime_type: String,
    filename: String,
}

impl ImageBlob {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            filename: filename.into(),
        }
    }

    /// Read an image file from disk, guessing the MIME type from the extension.
    pub fn from_path(path: &str) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = std::path::Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.jpg".to_string());
        let mime_type = guess_mime_type(path);
        Ok(Self::new(bytes, mime_type, filename))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// MIME type from a file extension, defaulting to JPEG for unknown ones.
pub fn guess_mime_type(path: &str) -> &'static str {
    let lower = path.to_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else {
        "image/jpeg"
    }
}

/// One detected food line: display name plus the calorie value or range
/// exactly as it appeared in the analysis text (e.g. `"250"` or `"250-300"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    pub calories: String,
}

/// Best-effort structured interpretation of one analysis text.
///
/// Every field degrades to empty rather than erroring; `raw_analysis` keeps
/// the untouched source text so a renderer can always fall back to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSummary {
    pub food_items: Vec<FoodItem>,
    pub total_calories: String,
    pub health_note: String,
    pub macronutrients: String,
    pub recommendation: String,
    pub raw_analysis: String,
}

/// Envelope returned by the analysis endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub analysis: String,
    pub filename: String,
    pub content_type: String,
}

/// Error body shape shared by the server and the client wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("food.png"), "image/png");
        assert_eq!(guess_mime_type("DINNER.PNG"), "image/png");
        assert_eq!(guess_mime_type("plate.jpg"), "image/jpeg");
        assert_eq!(guess_mime_type("plate.jpeg"), "image/jpeg");
        assert_eq!(guess_mime_type("mystery"), "image/jpeg");
    }

    #[test]
    fn test_image_blob_accessors() {
        let blob = ImageBlob::new(vec![1, 2, 3], "image/png", "snack.png");
        assert_eq!(blob.len(), 3);
        assert!(!blob.is_empty());
        assert_eq!(blob.mime_type(), "image/png");
        assert_eq!(blob.filename(), "snack.png");
        assert_eq!(blob.bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_analysis_response_field_names() {
        let json = r#"{
            "success": true,
            "analysis": "1. Rice - 200 cal",
            "filename": "plate.jpg",
            "content_type": "image/jpeg"
        }"#;

        let envelope: AnalysisResponse = serde_json::from_str(json).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.analysis, "1. Rice - 200 cal");
        assert_eq!(envelope.filename, "plate.jpg");
        assert_eq!(envelope.content_type, "image/jpeg");

        let back = serde_json::to_value(&envelope).unwrap();
        assert!(back.get("content_type").is_some());
        assert!(back.get("filename").is_some());
    }
}
