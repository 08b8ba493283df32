// aiscope Data Models
// The unified detection contract shared by live detectors and demo mode

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::services::detection::error::DetectionError;
use crate::services::detection::normalizer::Normalized;

// ============ Content Type ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    Video,
    Audio,
    Web,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Text,
        ContentType::Image,
        ContentType::Video,
        ContentType::Audio,
        ContentType::Web,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Web => "web",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = DetectionError;

    fn from_str(val: &str) -> Result<Self, Self::Err> {
        match val.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "web" => Ok(Self::Web),
            _ => Err(DetectionError::UnknownContentType(val.to_string())),
        }
    }
}

// ============ Verdict ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Human,
    Mixed,
    Ai,
}

// ============ Detection Request ============

/// Uploaded media: the original file name plus its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self { file_name, bytes })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectPayload {
    Text(String),
    Url(String),
    File(MediaFile),
}

impl DetectPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Url(_) => "url",
            Self::File(_) => "file",
        }
    }
}

// ============ Detection Result ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedModel {
    pub name: String,
    pub provider: String,
    pub description: String,
    /// Certainty in this specific label, not in the overall verdict.
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDetails {
    pub analysis_method: String,
    pub processing_time: String,
    pub patterns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_analyzed: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub is_ai_generated: bool,
    pub confidence: u8,
    pub verdict: Verdict,
    pub detected_model: Option<DetectedModel>,
    pub content_type: ContentType,
    pub details: AnalysisDetails,
}

impl DetectionResult {
    /// Builds a result from normalized scores. `detected_model` is only called
    /// when the content is judged AI-generated, so a human result never
    /// carries a model.
    pub fn assemble<F>(
        content_type: ContentType,
        scores: Normalized,
        details: AnalysisDetails,
        detected_model: F,
    ) -> Self
    where
        F: FnOnce() -> DetectedModel,
    {
        Self {
            is_ai_generated: scores.is_ai_generated,
            confidence: scores.confidence,
            verdict: scores.verdict,
            detected_model: scores.is_ai_generated.then(detected_model),
            content_type,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::detection::normalizer::normalize;

    fn details() -> AnalysisDetails {
        AnalysisDetails {
            analysis_method: "test".to_string(),
            processing_time: "N/A".to_string(),
            patterns: vec![],
            frames_analyzed: None,
        }
    }

    fn model() -> DetectedModel {
        DetectedModel {
            name: "Sora".to_string(),
            provider: "Our AI Engine".to_string(),
            description: "".to_string(),
            confidence: 80,
        }
    }

    #[test]
    fn test_content_type_parse() {
        assert_eq!("Video".parse::<ContentType>().unwrap(), ContentType::Video);
        assert_eq!(" web ".parse::<ContentType>().unwrap(), ContentType::Web);
        let err = "podcast".parse::<ContentType>().unwrap_err();
        assert!(matches!(err, DetectionError::UnknownContentType(ref t) if t == "podcast"));
    }

    #[test]
    fn test_assemble_omits_model_for_human_content() {
        let mut called = false;
        let result = DetectionResult::assemble(ContentType::Image, normalize(0.2), details(), || {
            called = true;
            model()
        });
        assert!(!called);
        assert!(result.detected_model.is_none());
        assert_eq!(result.verdict, Verdict::Human);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let mut details = details();
        details.frames_analyzed = Some(4);
        let result = DetectionResult::assemble(ContentType::Video, normalize(0.9), details, model);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isAiGenerated"], true);
        assert_eq!(json["verdict"], "ai");
        assert_eq!(json["contentType"], "video");
        assert_eq!(json["detectedModel"]["name"], "Sora");
        assert_eq!(json["details"]["framesAnalyzed"], 4);
        assert_eq!(json["details"]["processingTime"], "N/A");
    }

    #[test]
    fn test_frames_analyzed_skipped_when_absent() {
        let result = DetectionResult::assemble(ContentType::Text, normalize(0.1), details(), model);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["details"].get("framesAnalyzed").is_none());
        assert!(json["detectedModel"].is_null());
    }
}
