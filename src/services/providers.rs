// Detection Provider Service
// Implements Sapling (text) and Sightengine (image, video, audio) API calls

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::MediaFile;

pub const SAPLING_DEFAULT_URL: &str = "https://api.sapling.ai/api/v1";
pub const SIGHTENGINE_DEFAULT_URL: &str = "https://api.sightengine.com/1.0";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 80;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("{provider} API error: {status} - {message}")]
    ApiError {
        provider: &'static str,
        status: u16,
        message: String,
    },
    #[error("{provider} request failed: {message}")]
    Rejected {
        provider: &'static str,
        message: String,
    },
    #[error("{0} failed to return a media ID")]
    MissingMediaId(&'static str),
    #[error("JSON parse error: {0}")]
    JsonError(String),
}

/// Providers send `null` for an empty list as often as they omit the key.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============ Credentials ============

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SightengineCredentials {
    pub api_user: String,
    pub api_secret: String,
}

// ============ Text (Sapling) ============

#[derive(Debug, Clone, Serialize)]
struct TextDetectRequest<'a> {
    key: &'a str,
    text: &'a str,
}

/// `[start, end, sentence, score]` as sent by the text provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SentenceScore(pub f64, pub f64, pub String, pub f64);

impl SentenceScore {
    pub fn sentence(&self) -> &str {
        &self.2
    }

    pub fn score(&self) -> f64 {
        self.3
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TextDetectResponse {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sentence_scores: Vec<SentenceScore>,
}

// ============ Media (Sightengine) ============

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProviderFailure {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

/// The `type` block of a media classification.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenAiScores {
    #[serde(default)]
    pub ai_generated: Option<f64>,
    #[serde(default)]
    pub ai_generators: Option<Map<String, Value>>,
    /// Remaining keys, including legacy `ai_generated_<model>` scores.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MediaCheckResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub scores: Option<GenAiScores>,
    #[serde(default)]
    pub media: Option<MediaInfo>,
    #[serde(default)]
    pub error: Option<ProviderFailure>,
}

impl MediaCheckResponse {
    pub fn is_failure(&self) -> bool {
        self.status.as_deref() == Some("failure")
    }

    pub fn error_message(&self) -> String {
        failure_message(self.error.as_ref(), "Unknown error")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoSubmitResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub media: Option<MediaInfo>,
    #[serde(default)]
    pub error: Option<ProviderFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoFrame {
    #[serde(default, rename = "type")]
    pub scores: Option<GenAiScores>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoJobData {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub frames: Vec<VideoFrame>,
    #[serde(default)]
    pub started: Option<f64>,
    #[serde(default)]
    pub last_update: Option<f64>,
    #[serde(default)]
    pub error: Option<ProviderFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoJobOutput {
    #[serde(default)]
    pub data: Option<VideoJobData>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoPollResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Option<VideoJobOutput>,
}

impl VideoPollResponse {
    pub fn job(&self) -> Option<&VideoJobData> {
        self.output.as_ref().and_then(|o| o.data.as_ref())
    }

    pub fn into_job(self) -> Option<VideoJobData> {
        self.output.and_then(|o| o.data)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FeedbackClass {
    Ai,
    NotAi,
}

impl FeedbackClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::NotAi => "not-ai",
        }
    }

    /// The class opposite to the prediction.
    pub fn opposite_of(is_ai_generated: bool) -> Self {
        if is_ai_generated {
            Self::NotAi
        } else {
            Self::Ai
        }
    }
}

pub fn failure_message(error: Option<&ProviderFailure>, fallback: &str) -> String {
    error
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| fallback.to_string())
}

// ============ Provider API ============

/// Outbound calls made by the detectors. Credentials are passed per call.
pub trait ProviderApi: Send + Sync {
    fn check_text(
        &self,
        api_key: &str,
        text: &str,
    ) -> impl Future<Output = Result<TextDetectResponse, ProviderError>> + Send;

    fn check_image(
        &self,
        creds: &SightengineCredentials,
        media: &MediaFile,
    ) -> impl Future<Output = Result<MediaCheckResponse, ProviderError>> + Send;

    fn submit_video(
        &self,
        creds: &SightengineCredentials,
        media: &MediaFile,
    ) -> impl Future<Output = Result<VideoSubmitResponse, ProviderError>> + Send;

    fn poll_video(
        &self,
        creds: &SightengineCredentials,
        media_id: &str,
    ) -> impl Future<Output = Result<VideoPollResponse, ProviderError>> + Send;

    fn check_audio(
        &self,
        creds: &SightengineCredentials,
        media: &MediaFile,
    ) -> impl Future<Output = Result<MediaCheckResponse, ProviderError>> + Send;

    fn send_feedback(
        &self,
        creds: &SightengineCredentials,
        media: &MediaFile,
        class: FeedbackClass,
    ) -> impl Future<Output = Result<Value, ProviderError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: Client,
    sapling_url: String,
    sightengine_url: String,
}

impl Default for ProviderClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderClient {
    pub fn new() -> Self {
        Self::with_urls(
            SAPLING_DEFAULT_URL,
            SIGHTENGINE_DEFAULT_URL,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_urls(sapling_url: &str, sightengine_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            sapling_url: sapling_url.trim_end_matches('/').to_string(),
            sightengine_url: sightengine_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn sapling_url(&self) -> &str {
        &self.sapling_url
    }

    pub fn sightengine_url(&self) -> &str {
        &self.sightengine_url
    }

    fn media_part(media: &MediaFile) -> Part {
        Part::bytes(media.bytes.clone()).file_name(media.file_name.clone())
    }

    fn credential_form(creds: &SightengineCredentials) -> Form {
        Form::new()
            .text("api_user", creds.api_user.clone())
            .text("api_secret", creds.api_secret.clone())
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        provider: &'static str,
        path: &str,
        form: Form,
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.sightengine_url, path);
        debug!(url = %url, "provider.request");
        let response = self.client.post(&url).multipart(form).send().await?;
        read_json(provider, response).await
    }
}

/// Reject non-success statuses with the body as message, else decode JSON.
async fn read_json<T: DeserializeOwned>(
    provider: &'static str,
    response: Response,
) -> Result<T, ProviderError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::ApiError {
            provider,
            status: status.as_u16(),
            message: body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::JsonError(e.to_string()))
}

impl ProviderApi for ProviderClient {
    async fn check_text(&self, api_key: &str, text: &str) -> Result<TextDetectResponse, ProviderError> {
        let url = format!("{}/aidetect", self.sapling_url);
        debug!(url = %url, chars = text.chars().count(), "provider.request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&TextDetectRequest { key: api_key, text })
            .send()
            .await?;

        read_json("Sapling", response).await
    }

    async fn check_image(
        &self,
        creds: &SightengineCredentials,
        media: &MediaFile,
    ) -> Result<MediaCheckResponse, ProviderError> {
        let form = Self::credential_form(creds)
            .part("media", Self::media_part(media))
            .text("models", "genai,deepfake")
            .text("opt_generators", "on");
        self.post_form("Sightengine", "check.json", form).await
    }

    async fn submit_video(
        &self,
        creds: &SightengineCredentials,
        media: &MediaFile,
    ) -> Result<VideoSubmitResponse, ProviderError> {
        let form = Self::credential_form(creds)
            .part("media", Self::media_part(media))
            .text("models", "genai")
            .text("opt_generators", "on");
        self.post_form("Sightengine Video", "video/check.json", form).await
    }

    async fn poll_video(
        &self,
        creds: &SightengineCredentials,
        media_id: &str,
    ) -> Result<VideoPollResponse, ProviderError> {
        let url = format!("{}/video/byid.json", self.sightengine_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("id", media_id),
                ("api_user", creds.api_user.as_str()),
                ("api_secret", creds.api_secret.as_str()),
            ])
            .send()
            .await?;
        read_json("Sightengine polling", response).await
    }

    async fn check_audio(
        &self,
        creds: &SightengineCredentials,
        media: &MediaFile,
    ) -> Result<MediaCheckResponse, ProviderError> {
        let form = Self::credential_form(creds)
            .part("audio", Self::media_part(media))
            .text("models", "genai");
        self.post_form("Sightengine Audio", "audio/check.json", form).await
    }

    async fn send_feedback(
        &self,
        creds: &SightengineCredentials,
        media: &MediaFile,
        class: FeedbackClass,
    ) -> Result<Value, ProviderError> {
        let form = Self::credential_form(creds)
            .part("audio", Self::media_part(media))
            .text("model", "genai")
            .text("class", class.as_str());
        self.post_form("Sightengine feedback", "feedback.json", form).await
    }
}
