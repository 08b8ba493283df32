// Live Detectors
// One function per content type: call the provider, normalize, name the model.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::{AnalysisDetails, ContentType, DetectionResult, MediaFile};
use crate::services::config_store::Credentials;
use crate::services::providers::{
    FeedbackClass, MediaCheckResponse, ProviderApi, ProviderError, SightengineCredentials,
};

use super::error::DetectionError;
use super::evidence::{synthesize, ScoredItem};
use super::normalizer::normalize;
use super::resolver::{numeric_scores, ModelEvidence};
use super::vocabulary::ModelVocabulary;

pub const TEXT_METHOD: &str = "Proprietary Deep Analysis";
pub const IMAGE_METHOD: &str = "Proprietary Image Deep Analysis";
pub const AUDIO_METHOD: &str = "Proprietary Audio Deep Analysis";
pub(crate) const NOT_AVAILABLE: &str = "N/A";

pub const WEB_UNSUPPORTED: &str = "Web content detection requires a backend proxy to fetch URLs. \
In demo mode, this works with mock data. For live mode, set up a server-side proxy.";

/// Detached feedback upload; dropping the handle does not cancel it.
pub type FeedbackTask = JoinHandle<()>;

pub(crate) fn sapling_key(credentials: &Credentials) -> Result<&str, DetectionError> {
    credentials
        .sapling_api_key
        .as_deref()
        .ok_or_else(|| DetectionError::missing_credentials("Sapling API key", "SAPLING_API_KEY"))
}

pub(crate) fn sightengine_credentials(
    credentials: &Credentials,
) -> Result<&SightengineCredentials, DetectionError> {
    credentials.sightengine.as_ref().ok_or_else(|| {
        DetectionError::missing_credentials(
            "Sightengine",
            "SIGHTENGINE_API_USER and SIGHTENGINE_API_SECRET",
        )
    })
}

fn details(method: &str, processing_time: &str, patterns: Vec<String>) -> AnalysisDetails {
    AnalysisDetails {
        analysis_method: method.to_string(),
        processing_time: processing_time.to_string(),
        patterns,
        frames_analyzed: None,
    }
}

pub async fn detect_text<P: ProviderApi>(
    provider: &P,
    credentials: &Credentials,
    vocabulary: &ModelVocabulary,
    text: &str,
) -> Result<DetectionResult, DetectionError> {
    let api_key = sapling_key(credentials)?;
    info!(chars = text.chars().count(), "text.detect.start");

    let response = provider.check_text(api_key, text).await?;
    let scores = normalize(response.score.unwrap_or(0.0));

    let sentences: Vec<ScoredItem> = response
        .sentence_scores
        .iter()
        .map(|s| ScoredItem {
            text: s.sentence().to_string(),
            score: s.score(),
        })
        .collect();
    let patterns = synthesize(ContentType::Text, scores.is_ai_generated, Some(&sentences));

    info!(
        confidence = scores.confidence,
        verdict = ?scores.verdict,
        sentences = sentences.len(),
        "text.detect.done"
    );

    Ok(DetectionResult::assemble(
        ContentType::Text,
        scores,
        details(TEXT_METHOD, NOT_AVAILABLE, patterns),
        || vocabulary.detected_model(&ModelEvidence::with_confidence(scores.confidence)),
    ))
}

/// Evidence for the image resolver from a classification response.
fn image_evidence(response: &MediaCheckResponse, media: &MediaFile, confidence: u8) -> ModelEvidence {
    let scores = response.scores.as_ref();
    let filename_hint = response
        .media
        .as_ref()
        .and_then(|m| m.uri.clone())
        .filter(|uri| !uri.is_empty())
        .or_else(|| Some(media.file_name.clone()).filter(|name| !name.is_empty()));

    ModelEvidence {
        confidence,
        breakdown: scores
            .and_then(|s| s.ai_generators.as_ref())
            .map(numeric_scores),
        scores: scores.map(|s| numeric_scores(&s.extra)).unwrap_or_default(),
        filename_hint,
    }
}

fn ai_score(response: &MediaCheckResponse) -> f64 {
    response
        .scores
        .as_ref()
        .and_then(|s| s.ai_generated)
        .unwrap_or(0.0)
}

pub async fn detect_image<P: ProviderApi>(
    provider: &P,
    credentials: &Credentials,
    vocabulary: &ModelVocabulary,
    media: &MediaFile,
) -> Result<DetectionResult, DetectionError> {
    let creds = sightengine_credentials(credentials)?;
    info!(file = %media.file_name, bytes = media.bytes.len(), "image.detect.start");

    let response = provider.check_image(creds, media).await?;
    if response.is_failure() {
        return Err(ProviderError::Rejected {
            provider: "Sightengine image check",
            message: response.error_message(),
        }
        .into());
    }

    let scores = normalize(ai_score(&response));
    let patterns = synthesize(ContentType::Image, scores.is_ai_generated, None);
    info!(confidence = scores.confidence, verdict = ?scores.verdict, "image.detect.done");

    Ok(DetectionResult::assemble(
        ContentType::Image,
        scores,
        details(IMAGE_METHOD, NOT_AVAILABLE, patterns),
        || vocabulary.detected_model(&image_evidence(&response, media, scores.confidence)),
    ))
}

/// Classify audio, then report the opposite class back to the provider in the
/// background. The feedback outcome never touches the returned result.
pub async fn detect_audio<P: ProviderApi + 'static>(
    provider: &Arc<P>,
    credentials: &Credentials,
    vocabulary: &ModelVocabulary,
    media: &MediaFile,
) -> Result<(DetectionResult, FeedbackTask), DetectionError> {
    let creds = sightengine_credentials(credentials)?;
    info!(file = %media.file_name, bytes = media.bytes.len(), "audio.detect.start");

    let response = provider.check_audio(creds, media).await?;
    if response.status.as_deref() != Some("success") {
        return Err(ProviderError::Rejected {
            provider: "Sightengine audio check",
            message: response.error_message(),
        }
        .into());
    }

    let scores = normalize(ai_score(&response));
    let patterns = synthesize(ContentType::Audio, scores.is_ai_generated, None);
    let result = DetectionResult::assemble(
        ContentType::Audio,
        scores,
        details(AUDIO_METHOD, NOT_AVAILABLE, patterns),
        || vocabulary.detected_model(&ModelEvidence::with_confidence(scores.confidence)),
    );
    info!(confidence = scores.confidence, verdict = ?scores.verdict, "audio.detect.done");

    let feedback = spawn_feedback(
        Arc::clone(provider),
        creds.clone(),
        media.clone(),
        FeedbackClass::opposite_of(scores.is_ai_generated),
    );

    Ok((result, feedback))
}

fn spawn_feedback<P: ProviderApi + 'static>(
    provider: Arc<P>,
    creds: SightengineCredentials,
    media: MediaFile,
    class: FeedbackClass,
) -> FeedbackTask {
    tokio::spawn(async move {
        match provider.send_feedback(&creds, &media, class).await {
            Ok(response) => {
                debug!(class = class.as_str(), response = %response, "audio.feedback.sent")
            }
            Err(e) => warn!(class = class.as_str(), error = %e, "audio.feedback.failed"),
        }
    })
}

pub fn detect_web(url: &str) -> Result<DetectionResult, DetectionError> {
    warn!(url = %url, "web.detect.unsupported");
    Err(DetectionError::UnsupportedOperation(WEB_UNSUPPORTED.to_string()))
}
