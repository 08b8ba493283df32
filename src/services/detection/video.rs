// Video Detector
// Submit, poll until the job settles, then aggregate frame-level scores.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::models::{AnalysisDetails, ContentType, DetectionResult, MediaFile};
use crate::services::config_store::Credentials;
use crate::services::providers::{ProviderApi, VideoFrame, VideoJobData};

use super::detectors::{sightengine_credentials, NOT_AVAILABLE};
use super::error::DetectionError;
use super::evidence::synthesize;
use super::normalizer::{mean_score, normalize};
use super::polling::{poll_until_finished, submit, PollSettings};
use super::resolver::{numeric_scores, ModelEvidence};
use super::vocabulary::ModelVocabulary;

pub const VIDEO_METHOD: &str = "Proprietary Video Sequence Analysis";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameAggregate {
    pub frames: usize,
    /// Mean frame AI score; frames without one count as zero.
    pub mean_score: f64,
    /// Per-generator mean over frames that carry a breakdown, first-seen key order.
    pub generators: Option<Vec<(String, f64)>>,
}

pub fn aggregate_frames(frames: &[VideoFrame]) -> FrameAggregate {
    let mean = mean_score(
        frames
            .iter()
            .map(|f| f.scores.as_ref().and_then(|s| s.ai_generated).unwrap_or(0.0)),
    );

    let mut sums: Vec<(String, f64)> = Vec::new();
    let mut with_breakdown = 0usize;
    for breakdown in frames
        .iter()
        .filter_map(|f| f.scores.as_ref().and_then(|s| s.ai_generators.as_ref()))
    {
        with_breakdown += 1;
        for (key, score) in numeric_scores(breakdown) {
            match sums.iter_mut().find(|(k, _)| *k == key) {
                Some((_, total)) => *total += score,
                None => sums.push((key, score)),
            }
        }
    }

    let generators = (with_breakdown > 0).then(|| {
        sums.into_iter()
            .map(|(key, total)| (key, total / with_breakdown as f64))
            .collect()
    });

    FrameAggregate {
        frames: frames.len(),
        mean_score: mean,
        generators,
    }
}

/// Wall-clock seconds between job start and last update, when both are known.
pub fn processing_time(job: &VideoJobData) -> String {
    match (job.started, job.last_update) {
        (Some(started), Some(last_update)) => format!("{}s", (last_update - started).round() as i64),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub async fn detect_video<P: ProviderApi>(
    provider: &P,
    credentials: &Credentials,
    vocabulary: &ModelVocabulary,
    media: &MediaFile,
    poll: PollSettings,
    cancel: &CancellationToken,
) -> Result<DetectionResult, DetectionError> {
    let creds = sightengine_credentials(credentials)?;
    info!(file = %media.file_name, bytes = media.bytes.len(), "video.detect.start");

    let media_id = submit(provider, creds, media).await?;
    let finished = poll_until_finished(provider, creds, &media_id, poll, cancel).await?;
    let job = finished.job;

    let aggregate = aggregate_frames(&job.frames);
    if aggregate.frames == 0 {
        warn!(media_id = %finished.media_id, "video.detect.no_frames");
    }

    let scores = normalize(aggregate.mean_score);
    let patterns = synthesize(ContentType::Video, scores.is_ai_generated, None);
    let details = AnalysisDetails {
        analysis_method: VIDEO_METHOD.to_string(),
        processing_time: processing_time(&job),
        patterns,
        frames_analyzed: Some(aggregate.frames as u32),
    };

    info!(
        media_id = %finished.media_id,
        polls = finished.attempts,
        frames = aggregate.frames,
        confidence = scores.confidence,
        verdict = ?scores.verdict,
        "video.detect.done"
    );

    Ok(DetectionResult::assemble(ContentType::Video, scores, details, || {
        vocabulary.detected_model(&ModelEvidence {
            breakdown: aggregate.generators,
            ..ModelEvidence::with_confidence(scores.confidence)
        })
    }))
}
