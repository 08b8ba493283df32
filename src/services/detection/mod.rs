// Detection Module
// AI content detection organized into specialized submodules:
// - normalizer: raw provider score to confidence, flag and verdict
// - vocabulary / resolver: naming the generator behind a positive result
// - evidence: human-readable patterns backing a verdict
// - polling: video submission and status polling
// - detectors / video: per-content-type live detection
// - dispatcher: demo or live routing by content type

pub mod error;
pub mod normalizer;
pub mod vocabulary;
pub mod resolver;
pub mod evidence;
pub mod polling;
pub mod detectors;
pub mod video;
pub mod dispatcher;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used items
pub use error::DetectionError;
pub use normalizer::{
    normalize,
    mean_score,
    to_confidence,
    Normalized,
    AI_GENERATED_THRESHOLD,
    AI_VERDICT_THRESHOLD,
    MIXED_VERDICT_THRESHOLD,
};
pub use vocabulary::{ModelVocabulary, VocabularySet, ENGINE_PROVIDER};
pub use resolver::{humanize_key, ModelEvidence, Resolution, ResolverStrategy};
pub use evidence::{synthesize, ScoredItem, MAX_PATTERNS};
pub use polling::{poll_until_finished, submit, FinishedJob, JobStatus, PollSettings, PollState};
pub use detectors::{detect_audio, detect_image, detect_text, detect_web, FeedbackTask};
pub use video::{aggregate_frames, detect_video, FrameAggregate};
pub use dispatcher::{check_payload, Detector};
