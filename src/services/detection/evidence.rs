// Evidence Synthesizer
// Short human-readable pattern strings backing a verdict

use crate::models::ContentType;

pub const MAX_PATTERNS: usize = 3;
/// Provider items must score above this to count as evidence.
pub const EVIDENCE_THRESHOLD: f64 = 0.5;

/// A provider-flagged item, e.g. a sentence and its AI likelihood.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem {
    pub text: String,
    pub score: f64,
}

fn fallback_patterns(content_type: ContentType, is_ai_generated: bool) -> &'static [&'static str] {
    match (content_type, is_ai_generated) {
        (ContentType::Text | ContentType::Web, true) => &[
            "Low mathematical perplexity detected",
            "Highly uniform token distribution",
            "Predictable sentence structures",
        ],
        (ContentType::Text | ContentType::Web, false) => &[
            "Natural language variance detected",
            "High lexical diversity",
            "Human-like burstiness in formatting",
        ],
        (ContentType::Image, true) => &[
            "Non-organic pixel pattern anomalies detected",
            "Latent space generation signatures found",
            "Unnatural boundary blending",
        ],
        (ContentType::Image, false) => &[
            "Natural chromatic noise distribution",
            "Authentic photographic depth characteristics",
        ],
        (ContentType::Video, true) => &[
            "Temporal spatial inconsistencies detected",
            "High frequency frame-level artificial artifacts",
            "Physics engine violations",
        ],
        (ContentType::Video, false) => &[
            "Consistent natural temporal flow",
            "Coherent inter-frame movement",
        ],
        (ContentType::Audio, true) => &[
            "Synthetic waveform signatures detected",
            "Unnatural prosody and gating",
            "Artificial background noise floor",
        ],
        (ContentType::Audio, false) => &[
            "Natural speech breathing patterns",
            "Authentic biological pitch variance",
        ],
    }
}

/// Provider evidence above the threshold, in provider order, at most three.
/// Falls back to the fixed list for the content type when nothing qualifies.
pub fn synthesize(
    content_type: ContentType,
    is_ai_generated: bool,
    provider_evidence: Option<&[ScoredItem]>,
) -> Vec<String> {
    let flagged: Vec<String> = provider_evidence
        .unwrap_or_default()
        .iter()
        .filter(|item| item.score > EVIDENCE_THRESHOLD)
        .take(MAX_PATTERNS)
        .map(|item| item.text.clone())
        .collect();

    if !flagged.is_empty() {
        return flagged;
    }

    fallback_patterns(content_type, is_ai_generated)
        .iter()
        .take(MAX_PATTERNS)
        .map(|p| p.to_string())
        .collect()
}
