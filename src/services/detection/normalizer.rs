// Score Normalizer
// Maps a provider's 0-1 score onto the 0-100 confidence and the verdict.

use crate::models::Verdict;

/// Confidence at or above which content is reported as AI-generated.
/// Deliberately separate from the verdict thresholds below: a score of 50-59
/// is `is_ai_generated` while its verdict is still `Mixed`.
pub const AI_GENERATED_THRESHOLD: u8 = 50;
/// Confidence at or above which the verdict is `Ai`.
pub const AI_VERDICT_THRESHOLD: u8 = 60;
/// Confidence at or above which the verdict is `Mixed`.
pub const MIXED_VERDICT_THRESHOLD: u8 = 30;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Normalized {
    pub confidence: u8,
    pub is_ai_generated: bool,
    pub verdict: Verdict,
}

impl Verdict {
    pub fn from_confidence(confidence: u8) -> Self {
        if confidence >= AI_VERDICT_THRESHOLD {
            Self::Ai
        } else if confidence >= MIXED_VERDICT_THRESHOLD {
            Self::Mixed
        } else {
            Self::Human
        }
    }
}

/// Convert a raw probability into a percentage, rounding half up.
pub fn to_confidence(raw_score: f64) -> u8 {
    let raw = if raw_score.is_finite() {
        raw_score.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (raw * 100.0).round() as u8
}

pub fn normalize(raw_score: f64) -> Normalized {
    let confidence = to_confidence(raw_score);
    Normalized {
        confidence,
        is_ai_generated: confidence >= AI_GENERATED_THRESHOLD,
        verdict: Verdict::from_confidence(confidence),
    }
}

/// Arithmetic mean of per-frame scores; an empty sequence averages to 0.
pub fn mean_score<I>(scores: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = scores
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), s| (sum + s, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_boundaries() {
        assert_eq!(Verdict::from_confidence(29), Verdict::Human);
        assert_eq!(Verdict::from_confidence(30), Verdict::Mixed);
        assert_eq!(Verdict::from_confidence(59), Verdict::Mixed);
        assert_eq!(Verdict::from_confidence(60), Verdict::Ai);
    }

    #[test]
    fn test_two_thresholds_are_independent() {
        let n = normalize(0.55);
        assert_eq!(n.confidence, 55);
        assert!(n.is_ai_generated);
        assert_eq!(n.verdict, Verdict::Mixed);

        let n = normalize(0.49);
        assert!(!n.is_ai_generated);
        assert_eq!(n.verdict, Verdict::Mixed);
    }

    #[test]
    fn test_normalize_rounds() {
        assert_eq!(normalize(0.294).confidence, 29);
        assert_eq!(normalize(0.296).confidence, 30);
        assert_eq!(normalize(0.5).confidence, 50);
        assert_eq!(normalize(1.0).confidence, 100);
    }

    #[test]
    fn test_normalize_is_monotonic() {
        let mut prev = normalize(0.0);
        for i in 1..=1000 {
            let n = normalize(i as f64 / 1000.0);
            assert!(n.confidence >= prev.confidence);
            prev = n;
        }
        assert_eq!(prev.confidence, 100);
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        assert_eq!(normalize(-0.3).confidence, 0);
        assert_eq!(normalize(1.7).confidence, 100);
        assert_eq!(normalize(f64::NAN).verdict, Verdict::Human);
    }

    #[test]
    fn test_mean_score() {
        let n = normalize(mean_score([0.2, 0.8]));
        assert_eq!(n.confidence, 50);
        assert_eq!(n.verdict, Verdict::Mixed);
        assert!(n.is_ai_generated);
        assert_eq!(mean_score(Vec::<f64>::new()), 0.0);
    }
}
