// Model-Name Resolver
// Picks the single best-supported generator label for an AI-positive result.

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::models::DetectedModel;

use super::vocabulary::ModelVocabulary;

/// Breakdown key that never names a concrete generator.
const OTHER_KEY: &str = "other";

static WORD_START: OnceLock<Regex> = OnceLock::new();

/// Provider output relevant to naming the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelEvidence {
    pub confidence: u8,
    /// Per-generator scores in provider order, when the response has them.
    pub breakdown: Option<Vec<(String, f64)>>,
    /// Flat top-level scores, scanned by the legacy prefix strategy.
    pub scores: Vec<(String, f64)>,
    /// Media URI echoed by the provider, else the uploaded filename.
    pub filename_hint: Option<String>,
}

impl ModelEvidence {
    pub fn with_confidence(confidence: u8) -> Self {
        Self {
            confidence,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub enum ResolverStrategy {
    /// Highest-scoring key of a nested generator breakdown.
    Breakdown {
        table: &'static [(&'static str, &'static str)],
    },
    /// Highest-scoring `<prefix><model>` key among flat scores.
    LegacyPrefix {
        prefix: &'static str,
        table: &'static [(&'static str, &'static str)],
    },
    /// Label by the overall confidence, first tier whose floor is met.
    ConfidenceTier { tiers: &'static [(u8, &'static str)] },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The evidence this strategy reads is absent; try the next one.
    NotApplicable,
    NoMatch,
    Label(String),
}

impl ResolverStrategy {
    pub fn resolve(&self, evidence: &ModelEvidence) -> Resolution {
        match self {
            Self::Breakdown { table } => {
                let Some(breakdown) = evidence.breakdown.as_ref() else {
                    return Resolution::NotApplicable;
                };
                let candidates = breakdown
                    .iter()
                    .filter(|(key, _)| key != OTHER_KEY)
                    .map(|(key, score)| (key.as_str(), *score));
                match strongest(candidates) {
                    Some(key) => Resolution::Label(lookup_label(table, key)),
                    None => Resolution::NoMatch,
                }
            }
            Self::LegacyPrefix { prefix, table } => {
                if evidence.breakdown.is_some() {
                    return Resolution::NotApplicable;
                }
                let candidates = evidence.scores.iter().filter_map(|(key, score)| {
                    key.strip_prefix(*prefix)
                        .filter(|model| !model.is_empty())
                        .map(|model| (model, *score))
                });
                match strongest(candidates) {
                    Some(model) => Resolution::Label(lookup_label(table, model)),
                    None => Resolution::NoMatch,
                }
            }
            Self::ConfidenceTier { tiers } => tiers
                .iter()
                .find(|(floor, _)| evidence.confidence >= *floor)
                .map(|(_, label)| Resolution::Label(label.to_string()))
                .unwrap_or(Resolution::NoMatch),
        }
    }
}

impl ModelVocabulary {
    /// Resolve the model label. Pure: identical evidence yields the same label.
    pub fn resolve(&self, evidence: &ModelEvidence) -> String {
        let mut label = None;
        for strategy in &self.strategies {
            match strategy.resolve(evidence) {
                Resolution::NotApplicable => continue,
                Resolution::NoMatch => break,
                Resolution::Label(l) => {
                    label = Some(l);
                    break;
                }
            }
        }

        match label {
            Some(l) if !self.is_generic(&l) => l,
            generic => evidence
                .filename_hint
                .as_deref()
                .and_then(|name| self.match_filename(name))
                .map(str::to_string)
                .or(generic)
                .unwrap_or_else(|| self.default_label.to_string()),
        }
    }

    pub fn detected_model(&self, evidence: &ModelEvidence) -> DetectedModel {
        DetectedModel {
            name: self.resolve(evidence),
            provider: self.provider.to_string(),
            description: self.description.to_string(),
            confidence: evidence.confidence,
        }
    }

    pub fn match_filename(&self, filename: &str) -> Option<&'static str> {
        let lower = filename.to_lowercase();
        self.filename_hints
            .iter()
            .find(|hint| hint.fragments.iter().any(|f| lower.contains(*f)))
            .map(|hint| hint.label)
    }
}

/// Key with the highest score. Only scores above zero count and ties keep the
/// earliest key.
fn strongest<'a, I>(scores: I) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut best = None;
    let mut max = 0.0;
    for (key, score) in scores {
        if score > max {
            max = score;
            best = Some(key);
        }
    }
    best
}

fn lookup_label(table: &[(&str, &str)], key: &str) -> String {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| humanize_key(key))
}

/// `stable_video` -> `Stable Video`
pub fn humanize_key(key: &str) -> String {
    let word_start = WORD_START.get_or_init(|| Regex::new(r"\b\w").unwrap());
    word_start
        .replace_all(&key.replace('_', " "), |caps: &Captures| caps[0].to_uppercase())
        .into_owned()
}

/// Numeric entries of a provider score map, in provider order.
pub fn numeric_scores(map: &Map<String, Value>) -> Vec<(String, f64)> {
    map.iter()
        .filter_map(|(key, value)| value.as_f64().map(|score| (key.clone(), score)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::detection::vocabulary::ModelVocabulary;
    use serde_json::json;

    fn pairs(items: &[(&str, f64)]) -> Vec<(String, f64)> {
        items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn breakdown(items: &[(&str, f64)]) -> ModelEvidence {
        ModelEvidence {
            confidence: 90,
            breakdown: Some(pairs(items)),
            ..ModelEvidence::default()
        }
    }

    #[test]
    fn test_breakdown_picks_maximum() {
        let vocab = ModelVocabulary::image();
        let ev = breakdown(&[("flux", 0.1), ("midjourney", 0.7), ("dalle", 0.2)]);
        assert_eq!(vocab.resolve(&ev), "Midjourney");
    }

    #[test]
    fn test_breakdown_skips_other() {
        let vocab = ModelVocabulary::image();
        let ev = breakdown(&[("other", 0.9), ("gpt", 0.05)]);
        assert_eq!(vocab.resolve(&ev), "DALL·E / ChatGPT");
    }

    #[test]
    fn test_breakdown_tie_keeps_first_seen() {
        let vocab = ModelVocabulary::video();
        let ev = breakdown(&[("sora", 0.4), ("kling", 0.4)]);
        assert_eq!(vocab.resolve(&ev), "Sora");
        let ev = breakdown(&[("kling", 0.4), ("sora", 0.4)]);
        assert_eq!(vocab.resolve(&ev), "Kling");
    }

    #[test]
    fn test_unmapped_key_is_humanized() {
        let vocab = ModelVocabulary::video();
        let ev = breakdown(&[("hailuo_minimax", 0.8)]);
        assert_eq!(vocab.resolve(&ev), "Hailuo Minimax");
        assert_eq!(humanize_key("stable-video_diffusion"), "Stable-Video Diffusion");
    }

    #[test]
    fn test_empty_breakdown_does_not_fall_to_legacy() {
        let vocab = ModelVocabulary::image();
        let ev = ModelEvidence {
            confidence: 80,
            breakdown: Some(pairs(&[("midjourney", 0.0)])),
            scores: pairs(&[("ai_generated_dalle", 0.9)]),
            filename_hint: None,
        };
        assert_eq!(vocab.resolve(&ev), "AI Image Generator");
    }

    #[test]
    fn test_legacy_prefix_scan() {
        let vocab = ModelVocabulary::image();
        let ev = ModelEvidence {
            confidence: 80,
            breakdown: None,
            scores: pairs(&[
                ("ai_generated", 0.95),
                ("ai_generated_dalle", 0.3),
                ("ai_generated_stablediffusion", 0.6),
            ]),
            filename_hint: None,
        };
        assert_eq!(vocab.resolve(&ev), "Stable Diffusion");

        let ev = ModelEvidence {
            scores: pairs(&[("ai_generated_imagine_pro", 0.6)]),
            ..ev
        };
        assert_eq!(vocab.resolve(&ev), "Imagine Pro");
    }

    #[test]
    fn test_filename_fallback_when_unresolved() {
        let vocab = ModelVocabulary::image();
        let mut ev = breakdown(&[("other", 0.8)]);
        ev.filename_hint = Some("uploads/ChatGPT Image Jun 3.png".to_string());
        assert_eq!(vocab.resolve(&ev), "DALL·E / ChatGPT");

        ev.filename_hint = Some("my_StableDiffusion_render.jpg".to_string());
        assert_eq!(vocab.resolve(&ev), "Stable Diffusion");

        ev.filename_hint = Some("holiday.jpg".to_string());
        assert_eq!(vocab.resolve(&ev), "AI Image Generator");
    }

    #[test]
    fn test_filename_fallback_replaces_other_sentinel() {
        let vocab = ModelVocabulary::image();
        let ev = ModelEvidence {
            confidence: 70,
            breakdown: None,
            scores: pairs(&[("ai_generated_other", 0.8)]),
            filename_hint: Some("firefly-output.png".to_string()),
        };
        assert_eq!(vocab.resolve(&ev), "Adobe Firefly");

        let ev = ModelEvidence {
            filename_hint: None,
            ..ev
        };
        assert_eq!(vocab.resolve(&ev), "Other");
    }

    #[test]
    fn test_filename_ignored_when_breakdown_names_model() {
        let vocab = ModelVocabulary::image();
        let mut ev = breakdown(&[("flux", 0.8)]);
        ev.filename_hint = Some("midjourney.png".to_string());
        assert_eq!(vocab.resolve(&ev), "Flux");
    }

    #[test]
    fn test_video_has_no_filename_fallback() {
        let vocab = ModelVocabulary::video();
        let mut ev = breakdown(&[]);
        ev.filename_hint = Some("midjourney.mp4".to_string());
        assert_eq!(vocab.resolve(&ev), "AI Video Generator");
    }

    #[test]
    fn test_confidence_tiers() {
        let vocab = ModelVocabulary::text();
        assert_eq!(vocab.resolve(&ModelEvidence::with_confidence(85)), "High-Confidence AI");
        assert_eq!(vocab.resolve(&ModelEvidence::with_confidence(84)), "AI Generated");
        assert_eq!(vocab.resolve(&ModelEvidence::with_confidence(65)), "AI Generated");
        assert_eq!(vocab.resolve(&ModelEvidence::with_confidence(64)), "Likely AI");
        assert_eq!(vocab.resolve(&ModelEvidence::with_confidence(50)), "Likely AI");

        let audio = ModelVocabulary::audio();
        assert_eq!(audio.resolve(&ModelEvidence::with_confidence(99)), "AI Voice/Audio Generator");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let vocab = ModelVocabulary::image();
        let ev = breakdown(&[("ideogram", 0.3), ("recraft", 0.3), ("other", 0.4)]);
        assert_eq!(vocab.resolve(&ev), vocab.resolve(&ev));
    }

    #[test]
    fn test_numeric_scores_keeps_provider_order() {
        let value = json!({"wan": 0.2, "note": "x", "gan": 0.1, "flux": 0.3});
        let scores = numeric_scores(value.as_object().unwrap());
        let keys: Vec<&str> = scores.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["wan", "gan", "flux"]);
    }
}
