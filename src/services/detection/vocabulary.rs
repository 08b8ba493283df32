// Model Vocabulary
// Per-content-type lookup data for naming the generator behind a detection.
// Tables are immutable and handed to detectors at construction.

use crate::models::ContentType;

use super::resolver::ResolverStrategy;

/// Label reported by every live detector as the model's provider.
pub const ENGINE_PROVIDER: &str = "Our AI Engine";

/// Generic label some providers return when no specific generator stands out.
pub const OTHER_SENTINEL: &str = "Other";

/// Maps filename fragments (lowercase) to a model label.
#[derive(Debug, Clone, Copy)]
pub struct FilenameHint {
    pub fragments: &'static [&'static str],
    pub label: &'static str,
}

#[derive(Debug, Clone)]
pub struct ModelVocabulary {
    pub content_type: ContentType,
    /// Tried in order; the first applicable strategy decides.
    pub strategies: Vec<ResolverStrategy>,
    pub filename_hints: &'static [FilenameHint],
    pub default_label: &'static str,
    pub provider: &'static str,
    pub description: &'static str,
}

const IMAGE_GENERATORS: &[(&str, &str)] = &[
    ("midjourney", "Midjourney"),
    ("dalle", "DALL·E"),
    ("gpt", "DALL·E / ChatGPT"),
    ("stable_diffusion", "Stable Diffusion"),
    ("firefly", "Adobe Firefly"),
    ("imagen", "Google Imagen"),
    ("flux", "Flux"),
    ("ideogram", "Ideogram"),
    ("recraft", "Recraft"),
    ("gan", "GAN"),
    ("wan", "Wan"),
    ("qwen", "Qwen"),
    ("z_image", "Z-Image"),
];

/// Older image responses report `ai_generated_<model>` keys beside the
/// overall score instead of a nested breakdown.
const LEGACY_IMAGE_PREFIX: &str = "ai_generated_";

const LEGACY_IMAGE_GENERATORS: &[(&str, &str)] = &[
    ("midjourney", "Midjourney"),
    ("dalle", "DALL·E"),
    ("stablediffusion", "Stable Diffusion"),
    ("adobe", "Adobe Firefly"),
];

const IMAGE_FILENAME_HINTS: &[FilenameHint] = &[
    FilenameHint {
        fragments: &["chatgpt", "dalle", "dall-e"],
        label: "DALL·E / ChatGPT",
    },
    FilenameHint {
        fragments: &["midjourney"],
        label: "Midjourney",
    },
    FilenameHint {
        fragments: &["stable diffusion", "stablediffusion"],
        label: "Stable Diffusion",
    },
    FilenameHint {
        fragments: &["firefly", "adobe"],
        label: "Adobe Firefly",
    },
];

const VIDEO_GENERATORS: &[(&str, &str)] = &[
    ("kling", "Kling"),
    ("midjourney", "Midjourney"),
    ("pika", "Pika"),
    ("runway", "Runway"),
    ("sora", "Sora"),
    ("veo", "Veo"),
    ("wan", "Wan"),
];

/// Text detection reports no generator, so the label reflects certainty.
const TEXT_TIERS: &[(u8, &str)] = &[
    (85, "High-Confidence AI"),
    (65, "AI Generated"),
    (50, "Likely AI"),
];

impl ModelVocabulary {
    pub fn text() -> Self {
        Self {
            content_type: ContentType::Text,
            strategies: vec![ResolverStrategy::ConfidenceTier { tiers: TEXT_TIERS }],
            filename_hints: &[],
            default_label: "AI Generated",
            provider: ENGINE_PROVIDER,
            description: "Text analyzed for AI generation patterns including perplexity and burstiness.",
        }
    }

    pub fn image() -> Self {
        Self {
            content_type: ContentType::Image,
            strategies: vec![
                ResolverStrategy::Breakdown {
                    table: IMAGE_GENERATORS,
                },
                ResolverStrategy::LegacyPrefix {
                    prefix: LEGACY_IMAGE_PREFIX,
                    table: LEGACY_IMAGE_GENERATORS,
                },
            ],
            filename_hints: IMAGE_FILENAME_HINTS,
            default_label: "AI Image Generator",
            provider: ENGINE_PROVIDER,
            description: "Image analyzed for AI generation artifacts and model signatures.",
        }
    }

    pub fn video() -> Self {
        Self {
            content_type: ContentType::Video,
            strategies: vec![ResolverStrategy::Breakdown {
                table: VIDEO_GENERATORS,
            }],
            filename_hints: &[],
            default_label: "AI Video Generator",
            provider: ENGINE_PROVIDER,
            description: "Video frames analyzed for temporal consistency and AI artifacts.",
        }
    }

    pub fn audio() -> Self {
        Self {
            content_type: ContentType::Audio,
            strategies: vec![ResolverStrategy::ConfidenceTier { tiers: &[] }],
            filename_hints: &[],
            default_label: "AI Voice/Audio Generator",
            provider: ENGINE_PROVIDER,
            description: "Audio analyzed for synthetic speech patterns and AI generation artifacts.",
        }
    }

    pub fn is_generic(&self, label: &str) -> bool {
        label == OTHER_SENTINEL || label == self.default_label
    }
}

/// One vocabulary per content type.
#[derive(Debug, Clone)]
pub struct VocabularySet {
    text: ModelVocabulary,
    image: ModelVocabulary,
    video: ModelVocabulary,
    audio: ModelVocabulary,
}

impl Default for VocabularySet {
    fn default() -> Self {
        Self::standard()
    }
}

impl VocabularySet {
    pub fn standard() -> Self {
        Self {
            text: ModelVocabulary::text(),
            image: ModelVocabulary::image(),
            video: ModelVocabulary::video(),
            audio: ModelVocabulary::audio(),
        }
    }

    /// Web has no live detector, so it has nothing to name.
    pub fn get(&self, content_type: ContentType) -> Option<&ModelVocabulary> {
        match content_type {
            ContentType::Text => Some(&self.text),
            ContentType::Image => Some(&self.image),
            ContentType::Video => Some(&self.video),
            ContentType::Audio => Some(&self.audio),
            ContentType::Web => None,
        }
    }
}
