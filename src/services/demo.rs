// Demo Mode
// Synthetic detection results for running without provider credentials

use rand::seq::IndexedRandom;
use rand::Rng;
use std::time::Duration;
use tracing::info;

use crate::models::{AnalysisDetails, ContentType, DetectedModel, DetectionResult, Verdict};

/// Share of demo results reported as AI-generated.
pub const DEMO_AI_PROBABILITY: f64 = 0.85;

#[derive(Debug, Clone, Copy)]
struct DemoModel {
    name: &'static str,
    provider: &'static str,
    description: &'static str,
    confidence: u8,
}

const fn model(name: &'static str, provider: &'static str, description: &'static str, confidence: u8) -> DemoModel {
    DemoModel {
        name,
        provider,
        description,
        confidence,
    }
}

const TEXT_MODELS: &[DemoModel] = &[
    model("GPT-4o", "OpenAI", "Large language model by OpenAI, known for fluent, structured text generation.", 89),
    model("Claude 3.5 Sonnet", "Anthropic", "Anthropic's conversational AI known for nuanced, safety-aware text outputs.", 76),
    model("Gemini 2.0 Flash", "Google DeepMind", "Google's multimodal model excelling at fast, high-quality text generation.", 72),
    model("LLaMA 3.1", "Meta", "Meta's open-source LLM known for competitive performance at various sizes.", 65),
];

const IMAGE_MODELS: &[DemoModel] = &[
    model("DALL·E 3", "OpenAI", "OpenAI's image generation model with strong prompt following and text rendering.", 92),
    model("Midjourney v6", "Midjourney", "Known for highly artistic, photorealistic image generation with distinctive aesthetics.", 87),
    model("Stable Diffusion XL", "Stability AI", "Open-source diffusion model capable of high-resolution, detailed image synthesis.", 78),
    model("Adobe Firefly", "Adobe", "Adobe's commercially-safe generative model trained on licensed content.", 68),
];

const VIDEO_MODELS: &[DemoModel] = &[
    model("Sora", "OpenAI", "OpenAI's video generation model creating realistic scenes from text prompts.", 85),
    model("Veo 2", "Google DeepMind", "Google's video generation AI with high temporal coherence and motion fidelity.", 79),
    model("Runway Gen-3 Alpha", "Runway", "Runway's latest video generation model offering fine-grained artistic control.", 74),
    model("Pika 1.5", "Pika Labs", "Video synthesis model focused on creative and stylistic video generation.", 62),
];

const AUDIO_MODELS: &[DemoModel] = &[
    model("ElevenLabs", "ElevenLabs", "Industry-leading AI voice synthesis with natural intonation and emotion.", 91),
    model("Bark", "Suno AI", "Open-source text-to-audio model supporting speech, music, and sound effects.", 73),
    model("XTTS v2", "Coqui", "Open-source voice cloning model supporting cross-lingual speech synthesis.", 66),
    model("Azure Neural TTS", "Microsoft", "Microsoft's neural text-to-speech with highly natural-sounding voices.", 60),
];

const WEB_MODELS: &[DemoModel] = &[
    model("GPT-4o", "OpenAI", "Large language model by OpenAI, commonly used for blog/article generation.", 84),
    model("Claude 3.5 Sonnet", "Anthropic", "Often used for long-form, well-structured web content creation.", 71),
    model("Jasper AI", "Jasper", "Marketing-focused AI writing tool powered by multiple LLMs.", 68),
];

const AI_PATTERNS: &[&str] = &[
    "Micro-patterns indicative of generation",
    "Extremely low variance in distribution",
    "Predictable structural repetition",
];

const HUMAN_PATTERNS: &[&str] = &[
    "High structural entropy",
    "Natural biological variance in distribution",
];

fn pool(content_type: ContentType) -> &'static [DemoModel] {
    match content_type {
        ContentType::Text => TEXT_MODELS,
        ContentType::Image => IMAGE_MODELS,
        ContentType::Video => VIDEO_MODELS,
        ContentType::Audio => AUDIO_MODELS,
        ContentType::Web => WEB_MODELS,
    }
}

/// Build one synthetic result. AI results land in 65..=98 and human ones in
/// 8..=35, so the flag always agrees with the 50-point threshold.
pub fn mock_result<R: Rng + ?Sized>(content_type: ContentType, rng: &mut R) -> DetectionResult {
    let is_ai_generated = rng.random_bool(DEMO_AI_PROBABILITY);
    let confidence: u8 = if is_ai_generated {
        rng.random_range(65..=98)
    } else {
        rng.random_range(8..=35)
    };

    let picked = pool(content_type).choose(&mut *rng).copied();
    let detected_model = picked.filter(|_| is_ai_generated).map(|m| DetectedModel {
        name: m.name.to_string(),
        provider: m.provider.to_string(),
        description: m.description.to_string(),
        confidence: rng.random_range(m.confidence - 10..=m.confidence),
    });

    let (method, patterns) = if is_ai_generated {
        ("Deep Neural Pattern Matching", AI_PATTERNS)
    } else {
        ("Heuristic Biological Scoring", HUMAN_PATTERNS)
    };

    DetectionResult {
        is_ai_generated,
        confidence,
        verdict: Verdict::from_confidence(confidence),
        detected_model,
        content_type,
        details: AnalysisDetails {
            analysis_method: method.to_string(),
            processing_time: format!("{}ms", rng.random_range(200..=1500)),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            frames_analyzed: None,
        },
    }
}

/// Simulated provider latency, 800 to 2000 ms.
pub fn demo_delay<R: Rng + ?Sized>(rng: &mut R) -> Duration {
    Duration::from_millis(rng.random_range(800..=2000))
}

pub async fn detect_demo(content_type: ContentType) -> DetectionResult {
    let delay = demo_delay(&mut rand::rng());
    info!(content_type = %content_type, delay_ms = delay.as_millis() as u64, "demo.detect");
    tokio::time::sleep(delay).await;
    mock_result(content_type, &mut rand::rng())
}
