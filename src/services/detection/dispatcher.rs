// Detection Dispatcher
// Routes a request to demo data or the live detector for its content type.

use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::models::{ContentType, DetectPayload, DetectionResult};
use crate::services::config_store::{Credentials, Settings};
use crate::services::demo::detect_demo;
use crate::services::providers::{ProviderApi, ProviderClient};

use super::detectors::{detect_audio, detect_image, detect_text, detect_web, FeedbackTask};
use super::error::DetectionError;
use super::polling::PollSettings;
use super::video::detect_video;
use super::vocabulary::VocabularySet;

pub struct Detector<P> {
    provider: Arc<P>,
    credentials: Credentials,
    poll: PollSettings,
    vocabularies: VocabularySet,
    demo_mode: bool,
    /// Audio feedback uploads still in flight.
    feedback: Mutex<Vec<FeedbackTask>>,
}

impl Detector<ProviderClient> {
    /// Live client wired from loaded settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let client = ProviderClient::with_urls(
            &settings.sapling_url,
            &settings.sightengine_url,
            settings.config.detection.request_timeout(),
        );
        Self::new(Arc::new(client), settings.credentials.clone())
            .with_poll_settings(PollSettings::from(&settings.config.detection))
            .with_demo_mode(settings.demo_mode)
    }
}

impl<P: ProviderApi + 'static> Detector<P> {
    pub fn new(provider: Arc<P>, credentials: Credentials) -> Self {
        Self {
            provider,
            credentials,
            poll: PollSettings::default(),
            vocabularies: VocabularySet::standard(),
            demo_mode: false,
            feedback: Mutex::new(Vec::new()),
        }
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_demo_mode(mut self, demo_mode: bool) -> Self {
        self.demo_mode = demo_mode;
        self
    }

    pub fn with_vocabularies(mut self, vocabularies: VocabularySet) -> Self {
        self.vocabularies = vocabularies;
        self
    }

    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    /// Wait for every audio feedback upload started so far. Call before the
    /// runtime shuts down, or pending uploads are dropped with it.
    pub async fn flush_feedback(&self) {
        let pending = match self.feedback.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        if pending.is_empty() {
            return;
        }

        debug!(tasks = pending.len(), "audio.feedback.flush");
        for task in pending {
            if let Err(e) = task.await {
                warn!(error = %e, "audio.feedback.join_failed");
            }
        }
    }

    fn track_feedback(&self, task: FeedbackTask) {
        let mut tasks = match self.feedback.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    pub async fn detect(
        &self,
        content_type: ContentType,
        payload: DetectPayload,
    ) -> Result<DetectionResult, DetectionError> {
        self.detect_with_cancel(content_type, payload, &CancellationToken::new())
            .await
    }

    /// Same as [`Detector::detect`] but takes the content type by name.
    pub async fn detect_str(
        &self,
        content_type: &str,
        payload: DetectPayload,
    ) -> Result<DetectionResult, DetectionError> {
        let content_type: ContentType = content_type.parse()?;
        self.detect(content_type, payload).await
    }

    /// Cancelling the token aborts a pending video poll with `Cancelled`.
    pub async fn detect_with_cancel(
        &self,
        content_type: ContentType,
        payload: DetectPayload,
        cancel: &CancellationToken,
    ) -> Result<DetectionResult, DetectionError> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "detect",
            request_id = %request_id,
            content_type = %content_type,
            payload = payload.kind(),
            demo = self.demo_mode,
        );

        async move {
            info!("detect.start");
            let outcome = self.route(content_type, payload, cancel).await;
            match &outcome {
                Ok(result) => info!(
                    confidence = result.confidence,
                    verdict = ?result.verdict,
                    is_ai = result.is_ai_generated,
                    "detect.done"
                ),
                Err(e) => error!(error = %e, "detect.failed"),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn route(
        &self,
        content_type: ContentType,
        payload: DetectPayload,
        cancel: &CancellationToken,
    ) -> Result<DetectionResult, DetectionError> {
        if self.demo_mode {
            check_payload(content_type, &payload)?;
            return Ok(detect_demo(content_type).await);
        }

        if content_type == ContentType::Web {
            return match payload {
                DetectPayload::Url(url) => detect_web(&url),
                DetectPayload::Text(text) => detect_web(&text),
                payload => Err(invalid_payload(content_type, &payload)),
            };
        }

        let Some(vocabulary) = self.vocabularies.get(content_type) else {
            return Err(DetectionError::UnsupportedOperation(format!(
                "no model vocabulary for {} content",
                content_type
            )));
        };
        let credentials = &self.credentials;
        let provider = self.provider.as_ref();

        match (content_type, payload) {
            (ContentType::Text, DetectPayload::Text(text)) => {
                detect_text(provider, credentials, vocabulary, &text).await
            }
            (ContentType::Image, DetectPayload::File(media)) => {
                detect_image(provider, credentials, vocabulary, &media).await
            }
            (ContentType::Video, DetectPayload::File(media)) => {
                detect_video(provider, credentials, vocabulary, &media, self.poll, cancel).await
            }
            (ContentType::Audio, DetectPayload::File(media)) => {
                let (result, feedback) =
                    detect_audio(&self.provider, credentials, vocabulary, &media).await?;
                self.track_feedback(feedback);
                Ok(result)
            }
            (content_type, payload) => Err(invalid_payload(content_type, &payload)),
        }
    }
}

fn invalid_payload(content_type: ContentType, payload: &DetectPayload) -> DetectionError {
    DetectionError::InvalidPayload {
        content_type: content_type.as_str(),
        payload: payload.kind(),
    }
}

/// Payload shape accepted by each content type.
pub fn check_payload(content_type: ContentType, payload: &DetectPayload) -> Result<(), DetectionError> {
    let accepted = match content_type {
        ContentType::Text => matches!(payload, DetectPayload::Text(_)),
        ContentType::Web => matches!(payload, DetectPayload::Url(_) | DetectPayload::Text(_)),
        ContentType::Image | ContentType::Video | ContentType::Audio => {
            matches!(payload, DetectPayload::File(_))
        }
    };
    if accepted {
        Ok(())
    } else {
        Err(invalid_payload(content_type, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::detection::test_support::{
        all_credentials, finished_with, media, poll_status, FakeProvider,
    };
    use crate::services::providers::FeedbackClass;
    use serde_json::json;
    use std::time::Duration;

    fn fast() -> PollSettings {
        PollSettings {
            interval: Duration::ZERO,
            max_attempts: 60,
        }
    }

    fn live(provider: FakeProvider) -> (Arc<FakeProvider>, Detector<FakeProvider>) {
        let provider = Arc::new(provider);
        let detector = Detector::new(Arc::clone(&provider), all_credentials()).with_poll_settings(fast());
        (provider, detector)
    }

    #[tokio::test]
    async fn test_routes_text() {
        let (provider, detector) = live(FakeProvider::default().with_text(json!({"score": 0.7})));
        let result = detector
            .detect(ContentType::Text, DetectPayload::Text("hello".into()))
            .await
            .unwrap();
        assert_eq!(result.content_type, ContentType::Text);
        assert_eq!(result.confidence, 70);
        assert_eq!(provider.calls(), vec!["check_text"]);
    }

    #[tokio::test]
    async fn test_detected_model_present_iff_ai() {
        for (score, expect_model) in [(0.49, false), (0.5, true), (0.95, true), (0.0, false)] {
            let (_, detector) = live(FakeProvider::default().with_text(json!({"score": score})));
            let result = detector
                .detect(ContentType::Text, DetectPayload::Text("x".into()))
                .await
                .unwrap();
            assert_eq!(result.is_ai_generated, expect_model);
            assert_eq!(result.detected_model.is_some(), expect_model);
        }
    }

    #[tokio::test]
    async fn test_live_web_is_unsupported() {
        let (provider, detector) = live(FakeProvider::default());
        let err = detector
            .detect(ContentType::Web, DetectPayload::Url("https://example.com".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, DetectionError::UnsupportedOperation(_)));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_content_type() {
        let (_, detector) = live(FakeProvider::default());
        let err = detector
            .detect_str("spreadsheet", DetectPayload::Text("x".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, DetectionError::UnknownContentType(_)));
    }

    #[tokio::test]
    async fn test_payload_mismatch_rejected() {
        let (provider, detector) = live(FakeProvider::default());
        let err = detector
            .detect(ContentType::Image, DetectPayload::Text("not a file".into()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DetectionError::InvalidPayload { content_type: "image", payload: "text" }
        ));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_before_any_call() {
        let provider = Arc::new(FakeProvider::default());
        let detector = Detector::new(Arc::clone(&provider), Credentials::default());
        for (ct, payload) in [
            (ContentType::Text, DetectPayload::Text("x".into())),
            (ContentType::Image, DetectPayload::File(media("a.png"))),
            (ContentType::Video, DetectPayload::File(media("a.mp4"))),
            (ContentType::Audio, DetectPayload::File(media("a.wav"))),
        ] {
            let err = detector.detect(ct, payload).await.unwrap_err();
            assert!(matches!(err, DetectionError::Configuration(_)), "{ct}: {err}");
        }
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_routes_video_through_poll() {
        let (provider, detector) = live(
            FakeProvider::default()
                .with_submit(Some("success"), Some("med_7"))
                .with_polls(vec![
                    poll_status("ongoing"),
                    finished_with(json!([{"type": {"ai_generated": 0.2}}]), Some(1.0), Some(3.0)),
                ]),
        );
        let result = detector
            .detect_str("video", DetectPayload::File(media("clip.mp4")))
            .await
            .unwrap();
        assert_eq!(result.confidence, 20);
        assert_eq!(result.details.processing_time, "2s");
        assert_eq!(provider.calls(), vec!["submit_video", "poll_video", "poll_video"]);
    }

    #[tokio::test]
    async fn test_cancel_aborts_video() {
        let (_, detector) = live(
            FakeProvider::default()
                .with_submit(Some("success"), Some("med_7"))
                .with_polls(vec![poll_status("ongoing"); 10]),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = detector
            .detect_with_cancel(ContentType::Video, DetectPayload::File(media("clip.mp4")), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DetectionError::Cancelled));
    }

    #[tokio::test]
    async fn test_audio_feedback_failure_does_not_fail_detection() {
        let (_, detector) = live(
            FakeProvider::default()
                .with_audio(json!({"status": "success", "type": {"ai_generated": 0.64}}))
                .failing_feedback(),
        );
        let result = detector
            .detect(ContentType::Audio, DetectPayload::File(media("voice.wav")))
            .await
            .unwrap();
        assert_eq!(result.confidence, 64);
        assert!(result.is_ai_generated);
    }

    #[test]
    fn test_flushed_feedback_survives_runtime_shutdown() {
        let (provider, detector) = live(
            FakeProvider::default()
                .with_audio(json!({"status": "success", "type": {"ai_generated": 0.9}}))
                .with_feedback_delay(Duration::from_millis(50)),
        );

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = runtime.block_on(async {
            let result = detector
                .detect(ContentType::Audio, DetectPayload::File(media("voice.wav")))
                .await
                .unwrap();
            detector.flush_feedback().await;
            result
        });
        drop(runtime);

        assert!(result.is_ai_generated);
        assert_eq!(provider.feedback_sent(), vec![FeedbackClass::NotAi]);
    }

    #[tokio::test]
    async fn test_flush_without_pending_feedback_returns() {
        let (provider, detector) = live(FakeProvider::default().with_text(json!({"score": 0.1})));
        detector
            .detect(ContentType::Text, DetectPayload::Text("x".into()))
            .await
            .unwrap();
        detector.flush_feedback().await;
        assert!(provider.feedback_sent().is_empty());
    }

    #[tokio::test]
    async fn test_live_web_rejects_file_payload() {
        let (provider, detector) = live(FakeProvider::default());
        let err = detector
            .detect(ContentType::Web, DetectPayload::File(media("page.html")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DetectionError::InvalidPayload { content_type: "web", payload: "file" }
        ));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_demo_mode_skips_provider() {
        let provider = Arc::new(FakeProvider::default());
        let detector = Detector::new(Arc::clone(&provider), Credentials::default()).with_demo_mode(true);
        let result = detector
            .detect(ContentType::Web, DetectPayload::Url("https://example.com".into()))
            .await
            .unwrap();
        assert_eq!(result.content_type, ContentType::Web);
        assert_eq!(result.detected_model.is_some(), result.is_ai_generated);
        assert!(provider.calls().is_empty());
    }
}
