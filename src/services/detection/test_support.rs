// Scripted provider for detector tests

use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::models::MediaFile;
use crate::services::config_store::Credentials;
use crate::services::providers::{
    FeedbackClass, MediaCheckResponse, ProviderApi, ProviderError, SightengineCredentials,
    TextDetectResponse, VideoPollResponse, VideoSubmitResponse,
};

#[derive(Default)]
pub struct FakeProvider {
    calls: Mutex<Vec<&'static str>>,
    text: TextDetectResponse,
    image: MediaCheckResponse,
    audio: MediaCheckResponse,
    submit: VideoSubmitResponse,
    polls: Mutex<VecDeque<VideoPollResponse>>,
    feedback_fails: bool,
    feedback_delay: Duration,
    feedback_sent: Mutex<Vec<FeedbackClass>>,
}

impl FakeProvider {
    pub fn with_text(mut self, body: Value) -> Self {
        self.text = serde_json::from_value(body).unwrap();
        self
    }

    pub fn with_image(mut self, body: Value) -> Self {
        self.image = serde_json::from_value(body).unwrap();
        self
    }

    pub fn with_audio(mut self, body: Value) -> Self {
        self.audio = serde_json::from_value(body).unwrap();
        self
    }

    pub fn with_submit(mut self, status: Option<&str>, media_id: Option<&str>) -> Self {
        self.submit = serde_json::from_value(json!({
            "status": status,
            "media": {"id": media_id},
        }))
        .unwrap();
        self
    }

    pub fn with_polls(self, polls: Vec<VideoPollResponse>) -> Self {
        *self.polls.lock().unwrap() = polls.into();
        self
    }

    pub fn failing_feedback(mut self) -> Self {
        self.feedback_fails = true;
        self
    }

    /// Feedback lands only after this delay, like a slow upload.
    pub fn with_feedback_delay(mut self, delay: Duration) -> Self {
        self.feedback_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == name).count()
    }

    pub fn feedback_sent(&self) -> Vec<FeedbackClass> {
        self.feedback_sent.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ProviderApi for FakeProvider {
    async fn check_text(&self, _api_key: &str, _text: &str) -> Result<TextDetectResponse, ProviderError> {
        self.record("check_text");
        Ok(self.text.clone())
    }

    async fn check_image(
        &self,
        _creds: &SightengineCredentials,
        _media: &MediaFile,
    ) -> Result<MediaCheckResponse, ProviderError> {
        self.record("check_image");
        Ok(self.image.clone())
    }

    async fn submit_video(
        &self,
        _creds: &SightengineCredentials,
        _media: &MediaFile,
    ) -> Result<VideoSubmitResponse, ProviderError> {
        self.record("submit_video");
        Ok(self.submit.clone())
    }

    async fn poll_video(
        &self,
        _creds: &SightengineCredentials,
        _media_id: &str,
    ) -> Result<VideoPollResponse, ProviderError> {
        self.record("poll_video");
        let next = self.polls.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| poll_status("ongoing")))
    }

    async fn check_audio(
        &self,
        _creds: &SightengineCredentials,
        _media: &MediaFile,
    ) -> Result<MediaCheckResponse, ProviderError> {
        self.record("check_audio");
        Ok(self.audio.clone())
    }

    async fn send_feedback(
        &self,
        _creds: &SightengineCredentials,
        _media: &MediaFile,
        class: FeedbackClass,
    ) -> Result<Value, ProviderError> {
        self.record("send_feedback");
        if !self.feedback_delay.is_zero() {
            tokio::time::sleep(self.feedback_delay).await;
        }
        self.feedback_sent.lock().unwrap().push(class);
        if self.feedback_fails {
            return Err(ProviderError::ApiError {
                provider: "Sightengine feedback",
                status: 500,
                message: "internal error".to_string(),
            });
        }
        Ok(json!({"status": "success"}))
    }
}

pub fn poll_status(status: &str) -> VideoPollResponse {
    serde_json::from_value(json!({
        "status": "success",
        "output": {"data": {"status": status}},
    }))
    .unwrap()
}

pub fn finished_with(frames: Value, started: Option<f64>, last_update: Option<f64>) -> VideoPollResponse {
    serde_json::from_value(json!({
        "status": "success",
        "output": {"data": {
            "status": "finished",
            "frames": frames,
            "started": started,
            "last_update": last_update,
        }},
    }))
    .unwrap()
}

pub fn all_credentials() -> Credentials {
    Credentials {
        sapling_api_key: Some("sapling-key".to_string()),
        sightengine: Some(SightengineCredentials {
            api_user: "user".to_string(),
            api_secret: "secret".to_string(),
        }),
    }
}

pub fn media(name: &str) -> MediaFile {
    MediaFile::new(name, vec![0u8; 16])
}
