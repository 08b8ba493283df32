// Video Submission/Poll Protocol
// Submitted -> Polling -> {Finished | Failed | TimedOut | Cancelled}

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::MediaFile;
use crate::services::config_store::DetectionConfig;
use crate::services::providers::{
    failure_message, ProviderApi, ProviderError, SightengineCredentials, VideoJobData,
};

use super::error::DetectionError;

const PROVIDER: &str = "Sightengine";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Hard ceiling on status checks; with the default interval about two minutes.
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 60,
        }
    }
}

impl From<&DetectionConfig> for PollSettings {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.max_poll_attempts,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PollState {
    Submitted,
    Polling,
    Finished,
    Failed,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Finished,
    Failure,
    /// `ongoing` or anything else the provider reports mid-flight.
    Pending(Option<String>),
}

impl JobStatus {
    pub fn parse(status: Option<&str>) -> Self {
        match status {
            Some("finished") => Self::Finished,
            Some("failure") => Self::Failure,
            other => Self::Pending(other.map(str::to_string)),
        }
    }
}

/// Transient state of one video job, dropped once the job settles.
#[derive(Debug)]
pub struct PollSession {
    pub media_id: String,
    pub attempts: u32,
    pub state: PollState,
}

impl PollSession {
    fn new(media_id: String) -> Self {
        Self {
            media_id,
            attempts: 0,
            state: PollState::Submitted,
        }
    }

    fn transition(&mut self, state: PollState) {
        debug!(media_id = %self.media_id, from = ?self.state, to = ?state, attempt = self.attempts, "video.poll.transition");
        self.state = state;
    }
}

#[derive(Debug)]
pub struct FinishedJob {
    pub media_id: String,
    pub attempts: u32,
    pub job: VideoJobData,
}

/// Upload the video and return the provider's media id.
pub async fn submit<P: ProviderApi>(
    provider: &P,
    creds: &SightengineCredentials,
    media: &MediaFile,
) -> Result<String, DetectionError> {
    let response = provider.submit_video(creds, media).await?;

    if response.status.as_deref() != Some("success") {
        return Err(ProviderError::Rejected {
            provider: "Sightengine submission",
            message: failure_message(response.error.as_ref(), "Unknown error"),
        }
        .into());
    }

    let media_id = response
        .media
        .and_then(|m| m.id)
        .filter(|id| !id.trim().is_empty())
        .ok_or(ProviderError::MissingMediaId(PROVIDER))?;

    info!(media_id = %media_id, bytes = media.bytes.len(), "video.submitted");
    Ok(media_id)
}

/// Run `fut` unless `cancel` fires first.
async fn or_cancelled<F, T>(cancel: &CancellationToken, fut: F) -> Result<T, DetectionError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DetectionError::Cancelled),
        out = fut => Ok(out),
    }
}

/// Poll the job until it settles. Each attempt waits one interval first.
pub async fn poll_until_finished<P: ProviderApi>(
    provider: &P,
    creds: &SightengineCredentials,
    media_id: &str,
    settings: PollSettings,
    cancel: &CancellationToken,
) -> Result<FinishedJob, DetectionError> {
    let mut session = PollSession::new(media_id.to_string());
    session.transition(PollState::Polling);

    while session.attempts < settings.max_attempts {
        session.attempts += 1;

        let polled = or_cancelled(cancel, async {
            tokio::time::sleep(settings.interval).await;
            provider.poll_video(creds, &session.media_id).await
        })
        .await;

        let response = match polled {
            Ok(response) => response?,
            Err(e) => {
                session.transition(PollState::Cancelled);
                warn!(media_id = %session.media_id, attempt = session.attempts, "video.poll.cancelled");
                return Err(e);
            }
        };

        let job_status = JobStatus::parse(response.job().and_then(|d| d.status.as_deref()));
        match job_status {
            JobStatus::Finished => {
                session.transition(PollState::Finished);
                info!(media_id = %session.media_id, attempts = session.attempts, "video.poll.finished");
                return Ok(FinishedJob {
                    job: response.into_job().unwrap_or_default(),
                    media_id: session.media_id,
                    attempts: session.attempts,
                });
            }
            JobStatus::Failure => {
                session.transition(PollState::Failed);
                let message = failure_message(
                    response.job().and_then(|d| d.error.as_ref()),
                    "Unknown processing error",
                );
                return Err(ProviderError::Rejected {
                    provider: "Sightengine video processing",
                    message,
                }
                .into());
            }
            JobStatus::Pending(status) => {
                debug!(media_id = %session.media_id, attempt = session.attempts, status = ?status, "video.poll.pending");
            }
        }
    }

    session.transition(PollState::TimedOut);
    warn!(media_id = %session.media_id, attempts = session.attempts, "video.poll.timeout");
    Err(DetectionError::Timeout {
        attempts: session.attempts,
    })
}
