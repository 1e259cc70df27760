//! Turntable video generation: start a remote operation, poll it to completion,
//! download the result.
//!
//! ```text
//! idle ──start──▶ starting ──handle──▶ polling ──done + uri──▶ fetch ──▶ done
//!                    │                   │  ▲                     │
//!                    ▼                   │  └── running (wait) ───┘
//!                  error ◀───────────────┴── failed / no uri / fetch error
//! ```
//!
//! Polling runs on a fixed interval with no ceiling by default. Before each
//! wait the poller emits a [`VideoProgress`] on the optional channel, so a
//! listener sees zero or more progress messages before the call returns.

use crate::capability::{OperationStatus, ResultFetcher, VideoGeneration};
use crate::pause::{Pause, ThreadPause};
use crate::prompt;
use crate::types::ImagePayload;
use std::sync::mpsc::Sender;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Cosmetic status lines, cycled in order while the operation runs.
pub const PROGRESS_MESSAGES: &[&str] = &[
    "Setting up the camera rig...",
    "Lighting the set...",
    "Rendering the turntable...",
    "Checking the hair from every side...",
    "Smoothing the motion...",
    "Adding the finishing touches...",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VideoError {
    #[error("Could not start video generation. Details: {0}")]
    Initialization(String),
    #[error("Lost track of the video while it was generating. Details: {0}")]
    Poll(String),
    #[error("Video generation failed (code {code}). Details: {message}")]
    Operation { code: i64, message: String },
    #[error("Video generation finished without producing a video")]
    MissingResult,
    #[error("The video was generated but could not be downloaded. Details: {0}")]
    Download(String),
    #[error("Video was still generating after {polls} status checks")]
    PollLimit { polls: u32 },
}

/// When to check on a running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    /// Give up after this many polls. `None` polls until the operation settles.
    pub max_polls: Option<u32>,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_polls: None,
        }
    }
}

/// Emitted once per wait while the operation is still running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoProgress {
    /// Polls completed so far.
    pub polls: u32,
    pub message: String,
}

/// A finished video and where it came from.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoArtifact {
    pub uri: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for VideoArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoArtifact")
            .field("uri", &self.uri)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// Drives one video operation per [`run`](Self::run) call.
///
/// Stateless between calls; reusable across sessions.
pub struct VideoOperationPoller<V, F, P = ThreadPause> {
    video: V,
    fetcher: F,
    pause: P,
    schedule: PollSchedule,
}

impl<V: VideoGeneration, F: ResultFetcher> VideoOperationPoller<V, F, ThreadPause> {
    pub fn new(video: V, fetcher: F, schedule: PollSchedule) -> Self {
        Self::with_pause(video, fetcher, ThreadPause, schedule)
    }
}

impl<V: VideoGeneration, F: ResultFetcher, P: Pause> VideoOperationPoller<V, F, P> {
    pub fn with_pause(video: V, fetcher: F, pause: P, schedule: PollSchedule) -> Self {
        Self {
            video,
            fetcher,
            pause,
            schedule,
        }
    }

    /// Generate a video from `image`, blocking until it is downloaded or fails.
    pub fn run(
        &self,
        image: &ImagePayload,
        description: &str,
        progress: Option<&Sender<VideoProgress>>,
    ) -> Result<VideoArtifact, VideoError> {
        let video_prompt = prompt::video_prompt(description);
        let handle = self
            .video
            .start(image, &video_prompt)
            .map_err(|e| VideoError::Initialization(e.message))?;
        info!(operation = %handle.name, "video operation started");

        let mut polls = 0u32;
        loop {
            if self.schedule.max_polls.is_some_and(|max| polls >= max) {
                warn!(operation = %handle.name, polls, "giving up on video operation");
                return Err(VideoError::PollLimit { polls });
            }

            if let Some(tx) = progress {
                let message = PROGRESS_MESSAGES[polls as usize % PROGRESS_MESSAGES.len()];
                // A dropped receiver only means nobody is watching.
                let _ = tx.send(VideoProgress {
                    polls,
                    message: message.to_string(),
                });
            }

            self.pause.pause(self.schedule.interval);
            polls += 1;

            let status = self
                .video
                .poll(&handle)
                .map_err(|e| VideoError::Poll(e.message))?;
            debug!(operation = %handle.name, polls, ?status, "polled video operation");

            match status {
                OperationStatus::Running => continue,
                OperationStatus::Failed { code, message } => {
                    return Err(VideoError::Operation { code, message });
                }
                OperationStatus::Done { result_uri: None } => return Err(VideoError::MissingResult),
                OperationStatus::Done {
                    result_uri: Some(uri),
                } => {
                    let bytes = self
                        .fetcher
                        .fetch(&uri)
                        .map_err(|e| VideoError::Download(e.message))?;
                    info!(polls, bytes = bytes.len(), "video downloaded");
                    return Ok(VideoArtifact { uri, bytes });
                }
            }
        }
    }
}
