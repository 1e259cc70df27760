//! One user generation: four angles from a single sheet, then an optional video.
//!
//! ```text
//! idle ──start──▶ running ──sheet split──▶ completed ──generate_video──▶ video: generating ──▶ done | error
//!                    │
//!                    └── generation or split failed ──▶ failed (all four angles carry the same error)
//! ```
//!
//! The session is the only writer of its angle and video state. Methods take
//! `&mut self`, so a second `start` or `generate_video` cannot overlap a
//! running one. Observers either read the session between calls or listen on
//! the optional [`SessionEvent`] channel.

use crate::capability::{ImageGeneration, ResultFetcher, VideoGeneration};
use crate::pause::Pause;
use crate::prompt;
use crate::retry::RetryingGenerationClient;
use crate::sheet::SheetCodec;
use crate::types::{Angle, AngleResult, AngleSet, GenerationInputs, ImagePayload, OverallStatus};
use crate::video::{VideoError, VideoOperationPoller, VideoProgress};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    GenerationFailed(String),
    #[error("Could not split the generated sheet. Details: {0}")]
    DecompositionFailed(String),
    #[error(transparent)]
    Video(#[from] VideoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Idle,
    Generating,
    Done,
    Error,
}

/// Video sub-state. Exists only once all four angles are done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoOperationState {
    pub status: VideoStatus,
    pub progress_message: String,
    pub result_uri: Option<String>,
    pub error_message: Option<String>,
}

impl VideoOperationState {
    fn idle() -> Self {
        Self {
            status: VideoStatus::Idle,
            progress_message: String::new(),
            result_uri: None,
            error_message: None,
        }
    }
}

/// Transitions published on the session's event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started,
    AnglesSettled { status: OverallStatus },
    VideoStarted,
    VideoProgress(String),
    VideoSettled { status: VideoStatus },
}

pub struct GenerationSession {
    inputs: Option<GenerationInputs>,
    angles: AngleSet<AngleResult>,
    status: OverallStatus,
    video: Option<VideoOperationState>,
    video_bytes: Option<Vec<u8>>,
    events: Option<Sender<SessionEvent>>,
}

impl Default for GenerationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationSession {
    pub fn new() -> Self {
        Self {
            inputs: None,
            angles: AngleSet::default(),
            status: OverallStatus::Idle,
            video: None,
            video_bytes: None,
            events: None,
        }
    }

    /// Publish transitions on `events` from now on.
    pub fn with_events(mut self, events: Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Create a channel for this session's events and return its receiving end.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        self.events = Some(tx);
        rx
    }

    pub fn inputs(&self) -> Option<&GenerationInputs> {
        self.inputs.as_ref()
    }

    pub fn angles(&self) -> &AngleSet<AngleResult> {
        &self.angles
    }

    pub fn angle(&self, angle: Angle) -> &AngleResult {
        &self.angles[angle]
    }

    pub fn status(&self) -> OverallStatus {
        self.status
    }

    pub fn video(&self) -> Option<&VideoOperationState> {
        self.video.as_ref()
    }

    pub fn video_bytes(&self) -> Option<&[u8]> {
        self.video_bytes.as_deref()
    }

    /// The four finished images, if every angle is done.
    pub fn completed_images(&self) -> Option<AngleSet<&ImagePayload>> {
        AngleSet::try_from_fn(|angle| self.angles[angle].image().ok_or(())).ok()
    }

    /// Run a full generation for `inputs`, replacing any previous results.
    ///
    /// Returns the failure that put the session into `failed`, if any; the
    /// session state reflects the outcome either way.
    pub fn start<G: ImageGeneration, P: Pause>(
        &mut self,
        inputs: GenerationInputs,
        client: &RetryingGenerationClient<G, P>,
        codec: &SheetCodec,
    ) -> Result<(), SessionError> {
        if inputs.source_image.bytes.is_empty() {
            return Err(SessionError::InvalidInput("a source photo is required".into()));
        }
        if !inputs.has_style_driver() {
            return Err(SessionError::InvalidInput(
                "describe a style, attach a reference photo or pick a hair colour".into(),
            ));
        }

        let parts = prompt::sheet_request(&inputs);
        self.inputs = Some(inputs);
        self.angles = AngleSet::default();
        self.status = OverallStatus::Running;
        self.video = None;
        self.video_bytes = None;
        info!("generation started");
        self.emit(SessionEvent::Started);

        let outcome = client
            .generate(&parts)
            .map_err(|e| SessionError::GenerationFailed(e.to_string()))
            .and_then(|sheet| {
                codec
                    .decompose(&sheet)
                    .map_err(|e| SessionError::DecompositionFailed(e.to_string()))
            });

        let result = match outcome {
            Ok(images) => {
                self.angles = images.map(|_, image| AngleResult::Done(image));
                self.status = OverallStatus::Completed;
                info!("all four angles done");
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                warn!(error = %message, "generation failed");
                self.angles = AngleSet::from_fn(|_| AngleResult::Error(message.clone()));
                self.status = OverallStatus::Failed;
                Err(err)
            }
        };
        self.emit(SessionEvent::AnglesSettled {
            status: self.status,
        });
        result
    }

    /// Regenerate one angle.
    ///
    /// The model only ever produces whole sheets, so this reruns the full
    /// generation with the current inputs and replaces all four angles.
    pub fn regenerate_angle<G: ImageGeneration, P: Pause>(
        &mut self,
        angle: Angle,
        client: &RetryingGenerationClient<G, P>,
        codec: &SheetCodec,
    ) -> Result<(), SessionError> {
        let inputs = self.inputs.clone().ok_or_else(|| {
            SessionError::InvalidInput("nothing to regenerate before a first generation".into())
        })?;
        info!(%angle, "regenerating sheet for one angle");
        self.start(inputs, client, codec)
    }

    /// Turn the front view into a turntable video.
    ///
    /// Requires every angle to be done and a description derivable from the
    /// inputs; both are checked before anything is sent.
    pub fn generate_video<V, F, P>(
        &mut self,
        poller: &VideoOperationPoller<V, F, P>,
    ) -> Result<(), SessionError>
    where
        V: VideoGeneration,
        F: ResultFetcher,
        P: Pause,
    {
        if self.status != OverallStatus::Completed {
            return Err(SessionError::InvalidInput(
                "all four angles must be done before creating a video".into(),
            ));
        }
        let front = self
            .angles
            .front
            .image()
            .cloned()
            .ok_or_else(|| SessionError::InvalidInput("the front view is not ready".into()))?;
        let description = self
            .inputs
            .as_ref()
            .and_then(prompt::video_description)
            .ok_or_else(|| {
                SessionError::InvalidInput("a style description is needed for the video".into())
            })?;

        self.video = Some(VideoOperationState {
            status: VideoStatus::Generating,
            progress_message: "Starting video generation...".into(),
            ..VideoOperationState::idle()
        });
        self.video_bytes = None;
        self.emit(SessionEvent::VideoStarted);

        let (progress_tx, progress_rx) = mpsc::channel::<VideoProgress>();
        let relay_events = self.events.clone();
        let (result, last_message) = thread::scope(|scope| {
            let relay = scope.spawn(move || {
                let mut last = None;
                for progress in progress_rx {
                    if let Some(events) = &relay_events {
                        let _ = events.send(SessionEvent::VideoProgress(progress.message.clone()));
                    }
                    last = Some(progress.message);
                }
                last
            });
            let result = poller.run(&front, &description, Some(&progress_tx));
            drop(progress_tx);
            (result, relay.join().ok().flatten())
        });

        let state = self.video.get_or_insert_with(VideoOperationState::idle);
        if let Some(message) = last_message {
            state.progress_message = message;
        }
        let outcome = match result {
            Ok(artifact) => {
                state.status = VideoStatus::Done;
                state.progress_message = "Video ready".into();
                state.result_uri = Some(artifact.uri);
                self.video_bytes = Some(artifact.bytes);
                info!("video done");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "video generation failed");
                state.status = VideoStatus::Error;
                state.error_message = Some(err.to_string());
                Err(SessionError::Video(err))
            }
        };
        let status = state.status;
        self.emit(SessionEvent::VideoSettled { status });
        outcome
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
