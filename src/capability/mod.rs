//! Remote generation capabilities.
//!
//! The pipeline talks to three external services, each behind a trait so the
//! orchestration logic can be exercised without a network:
//!
//! | Trait | Operation |
//! |---|---|
//! | [`ImageGeneration`] | one-shot "image from parts" request |
//! | [`VideoGeneration`] | start a long-running video operation, poll it |
//! | [`ResultFetcher`] | download the bytes behind a finished operation's locator |
//!
//! The production implementation of all three is
//! [`GeminiClient`](gemini::GeminiClient).

pub mod gemini;

use crate::types::ImagePayload;
use thiserror::Error;

pub use gemini::GeminiClient;

/// Status strings that mark a failure as server-side when a transport only
/// surfaces text. Matched as whole words.
const TRANSIENT_MARKERS: &[&str] = &["INTERNAL", "UNAVAILABLE"];

/// A failed call to a remote capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CapabilityError {
    pub message: String,
    /// Set when the transport saw a 5xx response.
    pub server_error: bool,
}

impl CapabilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            server_error: false,
        }
    }

    /// A failure the service itself reported as a 5xx.
    pub fn server(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            server_error: true,
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Only server-side errors qualify. Bad requests, policy refusals
    /// and malformed responses are permanent, whatever digits their
    /// bodies happen to contain.
    pub fn is_transient(&self) -> bool {
        self.server_error
            || self
                .message
                .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .any(|word| TRANSIENT_MARKERS.contains(&word))
    }
}

/// One element of an ordered generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Image(ImagePayload),
    Text(String),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Part::Text(_))
    }
}

/// What an image-generation call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResponse {
    /// The first image payload in the response.
    Image(ImagePayload),
    /// No image at all; the model answered in prose (typically a refusal).
    TextOnly(String),
}

/// Opaque handle to a remote long-running operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub name: String,
}

/// State of a long-running operation as reported by one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Running,
    /// Finished. The locator is absent when the service finished without
    /// producing a result.
    Done { result_uri: Option<String> },
    Failed { code: i64, message: String },
}

/// Generate an image from an ordered list of parts.
pub trait ImageGeneration {
    fn generate(&self, parts: &[Part]) -> Result<GenerationResponse, CapabilityError>;
}

/// Asynchronous image-to-video generation.
pub trait VideoGeneration {
    /// Submit a video job seeded with `image`.
    fn start(&self, image: &ImagePayload, prompt: &str)
    -> Result<OperationHandle, CapabilityError>;

    /// Check a previously started job. The handle may be polled repeatedly.
    fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus, CapabilityError>;
}

/// Plain byte retrieval for a finished result.
pub trait ResultFetcher {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, CapabilityError>;
}

impl<T: ImageGeneration + ?Sized> ImageGeneration for &T {
    fn generate(&self, parts: &[Part]) -> Result<GenerationResponse, CapabilityError> {
        (**self).generate(parts)
    }
}

impl<T: VideoGeneration + ?Sized> VideoGeneration for &T {
    fn start(&self, image: &ImagePayload, prompt: &str)
    -> Result<OperationHandle, CapabilityError> {
        (**self).start(image, prompt)
    }

    fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus, CapabilityError> {
        (**self).poll(handle)
    }
}

impl<T: ResultFetcher + ?Sized> ResultFetcher for &T {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, CapabilityError> {
        (**self).fetch(uri)
    }
}
