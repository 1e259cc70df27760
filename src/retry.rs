//! Bounded retry around a single-shot image generation call.
//!
//! A call is attempted up to [`RetryPolicy::max_attempts`] times. Only
//! transient failures (see [`CapabilityError::is_transient`]) are retried,
//! with exponential backoff: `base_delay * 2^(attempt - 1)`, i.e. 1s then 2s
//! with the defaults. Permanent failures and prose-only responses surface
//! immediately.
//!
//! ```text
//! attempt 1 ── transient ──▶ wait 1s ──▶ attempt 2 ── transient ──▶ wait 2s ──▶ attempt 3
//!     │                                      │                                     │
//!  permanent / text-only ──────────────────────────────────────────────────────▶ Failed
//! ```

use crate::capability::{CapabilityError, GenerationResponse, ImageGeneration, Part};
use crate::pause::{Pause, ThreadPause};
use crate::types::ImagePayload;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generation request must contain a text instruction")]
    MissingInstruction,
    #[error("{message}")]
    Failed { attempts: u32, message: String },
}

/// How many times to try, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Never less than 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait after the given failed attempt (1-based) before the next one.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Wraps an [`ImageGeneration`] capability with bounded retry.
///
/// Holds no per-session state; one client can serve any number of sessions.
pub struct RetryingGenerationClient<G, P = ThreadPause> {
    capability: G,
    pause: P,
    policy: RetryPolicy,
}

impl<G: ImageGeneration> RetryingGenerationClient<G, ThreadPause> {
    pub fn new(capability: G, policy: RetryPolicy) -> Self {
        Self::with_pause(capability, ThreadPause, policy)
    }
}

impl<G: ImageGeneration, P: Pause> RetryingGenerationClient<G, P> {
    pub fn with_pause(capability: G, pause: P, policy: RetryPolicy) -> Self {
        Self {
            capability,
            pause,
            policy,
        }
    }

    /// Run the request, returning the first image the capability produces.
    pub fn generate(&self, parts: &[Part]) -> Result<ImagePayload, GenerationError> {
        if !parts.iter().any(Part::is_text) {
            return Err(GenerationError::MissingInstruction);
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            debug!(attempt, max_attempts, "calling image generation");
            match self.capability.generate(parts) {
                Ok(GenerationResponse::Image(image)) => return Ok(image),
                Ok(GenerationResponse::TextOnly(text)) => {
                    return Err(GenerationError::Failed {
                        attempts: attempt,
                        message: format!("The model responded without an image. Details: {text}"),
                    });
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.policy.backoff_after(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient generation failure, retrying"
                    );
                    self.pause.pause(delay);
                    attempt += 1;
                }
                Err(err) => return Err(failure(attempt, max_attempts, err)),
            }
        }
    }
}

fn failure(attempt: u32, max_attempts: u32, err: CapabilityError) -> GenerationError {
    let message = if err.is_transient() && attempt >= max_attempts {
        format!("Generation failed after {attempt} attempts. Details: {err}")
    } else {
        format!("Generation failed. Details: {err}")
    };
    GenerationError::Failed {
        attempts: attempt,
        message,
    }
}
