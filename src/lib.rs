//! # hairsheet
//!
//! Four consistent views of a person with a new hairstyle (front, left, right,
//! back), plus an optional turntable video, generated by a remote image/video
//! model from a single photo.
//!
//! # Architecture: One Sheet, Four Angles
//!
//! The model is asked for one image laid out as a 2x2 grid. Everything else
//! follows from that:
//!
//! ```text
//! inputs ─▶ prompt ─▶ retry ─▶ sheet (2x2) ─▶ decompose ─▶ 4 angles ─▶ (video from front)
//!                                                             │
//!                                                             └─▶ compose ─▶ printable sheet
//! ```
//!
//! - **One call per generation.** All four angles come from the same sheet, so
//!   they either all succeed or all fail with the same message. There is no
//!   single-angle regeneration; asking for one angle regenerates the sheet.
//! - **Only transient failures are retried.** Server-side (5xx / `INTERNAL`)
//!   errors get up to three attempts with 1s then 2s backoff. Refusals, bad
//!   requests and prose-only answers surface immediately.
//! - **Video is a long-running operation.** It is started once, polled every
//!   10 seconds until it settles, then downloaded.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | `Angle`, `AngleSet`, `AngleResult`, `GenerationInputs`, `ImagePayload` |
//! | [`capability`] | Traits for the remote image, video and download services, plus the Gemini implementation |
//! | [`retry`] | Bounded retry with transient/permanent classification around image generation |
//! | [`pause`] | The single waiting primitive used by retry backoff and video polling |
//! | [`sheet`] | 2x2 sheet codec: quadrant split and captioned polaroid composition |
//! | [`video`] | Start / poll / download driver for the video operation |
//! | [`prompt`] | Request parts and video description built from the inputs |
//! | [`session`] | The per-generation state machine tying the above together |
//! | [`export`] | Writes a finished session (angles, sheet, video, `session.json`) to disk |
//! | [`config`] | `hairsheet.toml` loading, validation and stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Blocking, Not Async
//!
//! A session is one sequential task whose only waits are the network calls,
//! the retry backoff and the poll interval. The crate uses `reqwest`'s
//! blocking client and plain threads; no runtime is needed to host it.
//! Waiting goes through [`pause::Pause`] so tests run without sleeping.
//!
//! ## Sessions Are Values
//!
//! There is no global store. A [`session::GenerationSession`] is constructed
//! by the caller and mutated only through `&mut self`, which makes the
//! single-flight rule (one generation, one video at a time) a borrow-checker
//! fact rather than a UI convention. Progress is published on an optional
//! `std::sync::mpsc` channel.
//!
//! ## Pure-Rust Imaging
//!
//! Splitting and composing use the `image` crate; captions are rendered by
//! `resvg` against the system fonts. No ImageMagick, no system libraries
//! beyond fonts.

pub mod capability;
pub mod config;
pub mod export;
pub mod output;
pub mod pause;
pub mod prompt;
pub mod retry;
pub mod session;
pub mod sheet;
pub mod types;
pub mod video;

#[cfg(test)]
pub(crate) mod test_helpers;
