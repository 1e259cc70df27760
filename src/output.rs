//! CLI output formatting.
//!
//! # Angle-First Display
//!
//! Every command reports in terms of the four angles, always in grid order,
//! with file paths and diagnostics as indented context lines:
//!
//! ```text
//! Generating four views
//! Front        done
//! Left Side    done
//! Right Side   error
//!     The model responded without an image.
//!     Details: I can't edit this photo.
//! Back         error
//! ```
//!
//! ## Generate
//!
//! ```text
//! Generating four views
//! Sheet: completed
//! Video: Lighting the set...
//! Video: done
//! Exported 3f9a1c0be2d4/
//!     front.jpg
//!     left.jpg
//!     right.jpg
//!     back.jpg
//!     sheet.jpg
//!     video.mp4
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::export::{ExportSummary, MANIFEST_FILENAME};
use crate::session::{GenerationSession, SessionEvent, VideoStatus};
use crate::types::{Angle, AngleResult, AngleSet, OverallStatus};
use std::path::{Path, PathBuf};

/// Marker separating the friendly part of an error from its diagnostics.
const DETAILS_MARKER: &str = "Details:";

/// Width of the angle label column.
const LABEL_WIDTH: usize = 12;

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Split an error message into its friendly part and optional diagnostics.
///
/// ```
/// # use hairsheet::output::split_details;
/// let (friendly, details) = split_details("Generation failed. Details: 400 bad image");
/// assert_eq!(friendly, "Generation failed.");
/// assert_eq!(details, Some("400 bad image"));
/// ```
pub fn split_details(message: &str) -> (&str, Option<&str>) {
    match message.split_once(DETAILS_MARKER) {
        Some((friendly, details)) => {
            let details = details.trim();
            (
                friendly.trim(),
                (!details.is_empty()).then_some(details),
            )
        }
        None => (message.trim(), None),
    }
}

/// Truncate to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn status_word(status: OverallStatus) -> &'static str {
    match status {
        OverallStatus::Idle => "idle",
        OverallStatus::Running => "running",
        OverallStatus::Completed => "completed",
        OverallStatus::Failed => "failed",
    }
}

fn video_word(status: VideoStatus) -> &'static str {
    match status {
        VideoStatus::Idle => "idle",
        VideoStatus::Generating => "generating",
        VideoStatus::Done => "done",
        VideoStatus::Error => "error",
    }
}

/// An error as a friendly line plus an optional indented `Details:` line.
fn error_lines(message: &str, depth: usize) -> Vec<String> {
    let (friendly, details) = split_details(message);
    let mut lines = vec![format!("{}{}", indent(depth), friendly)];
    if let Some(details) = details {
        lines.push(format!(
            "{}{} {}",
            indent(depth),
            DETAILS_MARKER,
            truncate(details, 240)
        ));
    }
    lines
}

// ============================================================================
// Session progress
// ============================================================================

/// Format a single session event as display lines.
pub fn format_session_event(event: &SessionEvent) -> Vec<String> {
    match event {
        SessionEvent::Started => vec!["Generating four views".to_string()],
        SessionEvent::AnglesSettled { status } => {
            vec![format!("Sheet: {}", status_word(*status))]
        }
        SessionEvent::VideoStarted => vec!["Video: starting".to_string()],
        SessionEvent::VideoProgress(message) => vec![format!("Video: {message}")],
        SessionEvent::VideoSettled { status } => vec![format!("Video: {}", video_word(*status))],
    }
}

pub fn print_session_event(event: &SessionEvent) {
    for line in format_session_event(event) {
        println!("{}", line);
    }
}

/// Per-angle status table, with error details under failed angles.
pub fn format_angle_results(angles: &AngleSet<AngleResult>) -> Vec<String> {
    let mut lines = Vec::new();
    for (angle, result) in angles.iter() {
        let state = match result {
            AngleResult::Pending => "pending",
            AngleResult::Done(_) => "done",
            AngleResult::Error(_) => "error",
        };
        lines.push(format!("{:<width$} {}", angle.label(), state, width = LABEL_WIDTH));
        if let AngleResult::Error(message) = result {
            lines.extend(error_lines(message, 1));
        }
    }
    lines
}

/// Angle table plus video state for a session.
pub fn format_session_summary(session: &GenerationSession) -> Vec<String> {
    let mut lines = format_angle_results(session.angles());
    if let Some(video) = session.video() {
        lines.push(format!("{:<width$} {}", "Video", video_word(video.status), width = LABEL_WIDTH));
        if let Some(message) = &video.error_message {
            lines.extend(error_lines(message, 1));
        }
    }
    lines
}

// ============================================================================
// Files written
// ============================================================================

/// Directory header (relative to `root` when possible) and the files in it.
pub fn format_export_summary(summary: &ExportSummary, root: &Path) -> Vec<String> {
    let shown = summary.dir.strip_prefix(root).unwrap_or(&summary.dir);
    let mut lines = vec![format!("Exported {}/", shown.display())];
    let manifest = &summary.manifest;
    for angle in Angle::ALL {
        lines.push(format!("{}{}", indent(1), manifest.angles[angle]));
    }
    lines.push(format!("{}{}", indent(1), manifest.sheet));
    if let Some(video) = &manifest.video_file {
        lines.push(format!("{}{}", indent(1), video));
    }
    lines.push(format!("{}{}", indent(1), MANIFEST_FILENAME));
    lines
}

pub fn print_export_summary(summary: &ExportSummary, root: &Path) {
    for line in format_export_summary(summary, root) {
        println!("{}", line);
    }
}

/// One line per angle file written by `split`.
pub fn format_split_output(files: &AngleSet<PathBuf>) -> Vec<String> {
    files
        .iter()
        .map(|(angle, path)| {
            format!("{:<width$} {}", angle.label(), path.display(), width = LABEL_WIDTH)
        })
        .collect()
}

pub fn print_split_output(files: &AngleSet<PathBuf>) {
    for line in format_split_output(files) {
        println!("{}", line);
    }
}

pub fn format_error(message: &str) -> Vec<String> {
    let mut lines = error_lines(message, 0);
    if let Some(first) = lines.first_mut() {
        *first = format!("Error: {first}");
    }
    lines
}

// ============================================================================
// Tests
// ============================================================================
