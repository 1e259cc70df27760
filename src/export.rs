//! Persisting a finished session to disk.
//!
//! Each session gets its own directory under the export root, named from a
//! hash of the source photo and the style inputs. Re-exporting the same
//! request replaces that directory wholesale; a different style on the same
//! photo gets a directory of its own:
//!
//! ```text
//! out/
//! └── 3f9a1c0be2d4/
//!     ├── front.jpg
//!     ├── left.jpg
//!     ├── right.jpg
//!     ├── back.jpg
//!     ├── sheet.jpg          # composed, captioned 2x2 sheet
//!     ├── video.mp4          # only when the video finished
//!     └── session.json
//! ```

use crate::session::{GenerationSession, VideoOperationState};
use crate::sheet::{SheetCodec, SheetError};
use crate::types::{Angle, AngleSet, GenerationInputs, OverallStatus};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Bump when the `session.json` layout changes.
const MANIFEST_VERSION: u32 = 1;

/// Hex characters of the session key used for the directory name.
const DIR_HASH_LEN: usize = 12;

pub const MANIFEST_FILENAME: &str = "session.json";
pub const SHEET_FILENAME: &str = "sheet.jpg";
pub const VIDEO_FILENAME: &str = "video.mp4";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Sheet error: {0}")]
    Sheet(#[from] SheetError),
    #[error("Only completed sessions can be exported (status: {0:?})")]
    NotCompleted(OverallStatus),
}

/// Contents of `session.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionManifest {
    pub version: u32,
    pub source_sha256: String,
    /// Hash of the photo and style inputs; names the session directory.
    pub session_key: String,
    pub style_description: Option<String>,
    pub style_modification: Option<String>,
    pub hair_color: Option<String>,
    pub used_reference: bool,
    /// File name of each angle image, relative to the session directory.
    pub angles: AngleSet<String>,
    pub sheet: String,
    pub video: Option<VideoOperationState>,
    pub video_file: Option<String>,
}

/// What an export wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub dir: PathBuf,
    pub manifest: SessionManifest,
}

/// SHA-256 of `bytes` as lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 over the source photo and every style input.
///
/// Fields are length-prefixed so adjacent values cannot run together.
pub fn session_key(inputs: &GenerationInputs) -> String {
    let reference = inputs
        .style_reference
        .as_ref()
        .map(|r| r.bytes.as_slice())
        .unwrap_or_default();
    let fields: [&[u8]; 5] = [
        &inputs.source_image.bytes,
        inputs.description().unwrap_or_default().as_bytes(),
        inputs.modification().unwrap_or_default().as_bytes(),
        inputs.hair_color().unwrap_or_default().as_bytes(),
        reference,
    ];
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field);
    }
    format!("{:x}", hasher.finalize())
}

/// Write a completed session under `root`.
///
/// Anything already in the session directory is removed first, so the
/// directory only ever holds what `session.json` lists.
pub fn export_session(
    session: &GenerationSession,
    codec: &SheetCodec,
    root: &Path,
) -> Result<ExportSummary, ExportError> {
    let (Some(inputs), Some(images)) = (session.inputs(), session.completed_images()) else {
        return Err(ExportError::NotCompleted(session.status()));
    };
    if session.status() != OverallStatus::Completed {
        return Err(ExportError::NotCompleted(session.status()));
    }

    let source_sha256 = content_hash(&inputs.source_image.bytes);
    let session_key = session_key(inputs);
    let dir = root.join(&session_key[..DIR_HASH_LEN]);
    if dir.exists() {
        std::fs::remove_dir_all(&dir)?;
    }
    std::fs::create_dir_all(&dir)?;

    let angles = AngleSet::try_from_fn(|angle: Angle| -> Result<String, ExportError> {
        let image = images[angle];
        let name = format!("{}.{}", angle.name(), extension_for(&image.mime_type));
        std::fs::write(dir.join(&name), &image.bytes)?;
        Ok(name)
    })?;

    let owned = images.map(|_, image| image.clone());
    let sheet = codec.compose_labelled(&owned)?;
    std::fs::write(dir.join(SHEET_FILENAME), &sheet.bytes)?;

    let video_file = match session.video_bytes() {
        Some(bytes) => {
            std::fs::write(dir.join(VIDEO_FILENAME), bytes)?;
            Some(VIDEO_FILENAME.to_string())
        }
        None => None,
    };

    let manifest = SessionManifest {
        version: MANIFEST_VERSION,
        source_sha256,
        session_key,
        style_description: inputs.description().map(str::to_string),
        style_modification: inputs.modification().map(str::to_string),
        hair_color: inputs.hair_color().map(str::to_string),
        used_reference: inputs
            .style_reference
            .as_ref()
            .is_some_and(|r| !r.bytes.is_empty()),
        angles,
        sheet: SHEET_FILENAME.to_string(),
        video: session.video().cloned(),
        video_file,
    };
    let json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(dir.join(MANIFEST_FILENAME), json)?;

    info!(dir = %dir.display(), "session exported");
    Ok(ExportSummary { dir, manifest })
}

/// Read back a `session.json`.
pub fn load_manifest(dir: &Path) -> Result<SessionManifest, ExportError> {
    let content = std::fs::read_to_string(dir.join(MANIFEST_FILENAME))?;
    Ok(serde_json::from_str(&content)?)
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::tests::{MockFetcher, ScriptedGenerator, ScriptedVideo};
    use crate::capability::{CapabilityError, GenerationResponse, OperationStatus};
    use crate::pause::tests::RecordingPause;
    use crate::retry::{RetryPolicy, RetryingGenerationClient};
    use crate::session::VideoStatus;
    use crate::sheet::SheetStyle;
    use crate::test_helpers::{assert_pixel_near, solid_quadrant_sheet, COLOURS};
    use crate::types::{GenerationInputs, ImagePayload};
    use crate::video::{PollSchedule, VideoOperationPoller};
    use tempfile::TempDir;

    fn small_codec() -> SheetCodec {
        SheetCodec {
            style: SheetStyle {
                width: 300,
                height: 424,
                ..SheetStyle::default()
            },
            ..SheetCodec::default()
        }
    }

    fn source() -> ImagePayload {
        ImagePayload::jpeg(b"source photo bytes".to_vec())
    }

    fn fade() -> GenerationInputs {
        GenerationInputs::new(source())
            .with_description("a short fade")
            .with_hair_color("auburn")
    }

    fn start_with(
        inputs: GenerationInputs,
        response: Result<GenerationResponse, CapabilityError>,
    ) -> GenerationSession {
        let generator = ScriptedGenerator::always(response);
        let client =
            RetryingGenerationClient::with_pause(&generator, RecordingPause::new(), RetryPolicy::default());
        let mut session = GenerationSession::new();
        let _ = session.start(inputs, &client, &SheetCodec::default());
        session
    }

    fn session_with(response: Result<GenerationResponse, CapabilityError>) -> GenerationSession {
        start_with(fade(), response)
    }

    fn completed_with(inputs: GenerationInputs) -> GenerationSession {
        start_with(inputs, Ok(GenerationResponse::Image(solid_quadrant_sheet(200, 120))))
    }

    fn completed() -> GenerationSession {
        completed_with(fade())
    }

    fn add_video(session: &mut GenerationSession, bytes: &[u8]) {
        let video = ScriptedVideo::new(vec![Ok(OperationStatus::Done {
            result_uri: Some("https://example.test/v.mp4".into()),
        })]);
        let fetcher = MockFetcher::returning(bytes);
        let poller = VideoOperationPoller::with_pause(
            &video,
            &fetcher,
            RecordingPause::new(),
            PollSchedule::default(),
        );
        session.generate_video(&poller).unwrap();
    }

    #[test]
    fn content_hash_is_sha256_hex() {
        let hash = content_hash(b"abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn export_writes_angles_sheet_and_manifest() {
        let tmp = TempDir::new().unwrap();
        let session = completed();

        let summary = export_session(&session, &small_codec(), tmp.path()).unwrap();
        let expected_dir = tmp.path().join(&session_key(&fade())[..12]);
        assert_eq!(summary.dir, expected_dir);

        for angle in Angle::ALL {
            let path = expected_dir.join(format!("{}.jpg", angle.name()));
            let image = ImagePayload::jpeg(std::fs::read(&path).unwrap());
            assert_pixel_near(&image, (50, 30), COLOURS[angle], 12);
        }
        let sheet = image::open(expected_dir.join(SHEET_FILENAME)).unwrap();
        assert_eq!((sheet.width(), sheet.height()), (300, 424));
        assert!(!expected_dir.join(VIDEO_FILENAME).exists());

        let manifest = load_manifest(&expected_dir).unwrap();
        assert_eq!(manifest, summary.manifest);
        assert_eq!(manifest.angles.front, "front.jpg");
        assert_eq!(manifest.style_description.as_deref(), Some("a short fade"));
        assert_eq!(manifest.hair_color.as_deref(), Some("auburn"));
        assert!(!manifest.used_reference);
        assert!(manifest.video.is_none());
    }

    #[test]
    fn export_includes_finished_video() {
        let tmp = TempDir::new().unwrap();
        let mut session = completed();
        add_video(&mut session, b"fake mp4");

        let summary = export_session(&session, &small_codec(), tmp.path()).unwrap();
        assert_eq!(
            std::fs::read(summary.dir.join(VIDEO_FILENAME)).unwrap(),
            b"fake mp4"
        );
        let manifest = load_manifest(&summary.dir).unwrap();
        assert_eq!(manifest.video_file.as_deref(), Some(VIDEO_FILENAME));
        assert_eq!(manifest.video.unwrap().status, VideoStatus::Done);
    }

    #[test]
    fn session_key_depends_on_style_inputs() {
        let base = session_key(&fade());
        assert_eq!(base, session_key(&fade()));
        assert_ne!(base, session_key(&fade().with_modification("longer")));
        assert_ne!(base, session_key(&fade().with_reference(ImagePayload::jpeg(vec![7]))));
        assert_ne!(
            session_key(&GenerationInputs::new(source()).with_description("ab")),
            session_key(&GenerationInputs::new(source()).with_description("a").with_modification("b"))
        );
    }

    #[test]
    fn different_styles_on_one_photo_export_side_by_side() {
        let tmp = TempDir::new().unwrap();
        let mut mohawk = completed_with(GenerationInputs::new(source()).with_description("mohawk"));
        add_video(&mut mohawk, b"mohawk video");
        let bob = completed_with(GenerationInputs::new(source()).with_description("bob"));

        let first = export_session(&mohawk, &small_codec(), tmp.path()).unwrap();
        let second = export_session(&bob, &small_codec(), tmp.path()).unwrap();

        assert_ne!(first.dir, second.dir);
        assert_eq!(first.manifest.source_sha256, second.manifest.source_sha256);
        assert_eq!(
            std::fs::read(first.dir.join(VIDEO_FILENAME)).unwrap(),
            b"mohawk video"
        );
        assert!(!second.dir.join(VIDEO_FILENAME).exists());
    }

    #[test]
    fn re_export_replaces_stale_files() {
        let tmp = TempDir::new().unwrap();
        let mut with_video = completed();
        add_video(&mut with_video, b"old video");
        let first = export_session(&with_video, &small_codec(), tmp.path()).unwrap();
        std::fs::write(first.dir.join("front.png"), b"leftover").unwrap();

        let second = export_session(&completed(), &small_codec(), tmp.path()).unwrap();

        assert_eq!(first.dir, second.dir);
        assert!(!second.dir.join(VIDEO_FILENAME).exists());
        assert!(!second.dir.join("front.png").exists());
        let manifest = load_manifest(&second.dir).unwrap();
        assert_eq!(manifest.video_file, None);
        assert!(manifest.video.is_none());
    }

    #[test]
    fn failed_session_is_not_exported() {
        let tmp = TempDir::new().unwrap();
        let session = session_with(Err(CapabilityError::new("refused")));
        let err = export_session(&session, &small_codec(), tmp.path()).unwrap_err();
        assert!(matches!(err, ExportError::NotCompleted(OverallStatus::Failed)));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn idle_session_is_not_exported() {
        let tmp = TempDir::new().unwrap();
        let err = export_session(&GenerationSession::new(), &small_codec(), tmp.path()).unwrap_err();
        assert!(matches!(err, ExportError::NotCompleted(OverallStatus::Idle)));
    }

    #[test]
    fn extension_follows_mime_type() {
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("application/octet-stream"), "jpg");
    }
}
