//! Shared types used across the pipeline.
//!
//! Every stage speaks in terms of the four fixed [`Angle`]s. Per-angle data is
//! carried in an [`AngleSet`], which always holds exactly one value per angle,
//! so a "partial sheet" is unrepresentable rather than merely checked for.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// One of the four views on a sheet. Declaration order is grid order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Angle {
    Front,
    Left,
    Right,
    Back,
}

impl Angle {
    /// All angles in grid order: top-left, top-right, bottom-left, bottom-right.
    pub const ALL: [Angle; 4] = [Angle::Front, Angle::Left, Angle::Right, Angle::Back];

    /// `(column, row)` of this angle's cell in the 2x2 grid.
    pub fn grid_position(self) -> (u32, u32) {
        match self {
            Angle::Front => (0, 0),
            Angle::Left => (1, 0),
            Angle::Right => (0, 1),
            Angle::Back => (1, 1),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Angle::Front => "front",
            Angle::Left => "left",
            Angle::Right => "right",
            Angle::Back => "back",
        }
    }

    /// Human caption used on composed sheets.
    pub fn label(self) -> &'static str {
        match self {
            Angle::Front => "Front",
            Angle::Left => "Left Side",
            Angle::Right => "Right Side",
            Angle::Back => "Back",
        }
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Exactly one `T` per [`Angle`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AngleSet<T> {
    pub front: T,
    pub left: T,
    pub right: T,
    pub back: T,
}

impl<T> AngleSet<T> {
    /// Build a set by evaluating `f` once per angle, in grid order.
    pub fn from_fn(mut f: impl FnMut(Angle) -> T) -> Self {
        Self {
            front: f(Angle::Front),
            left: f(Angle::Left),
            right: f(Angle::Right),
            back: f(Angle::Back),
        }
    }

    /// Build a set from a fallible per-angle function. The first error wins
    /// and no set is produced.
    pub fn try_from_fn<E>(mut f: impl FnMut(Angle) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            front: f(Angle::Front)?,
            left: f(Angle::Left)?,
            right: f(Angle::Right)?,
            back: f(Angle::Back)?,
        })
    }

    pub fn map<U>(self, mut f: impl FnMut(Angle, T) -> U) -> AngleSet<U> {
        AngleSet {
            front: f(Angle::Front, self.front),
            left: f(Angle::Left, self.left),
            right: f(Angle::Right, self.right),
            back: f(Angle::Back, self.back),
        }
    }

    /// Iterate `(angle, value)` pairs in grid order.
    pub fn iter(&self) -> impl Iterator<Item = (Angle, &T)> {
        Angle::ALL.into_iter().map(move |angle| (angle, &self[angle]))
    }
}

impl<T> Index<Angle> for AngleSet<T> {
    type Output = T;

    fn index(&self, angle: Angle) -> &T {
        match angle {
            Angle::Front => &self.front,
            Angle::Left => &self.left,
            Angle::Right => &self.right,
            Angle::Back => &self.back,
        }
    }
}

impl<T> IndexMut<Angle> for AngleSet<T> {
    fn index_mut(&mut self, angle: Angle) -> &mut T {
        match angle {
            Angle::Front => &mut self.front,
            Angle::Left => &mut self.left,
            Angle::Right => &mut self.right,
            Angle::Back => &mut self.back,
        }
    }
}

/// Encoded image bytes together with their MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self::new(bytes, "image/jpeg")
    }

    /// Sniff the MIME type from the bytes, falling back to JPEG.
    pub fn sniffed(bytes: Vec<u8>) -> Self {
        let mime = image::guess_format(&bytes)
            .map(|format| format.to_mime_type())
            .unwrap_or("image/jpeg");
        Self::new(bytes, mime)
    }
}

impl Default for ImagePayload {
    fn default() -> Self {
        Self::jpeg(Vec::new())
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Lifecycle of one angle within a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleStatus {
    Pending,
    Done,
    Error,
}

/// The result slot for one angle.
///
/// The image is present iff the status is `done`, the message iff it is
/// `error`; the enum shape enforces that.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AngleResult {
    #[default]
    Pending,
    Done(ImagePayload),
    Error(String),
}

impl AngleResult {
    pub fn status(&self) -> AngleStatus {
        match self {
            AngleResult::Pending => AngleStatus::Pending,
            AngleResult::Done(_) => AngleStatus::Done,
            AngleResult::Error(_) => AngleStatus::Error,
        }
    }

    pub fn image(&self) -> Option<&ImagePayload> {
        match self {
            AngleResult::Done(image) => Some(image),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            AngleResult::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Overall state of a generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

/// What the user asked for. Immutable once a session starts.
///
/// At least one style driver (description, reference image or hair colour)
/// must be present; see [`GenerationInputs::has_style_driver`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationInputs {
    pub source_image: ImagePayload,
    pub style_description: Option<String>,
    pub style_reference: Option<ImagePayload>,
    /// Free-text tweak applied on top of the chosen style ("shorter on top").
    pub style_modification: Option<String>,
    pub hair_color: Option<String>,
}

impl GenerationInputs {
    pub fn new(source_image: ImagePayload) -> Self {
        Self {
            source_image,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.style_description = Some(description.into());
        self
    }

    pub fn with_reference(mut self, reference: ImagePayload) -> Self {
        self.style_reference = Some(reference);
        self
    }

    pub fn with_modification(mut self, modification: impl Into<String>) -> Self {
        self.style_modification = Some(modification.into());
        self
    }

    pub fn with_hair_color(mut self, color: impl Into<String>) -> Self {
        self.hair_color = Some(color.into());
        self
    }

    pub fn description(&self) -> Option<&str> {
        non_blank(self.style_description.as_deref())
    }

    pub fn modification(&self) -> Option<&str> {
        non_blank(self.style_modification.as_deref())
    }

    pub fn hair_color(&self) -> Option<&str> {
        non_blank(self.hair_color.as_deref())
    }

    /// True when a description, a reference image or a hair colour is given.
    pub fn has_style_driver(&self) -> bool {
        self.description().is_some()
            || self
                .style_reference
                .as_ref()
                .is_some_and(|reference| !reference.bytes.is_empty())
            || self.hair_color().is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_positions_follow_declaration_order() {
        let positions: Vec<_> = Angle::ALL.iter().map(|a| a.grid_position()).collect();
        assert_eq!(positions, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn angle_set_index_matches_fields() {
        let mut set = AngleSet::from_fn(|angle| angle.name().to_string());
        assert_eq!(set[Angle::Left], "left");
        set[Angle::Back] = "rear".into();
        assert_eq!(set.back, "rear");
    }

    #[test]
    fn try_from_fn_stops_at_first_error() {
        let mut seen = Vec::new();
        let result: Result<AngleSet<u32>, Angle> = AngleSet::try_from_fn(|angle| {
            seen.push(angle);
            if angle == Angle::Left { Err(angle) } else { Ok(1) }
        });
        assert_eq!(result, Err(Angle::Left));
        assert_eq!(seen, vec![Angle::Front, Angle::Left]);
    }

    #[test]
    fn angle_result_accessors() {
        let done = AngleResult::Done(ImagePayload::jpeg(vec![1, 2]));
        assert_eq!(done.status(), AngleStatus::Done);
        assert!(done.image().is_some());
        assert!(done.error_message().is_none());

        let failed = AngleResult::Error("boom".into());
        assert_eq!(failed.status(), AngleStatus::Error);
        assert_eq!(failed.error_message(), Some("boom"));

        assert_eq!(AngleResult::default().status(), AngleStatus::Pending);
    }

    #[test]
    fn style_driver_detection() {
        let source = ImagePayload::jpeg(vec![0xFF]);
        assert!(!GenerationInputs::new(source.clone()).has_style_driver());
        assert!(
            !GenerationInputs::new(source.clone())
                .with_description("   ")
                .has_style_driver()
        );
        assert!(
            !GenerationInputs::new(source.clone())
                .with_modification("shorter")
                .has_style_driver()
        );
        assert!(
            GenerationInputs::new(source.clone())
                .with_description("a short fade")
                .has_style_driver()
        );
        assert!(
            GenerationInputs::new(source.clone())
                .with_reference(ImagePayload::jpeg(vec![1]))
                .has_style_driver()
        );
        assert!(
            GenerationInputs::new(source)
                .with_hair_color("copper")
                .has_style_driver()
        );
    }

    #[test]
    fn payload_debug_elides_bytes() {
        let payload = ImagePayload::jpeg(vec![0; 1024]);
        let text = format!("{payload:?}");
        assert!(text.contains("len: 1024"));
        assert!(!text.contains("0, 0"));
    }

    #[test]
    fn sniffed_detects_png() {
        let mut bytes = Vec::new();
        image::DynamicImage::new_rgb8(1, 1)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        assert_eq!(ImagePayload::sniffed(bytes).mime_type, "image/png");
    }
}
