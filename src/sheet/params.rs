//! Parameter types for the sheet codec.
//!
//! - [`Quality`]: JPEG quality for re-encoded images (1–100, default 90). Clamped on construction.
//! - [`Rgb`]: an opaque colour parsed from `#rrggbb`.
//! - [`SheetStyle`]: canvas size, heading texts and palette for composed sheets.

use super::SheetError;
use std::fmt;
use std::str::FromStr;

/// JPEG quality (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// An opaque sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// Scale every channel by `factor` (0.0–1.0 darkens).
    pub fn shade(self, factor: f32) -> Self {
        let [r, g, b] = self.0;
        let scale = |c: u8| (c as f32 * factor).round().clamp(0.0, 255.0) as u8;
        Self([scale(r), scale(g), scale(b)])
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        let [r, g, b] = self.0;
        image::Rgba([r, g, b, 255])
    }
}

impl FromStr for Rgb {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || SheetError::Style(format!("invalid colour '{s}', expected #rrggbb"));
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

/// Look of a composed sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetStyle {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub subtitle: String,
    pub footer: String,
    pub background: Rgb,
    /// Polaroid frame colour.
    pub frame: Rgb,
    /// Title colour.
    pub ink: Rgb,
    /// Subtitle, caption and footer colour.
    pub muted: Rgb,
}

impl Default for SheetStyle {
    fn default() -> Self {
        Self {
            width: 1240,
            height: 1754,
            title: "Your New Look".to_string(),
            subtitle: "Four angles, one style".to_string(),
            footer: "hairsheet".to_string(),
            background: Rgb([0xf5, 0xf1, 0xea]),
            frame: Rgb([0xff, 0xff, 0xff]),
            ink: Rgb([0x1f, 0x1f, 0x1f]),
            muted: Rgb([0x6b, 0x66, 0x5e]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn rgb_parses_with_and_without_hash() {
        assert_eq!("#ff8000".parse::<Rgb>().unwrap(), Rgb([255, 128, 0]));
        assert_eq!("0A0b0C".parse::<Rgb>().unwrap(), Rgb([10, 11, 12]));
    }

    #[test]
    fn rgb_rejects_malformed() {
        assert!("#fff".parse::<Rgb>().is_err());
        assert!("#gg0000".parse::<Rgb>().is_err());
        assert!("#ffé000".parse::<Rgb>().is_err());
    }

    #[test]
    fn rgb_display_roundtrips() {
        let colour = Rgb([0x12, 0xab, 0x00]);
        assert_eq!(colour.to_string(), "#12ab00");
        assert_eq!(colour.to_string().parse::<Rgb>().unwrap(), colour);
    }

    #[test]
    fn shade_darkens() {
        assert_eq!(Rgb([200, 100, 0]).shade(0.5), Rgb([100, 50, 0]));
    }

    #[test]
    fn default_style_is_portrait() {
        let style = SheetStyle::default();
        assert!(style.height > style.width);
    }
}
