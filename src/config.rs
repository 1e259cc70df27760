//! Configuration loading.
//!
//! Handles loading, validating, and merging `hairsheet.toml`. Stock defaults
//! are the base layer; a user file overrides any subset of them.
//!
//! ## Config File Location
//!
//! `hairsheet.toml` in the working directory, or any path passed with
//! `--config`. A missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [api]
//! base_url = "https://generativelanguage.googleapis.com/v1beta"
//!
//! [generation]
//! model = "gemini-2.5-flash-image"
//! max_attempts = 3          # Total tries for server-side (500) failures
//! base_delay_ms = 1000      # Backoff doubles after each failed try
//! request_timeout_secs = 120
//!
//! [video]
//! model = "veo-3.0-fast-generate-001"
//! poll_interval_secs = 10
//! # max_polls = 60          # Omit to poll until the operation settles
//! aspect_ratio = "9:16"
//!
//! [sheet]
//! quality = 90              # JPEG quality (1-100)
//! width = 1240
//! height = 1754
//! title = "Your New Look"
//! subtitle = "Four angles, one style"
//! footer = "hairsheet"
//!
//! [sheet.colors]
//! background = "#f5f1ea"
//! frame = "#ffffff"
//! ink = "#1f1f1f"
//! muted = "#6b665e"
//! ```
//!
//! The API key is never read from this file; set `GEMINI_API_KEY` (or
//! `GOOGLE_API_KEY`) in the environment.
//!
//! Unknown keys are rejected to catch typos early.

use crate::capability::gemini::{DEFAULT_API_BASE, GeminiSettings};
use crate::retry::RetryPolicy;
use crate::sheet::{Quality, Rgb, SheetCodec, SheetStyle};
use crate::video::PollSchedule;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "hairsheet.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full configuration. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api: ApiConfig,
    pub generation: GenerationConfig,
    pub video: VideoConfig,
    pub sheet: SheetConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Validation(
                "api.base_url must be an http(s) URL".into(),
            ));
        }
        if self.generation.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "generation.model must not be empty".into(),
            ));
        }
        if !(1..=10).contains(&self.generation.max_attempts) {
            return Err(ConfigError::Validation(
                "generation.max_attempts must be 1-10".into(),
            ));
        }
        if self.generation.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "generation.request_timeout_secs must be at least 1".into(),
            ));
        }
        if self.video.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "video.model must not be empty".into(),
            ));
        }
        if self.video.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "video.poll_interval_secs must be at least 1".into(),
            ));
        }
        if self.video.max_polls == Some(0) {
            return Err(ConfigError::Validation(
                "video.max_polls must be at least 1 (omit it for no limit)".into(),
            ));
        }
        if !(1..=100).contains(&self.sheet.quality) {
            return Err(ConfigError::Validation(
                "sheet.quality must be 1-100".into(),
            ));
        }
        if self.sheet.width < 200 || self.sheet.height < 200 {
            return Err(ConfigError::Validation(
                "sheet.width and sheet.height must be at least 200".into(),
            ));
        }
        self.sheet.colors.parse()?;
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.generation.max_attempts,
            Duration::from_millis(self.generation.base_delay_ms),
        )
    }

    pub fn poll_schedule(&self) -> PollSchedule {
        PollSchedule {
            interval: Duration::from_secs(self.video.poll_interval_secs),
            max_polls: self.video.max_polls,
        }
    }

    pub fn sheet_codec(&self) -> Result<SheetCodec, ConfigError> {
        let [background, frame, ink, muted] = self.sheet.colors.parse()?;
        let style = SheetStyle {
            width: self.sheet.width,
            height: self.sheet.height,
            title: self.sheet.title.clone(),
            subtitle: self.sheet.subtitle.clone(),
            footer: self.sheet.footer.clone(),
            background,
            frame,
            ink,
            muted,
        };
        Ok(SheetCodec::new(Quality::new(self.sheet.quality), style))
    }

    /// Connection settings for the Gemini client, with the given API key.
    pub fn gemini_settings(&self, api_key: String) -> GeminiSettings {
        let aspect_ratio = self.video.aspect_ratio.trim();
        GeminiSettings {
            api_base: self.api.base_url.trim().to_string(),
            api_key,
            image_model: self.generation.model.trim().to_string(),
            video_model: self.video.model.trim().to_string(),
            video_aspect_ratio: (!aspect_ratio.is_empty()).then(|| aspect_ratio.to_string()),
            request_timeout: Duration::from_secs(self.generation.request_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Image generation and retry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    pub model: String,
    /// Total attempts, including the first, for transient failures.
    pub max_attempts: u32,
    /// Wait after the first failed attempt; doubles after each further one.
    pub base_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-image".to_string(),
            max_attempts: 3,
            base_delay_ms: 1000,
            request_timeout_secs: 120,
        }
    }
}

/// Video generation and polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideoConfig {
    pub model: String,
    pub poll_interval_secs: u64,
    /// Stop polling after this many checks. Absent = no limit.
    pub max_polls: Option<u32>,
    /// Requested aspect ratio (e.g. `"9:16"`). Empty lets the service choose.
    pub aspect_ratio: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            model: "veo-3.0-fast-generate-001".to_string(),
            poll_interval_secs: 10,
            max_polls: None,
            aspect_ratio: "9:16".to_string(),
        }
    }
}

/// Composed sheet settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetConfig {
    pub quality: u32,
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub subtitle: String,
    pub footer: String,
    pub colors: SheetColors,
}

impl Default for SheetConfig {
    fn default() -> Self {
        let style = SheetStyle::default();
        Self {
            quality: Quality::default().value() as u32,
            width: style.width,
            height: style.height,
            title: style.title,
            subtitle: style.subtitle,
            footer: style.footer,
            colors: SheetColors::default(),
        }
    }
}

/// Sheet palette as `#rrggbb` strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetColors {
    pub background: String,
    pub frame: String,
    pub ink: String,
    /// Subtitle, captions and footer.
    pub muted: String,
}

impl SheetColors {
    /// Parse into `[background, frame, ink, muted]`.
    fn parse(&self) -> Result<[Rgb; 4], ConfigError> {
        let parse = |key: &str, value: &str| {
            value
                .parse::<Rgb>()
                .map_err(|e| ConfigError::Validation(format!("sheet.colors.{key}: {e}")))
        };
        Ok([
            parse("background", &self.background)?,
            parse("frame", &self.frame)?,
            parse("ink", &self.ink)?,
            parse("muted", &self.muted)?,
        ])
    }
}

impl Default for SheetColors {
    fn default() -> Self {
        let style = SheetStyle::default();
        Self {
            background: style.background.to_string(),
            frame: style.frame.to_string(),
            ink: style.ink.to_string(),
            muted: style.muted.to_string(),
        }
    }
}

// =============================================================================
// Layering: stock defaults, then hairsheet.toml
// =============================================================================

/// The bottom layer: every option at its stock value.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Lay the keys of `user` onto `base` in place.
///
/// Sub-tables such as `[sheet.colors]` are descended into, so a file that
/// sets one colour keeps the stock values of the other three. Any other
/// value from `user` replaces the stock one.
pub fn overlay_toml(base: &mut toml::Table, user: toml::Table) {
    for (key, value) in user {
        match value {
            toml::Value::Table(nested) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => overlay_toml(existing, nested),
                _ => {
                    base.insert(key, toml::Value::Table(nested));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

/// Parse the user's `hairsheet.toml`. A missing file is not an error: it
/// means the stock defaults apply unchanged.
pub fn load_user_config(path: &Path) -> Result<Option<toml::Table>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(toml::from_str(&content)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Stock defaults with the user's table (if any) laid on top, checked by
/// [`Config::validate`].
pub fn resolve_config(user: Option<toml::Table>) -> Result<Config, ConfigError> {
    let mut layered = stock_defaults_value();
    if let (Some(base), Some(user)) = (layered.as_table_mut(), user) {
        overlay_toml(base, user);
    }
    let config: Config = layered.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `path` (usually `hairsheet.toml`) over the stock defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    resolve_config(load_user_config(path)?)
}

/// Returns a fully-commented stock config file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# hairsheet configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# The API key is read from GEMINI_API_KEY (or GOOGLE_API_KEY), never from
# this file.

# ---------------------------------------------------------------------------
# Remote API
# ---------------------------------------------------------------------------
[api]
base_url = "https://generativelanguage.googleapis.com/v1beta"

# ---------------------------------------------------------------------------
# Four-view sheet generation
# ---------------------------------------------------------------------------
[generation]
model = "gemini-2.5-flash-image"

# Total tries when the service reports an internal (500) error.
# Other failures are never retried.
max_attempts = 3

# Wait after the first failed try, in milliseconds. Doubles each time.
base_delay_ms = 1000

# Per-request HTTP timeout.
request_timeout_secs = 120

# ---------------------------------------------------------------------------
# Turntable video
# ---------------------------------------------------------------------------
[video]
model = "veo-3.0-fast-generate-001"

# Seconds between status checks while the video renders.
poll_interval_secs = 10

# Give up after this many status checks.
# Omit or comment out to wait until the service finishes.
# max_polls = 60

# Leave empty to let the service choose.
aspect_ratio = "9:16"

# ---------------------------------------------------------------------------
# Composed sheet (sheet.jpg)
# ---------------------------------------------------------------------------
[sheet]
# JPEG quality for split angles and the composed sheet (1-100).
quality = 90

# Canvas size in pixels. Portrait works best.
width = 1240
height = 1754

title = "Your New Look"
subtitle = "Four angles, one style"
footer = "hairsheet"

[sheet.colors]
background = "#f5f1ea"
frame = "#ffffff"
ink = "#1f1f1f"
muted = "#6b665e"    # Subtitle, captions, footer
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn defaults_match_pipeline_defaults() {
        let config = Config::default();
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.poll_schedule(), PollSchedule::default());
        let codec = config.sheet_codec().unwrap();
        assert_eq!(codec.quality, Quality::default());
        assert_eq!(codec.style, SheetStyle::default());
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let parsed: Config = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let toml = r##"
[generation]
max_attempts = 5

[sheet.colors]
background = "#000000"
"##;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.generation.max_attempts, 5);
        assert_eq!(config.generation.base_delay_ms, 1000);
        assert_eq!(config.sheet.colors.background, "#000000");
        assert_eq!(config.sheet.colors.frame, "#ffffff");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<Config, _> = toml::from_str("[video]\npoll_every = 5\n");
        assert!(result.is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut config = Config::default();
        config.generation.max_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.video.max_polls = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sheet.quality = 101;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sheet.colors.ink = "black".into();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("sheet.colors.ink"));

        let mut config = Config::default();
        config.api.base_url = "ftp://example.test".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn poll_ceiling_is_carried_through() {
        let mut config = Config::default();
        config.video.max_polls = Some(30);
        config.video.poll_interval_secs = 5;
        let schedule = config.poll_schedule();
        assert_eq!(schedule.max_polls, Some(30));
        assert_eq!(schedule.interval, Duration::from_secs(5));
    }

    #[test]
    fn gemini_settings_drop_empty_aspect_ratio() {
        let mut config = Config::default();
        assert_eq!(
            config.gemini_settings("k".into()).video_aspect_ratio.as_deref(),
            Some("9:16")
        );
        config.video.aspect_ratio = "  ".into();
        let settings = config.gemini_settings("k".into());
        assert_eq!(settings.video_aspect_ratio, None);
        assert_eq!(settings.api_key, "k");
        assert_eq!(settings.request_timeout, Duration::from_secs(120));
    }

    // =========================================================================
    // Layering tests
    // =========================================================================

    #[test]
    fn overlay_descends_into_sub_tables() {
        let mut base: toml::Table =
            toml::from_str("[sheet]\nquality = 90\n[sheet.colors]\nink = \"#111111\"\nframe = \"#ffffff\"\n")
                .unwrap();
        let user: toml::Table =
            toml::from_str("[sheet.colors]\nink = \"#222222\"\n[video]\nmax_polls = 4\n").unwrap();
        overlay_toml(&mut base, user);
        assert_eq!(base["sheet"]["quality"].as_integer(), Some(90));
        assert_eq!(base["sheet"]["colors"]["ink"].as_str(), Some("#222222"));
        assert_eq!(base["sheet"]["colors"]["frame"].as_str(), Some("#ffffff"));
        assert_eq!(base["video"]["max_polls"].as_integer(), Some(4));
    }

    #[test]
    fn resolve_without_user_file_is_stock() {
        assert_eq!(resolve_config(None).unwrap(), Config::default());
    }

    #[test]
    fn resolved_nested_colour_keeps_other_stock_colours() {
        let user: toml::Table = toml::from_str("[sheet.colors]\nmuted = \"#101010\"\n").unwrap();
        let config = resolve_config(Some(user)).unwrap();
        assert_eq!(config.sheet.colors.muted, "#101010");
        assert_eq!(config.sheet.colors.background, SheetColors::default().background);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(
            &path,
            r##"
[video]
max_polls = 12

[sheet]
title = "Salon Preview"
"##,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.video.max_polls, Some(12));
        assert_eq!(config.sheet.title, "Salon Preview");
        assert_eq!(config.video.poll_interval_secs, 10);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "[generation\nmodel = ").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_runs_validation() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        fs::write(&path, "[sheet]\nwidth = 10\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Validation(_))));
    }
}
