//! Configuration types for PDF cleanup.
//!
//! Every knob lives in [`CleanConfig`], built via [`CleanConfigBuilder`].
//! The preview and export paths both read from the same value instead of
//! from ambient UI state, so what you previewed is what you export.

use crate::error::PdfCleanError;
use crate::progress::ProgressCallback;
use crate::raster::Threshold;
use std::fmt;
use std::time::Duration;

/// Scale of the on-screen preview capture (1.0 = 72 DPI).
pub const DEFAULT_PREVIEW_SCALE: f32 = 0.8;

/// Scale used for every page of the exported document (144 DPI).
pub const DEFAULT_EXPORT_SCALE: f32 = 2.0;

/// Quiet period after the last threshold change before the preview renders.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Prefix prepended to the original file name for the cleaned document.
pub const DEFAULT_OUTPUT_PREFIX: &str = "cleaned-";

const MAX_PREVIEW_SCALE: f32 = 4.0;
const MAX_EXPORT_SCALE: f32 = 8.0;

/// Configuration for a cleanup session.
///
/// Built via [`CleanConfig::builder()`] or using [`CleanConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfclean::{CleanConfig, Threshold};
///
/// let config = CleanConfig::builder()
///     .threshold(Threshold::new(180))
///     .export_scale(3.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct CleanConfig {
    /// Brightness cutoff applied uniformly to every page. Default: 128.
    pub threshold: Threshold,

    /// Render scale of the page-1 preview capture. Default: 0.8.
    ///
    /// The preview is re-filtered on every slider move, so it is kept small.
    pub preview_scale: f32,

    /// Render scale of each exported page. Default: 2.0.
    ///
    /// Export always re-rasterises from the source document at this scale;
    /// it never reuses the preview capture.
    pub export_scale: f32,

    /// Debounce delay for preview re-renders in milliseconds. Default: 100.
    pub debounce_ms: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Prefix for the delivered file name. Default: `"cleaned-"`.
    pub output_prefix: String,

    /// Receives per-page export events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::DEFAULT,
            preview_scale: DEFAULT_PREVIEW_SCALE,
            export_scale: DEFAULT_EXPORT_SCALE,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            password: None,
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CleanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanConfig")
            .field("threshold", &self.threshold)
            .field("preview_scale", &self.preview_scale)
            .field("export_scale", &self.export_scale)
            .field("debounce_ms", &self.debounce_ms)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("output_prefix", &self.output_prefix)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn CleanProgressCallback>"),
            )
            .finish()
    }
}

impl CleanConfig {
    /// Create a new builder for `CleanConfig`.
    pub fn builder() -> CleanConfigBuilder {
        CleanConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Check the constraints [`CleanConfigBuilder::build`] enforces.
    ///
    /// The fields are public, so a config assembled by hand is checked
    /// again before any work starts.
    pub fn validate(&self) -> Result<(), PdfCleanError> {
        check_scale("preview_scale", self.preview_scale, MAX_PREVIEW_SCALE)?;
        check_scale("export_scale", self.export_scale, MAX_EXPORT_SCALE)?;
        if self.output_prefix.is_empty() {
            return Err(PdfCleanError::InvalidConfig(
                "output_prefix must not be empty (it would overwrite the original name)".into(),
            ));
        }
        if self.output_prefix.contains(['/', '\\']) {
            return Err(PdfCleanError::InvalidConfig(format!(
                "output_prefix must not contain path separators, got '{}'",
                self.output_prefix
            )));
        }
        Ok(())
    }
}

/// Builder for [`CleanConfig`].
#[derive(Debug)]
pub struct CleanConfigBuilder {
    config: CleanConfig,
}

impl CleanConfigBuilder {
    pub fn threshold(mut self, threshold: Threshold) -> Self {
        self.config.threshold = threshold;
        self
    }

    pub fn preview_scale(mut self, scale: f32) -> Self {
        self.config.preview_scale = scale;
        self
    }

    pub fn export_scale(mut self, scale: f32) -> Self {
        self.config.export_scale = scale;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.debounce_ms = ms;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.output_prefix = prefix.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CleanConfig, PdfCleanError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn check_scale(name: &str, value: f32, max: f32) -> Result<(), PdfCleanError> {
    if !value.is_finite() || value <= 0.0 || value > max {
        return Err(PdfCleanError::InvalidConfig(format!(
            "{name} must be in (0, {max}], got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behaviour() {
        let c = CleanConfig::default();
        assert_eq!(c.threshold.value(), 128);
        assert_eq!(c.preview_scale, 0.8);
        assert_eq!(c.export_scale, 2.0);
        assert_eq!(c.debounce(), Duration::from_millis(100));
        assert_eq!(c.output_prefix, "cleaned-");
    }

    #[test]
    fn builder_sets_fields() {
        let c = CleanConfig::builder()
            .threshold(Threshold::new(200))
            .preview_scale(0.5)
            .export_scale(3.0)
            .debounce_ms(250)
            .password("hunter2")
            .output_prefix("clean_")
            .build()
            .unwrap();
        assert_eq!(c.threshold.value(), 200);
        assert_eq!(c.preview_scale, 0.5);
        assert_eq!(c.export_scale, 3.0);
        assert_eq!(c.debounce_ms, 250);
        assert_eq!(c.password.as_deref(), Some("hunter2"));
        assert_eq!(c.output_prefix, "clean_");
    }

    #[test]
    fn rejects_non_positive_scale() {
        for bad in [0.0, -1.0, f32::NAN, 9.0] {
            let err = CleanConfig::builder().export_scale(bad).build().unwrap_err();
            assert!(matches!(err, PdfCleanError::InvalidConfig(_)), "{bad}");
        }
        assert!(CleanConfig::builder().preview_scale(0.0).build().is_err());
    }

    #[test]
    fn rejects_bad_prefix() {
        assert!(CleanConfig::builder().output_prefix("").build().is_err());
        assert!(CleanConfig::builder().output_prefix("../x-").build().is_err());
    }

    #[test]
    fn validate_catches_hand_built_config() {
        let c = CleanConfig {
            export_scale: 0.0,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(PdfCleanError::InvalidConfig(_))));
        assert!(CleanConfig::default().validate().is_ok());
    }

    #[test]
    fn debug_redacts_password() {
        let c = CleanConfig::builder().password("secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
