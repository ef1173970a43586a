//! Reveal configuration - per-effect defaults loadable from TOML.
//!
//! Every field is optional; missing tables and keys fall back to the
//! built-in defaults:
//!
//! ```toml
//! [typewriter]
//! threshold = 0.5
//! interval_ms = 150
//! cursor_fps = 2
//!
//! [progress]
//! threshold = 0.5
//! duration_ms = 1500
//!
//! [reveal]
//! threshold = 0.2
//! duration_ms = 800
//! offset = 50.0
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RevealError;

/// Defaults for every reveal effect.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    pub typewriter: TypewriterConfig,
    pub progress: ProgressConfig,
    pub reveal: RevealBlockConfig,
}

/// Typewriter defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypewriterConfig {
    /// Visible fraction that starts typing.
    pub threshold: f32,
    /// Delay between characters.
    pub interval_ms: u64,
    /// Cursor blink rate. 0 disables the cursor.
    pub cursor_fps: u8,
}

impl Default for TypewriterConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            interval_ms: 150,
            cursor_fps: 2,
        }
    }
}

impl TypewriterConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Progress bar defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub threshold: f32,
    /// Length of the fill transition.
    pub duration_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            duration_ms: 1500,
        }
    }
}

impl ProgressConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Fade/slide wrapper defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealBlockConfig {
    pub threshold: f32,
    pub duration_ms: u64,
    /// Starting vertical offset of hidden content.
    pub offset: f32,
}

impl Default for RevealBlockConfig {
    fn default() -> Self {
        Self {
            threshold: 0.2,
            duration_ms: 800,
            offset: 50.0,
        }
    }
}

impl RevealBlockConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl RevealConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, RevealError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from disk.
    ///
    /// A missing file is not an error: the defaults are returned.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RevealError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No reveal config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| RevealError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;

        tracing::info!("Reveal config loaded from {:?}", path);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RevealConfig::default();
        assert_eq!(config.typewriter.threshold, 0.5);
        assert_eq!(config.typewriter.interval(), Duration::from_millis(150));
        assert_eq!(config.progress.duration(), Duration::from_millis(1500));
        assert_eq!(config.reveal.threshold, 0.2);
        assert_eq!(config.reveal.offset, 50.0);
    }

    #[test]
    fn test_partial_toml() {
        let config = RevealConfig::from_toml_str(
            r#"
            [typewriter]
            interval_ms = 100

            [reveal]
            threshold = 0.35
            "#,
        )
        .unwrap();

        assert_eq!(config.typewriter.interval_ms, 100);
        assert_eq!(config.typewriter.cursor_fps, 2);
        assert_eq!(config.reveal.threshold, 0.35);
        assert_eq!(config.reveal.duration_ms, 800);
        assert_eq!(config.progress, ProgressConfig::default());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(RevealConfig::from_toml_str("").unwrap(), RevealConfig::default());
    }

    #[test]
    fn test_bad_toml() {
        let err = RevealConfig::from_toml_str("[progress]\nduration_ms = \"slow\"").unwrap_err();
        assert!(matches!(err, RevealError::ConfigParse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let config = RevealConfig::load("/definitely/not/here/reveal.toml").unwrap();
        assert_eq!(config, RevealConfig::default());
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("spark-reveal-{}.toml", std::process::id()));
        fs::write(&path, "[progress]\nduration_ms = 900\n").unwrap();

        let config = RevealConfig::load(&path).unwrap();
        assert_eq!(config.progress.duration_ms, 900);

        let _ = fs::remove_file(&path);
    }
}
