//! Error types for the fallible edges of the crate.
//!
//! Engines never return errors to their host: a bad input degrades the
//! effect instead. `RevealError` only surfaces from parsing helpers and
//! configuration loading.

use std::path::PathBuf;

/// Errors produced while parsing reveal inputs or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum RevealError {
    /// A progress target could not be read as a percentage in `[0, 100]`.
    #[error("invalid percentage {0:?}: expected a value between 0 and 100")]
    InvalidPercentage(String),

    /// The configuration file could not be read.
    #[error("failed to read config {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration contents are not valid TOML for [`crate::RevealConfig`].
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = RevealError::InvalidPercentage("abc".into());
        assert_eq!(
            err.to_string(),
            "invalid percentage \"abc\": expected a value between 0 and 100"
        );

        let err = RevealError::ConfigIo {
            path: PathBuf::from("missing.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("missing.toml"));
    }
}
