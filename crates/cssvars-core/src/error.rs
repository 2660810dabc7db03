//! Error types for cssvars-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::expr::ReferenceError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors surfaced by the registry, the sinks and config loading.
#[derive(Debug, Error)]
pub enum Error {
    /// `apply_theme` was called with a name that was never defined.
    #[error("theme '{0}' is not defined")]
    UndefinedTheme(String),

    /// A computed value was requested from a sink with no rendering surface.
    #[error("no rendering context available to compute '{0}'")]
    MissingContext(String),

    /// The document has no element with this id.
    #[error("element '{0}' does not exist in the document")]
    UnknownElement(String),

    /// A value embedded a `CssVars.get(...)` call that could not be parsed.
    #[error(transparent)]
    MalformedReference(#[from] ReferenceError),

    /// A responsive definition had no breakpoints at all.
    #[error("breakpoint map has no entries")]
    EmptyBreakpoints,

    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration:\n  {}", .0.join("\n  "))]
    ConfigValidation(Vec<String>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_message() {
        let err = Error::ConfigValidation(vec!["a: bad".to_string(), "b: worse".to_string()]);
        let text = err.to_string();
        assert!(text.contains("a: bad"));
        assert!(text.contains("b: worse"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_undefined_theme_message() {
        let err = Error::UndefinedTheme("dusk".to_string());
        assert_eq!(err.to_string(), "theme 'dusk' is not defined");
    }
}
