//! Error types for mailpress operations

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for mailpress operations
#[derive(Debug, Error)]
pub enum MailpressError {
    /// The input could not be parsed as an HTML document at all
    #[error("HTML parse error: {0}")]
    HtmlParse(String),

    /// A selector failed to parse or match; callers catch this per rule
    /// and skip the rule rather than aborting the document
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    /// CLI file read/write failure, reported with the offending path
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MailpressError {
    /// Build a selector error from the selector text and a reason
    pub fn selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Selector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience Result type for mailpress operations
pub type Result<T> = std::result::Result<T, MailpressError>;
