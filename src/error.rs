//! Error types for parsing, querying, and navigation.

use thiserror::Error;

/// Result type alias for xmlcursor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the crate.
///
/// Parse-time grammar failures carry a best-effort byte offset plus
/// line/column so a host can move a cursor to the failure point. None of
/// these are retried internally; the caller decides what to surface.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// Grammar-level failure from the underlying parser: mismatched tags,
    /// unterminated constructs, invalid characters, content outside the
    /// root element.
    #[error("{message} at line {line}, column {column} (offset {offset})")]
    Syntax {
        message: String,
        /// Byte offset of the failure in the fed text.
        offset: usize,
        /// 1-based line number (plus any caller-supplied line offset).
        line: u32,
        /// 1-based byte column within the line.
        column: u32,
    },

    /// Tree construction rejected an element or attribute name.
    #[error("malformed name: {message} at line {line}, column {column}")]
    MalformedName {
        message: String,
        line: u32,
        column: u32,
    },

    /// The XPath expression failed to parse; the query never ran.
    #[error("xpath compile error: {0}")]
    QueryCompile(String),

    /// The XPath expression failed at evaluation time (unknown prefix,
    /// undefined variable, wrong argument arity, type mismatch).
    #[error("xpath evaluation error: {0}")]
    QueryEvaluation(String),

    /// A navigation direction token that the boundary did not recognise.
    #[error("unknown direction {0:?}")]
    UnknownDirection(String),
}

impl Error {
    /// Build a syntax error from a message and a resolved source position.
    pub(crate) fn syntax(message: impl Into<String>, offset: usize, line: u32, column: u32) -> Self {
        Error::Syntax {
            message: message.into(),
            offset,
            line,
            column,
        }
    }
}
