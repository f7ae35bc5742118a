use thiserror::Error;

use crate::event::Mark;

/// Errors from event encoding and decoding.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid event type '{0}'")]
    InvalidKind(String),

    #[error("no type field in event table")]
    MissingKind,

    #[error("invalid {what} '{value}'")]
    InvalidOption { what: &'static str, value: String },

    #[error("{context} missing key '{key}'")]
    MissingField {
        context: &'static str,
        key: &'static str,
    },

    #[error("{0}")]
    EngineFailure(String),

    #[error("{problem} at document: {document}{at}", at = location(.mark))]
    DecodeFailure {
        problem: String,
        document: usize,
        mark: Option<Mark>,
    },

    #[error("{0}")]
    InternalInconsistency(String),
}

impl Error {
    /// True for engine/binding mismatches rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::InternalInconsistency(_))
    }

    pub(crate) fn invalid_option(what: &'static str, value: impl Into<String>) -> Self {
        Error::InvalidOption {
            what,
            value: value.into(),
        }
    }

    pub(crate) fn missing(context: &'static str, key: &'static str) -> Self {
        Error::MissingField { context, key }
    }
}

fn location(mark: &Option<Mark>) -> String {
    match mark {
        Some(mark) => format!(", line: {}, column: {}", mark.line + 1, mark.column + 1),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
