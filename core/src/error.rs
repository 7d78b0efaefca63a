//! Error types for the response-handling core.
//!
//! # Design
//! None of these escape `TypedRequest::handle_response`: a `ParseError` is
//! folded into a `client::general_error` fault before the outcome is built.
//! They are public so custom `ResponseParser` implementations and config
//! loaders can report failures with the same vocabulary.

use thiserror::Error;

use crate::parser::ResponseType;

/// Errors raised by a `ResponseParser` while turning an untyped value into a
/// typed one.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The value does not have the JSON shape the response type requires,
    /// e.g. an object was expected but an array arrived.
    #[error("{path}: expected {expected}, found {found}")]
    UnexpectedShape {
        path: String,
        expected: ResponseType,
        found: &'static str,
    },

    /// The value declares an `objectType` other than the configured subtype
    /// and strict object type checking is enabled.
    #[error("{path}: expected object type '{expected}', found '{found}'")]
    ObjectTypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// The value has the right shape but serde could not build the target type.
    #[error("{path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while loading a `ClientConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config document: {0}")]
    Json(#[from] serde_json::Error),

    /// An environment variable held something other than a boolean.
    #[error("{var}: expected a boolean, got '{value}'")]
    InvalidBool { var: &'static str, value: String },
}
