//! Error type shared by the builder, the decoder glue and the adapter.

use thiserror::Error;

use crate::value::Value;

/// Errors produced while decoding into a shaped destination.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The destination or its shape cannot be decoded into.
    #[error("invalid decode target: {0}")]
    Usage(String),
    /// The input is not well-formed JSON, or does not fit the shape.
    #[error(transparent)]
    Syntax(#[from] serde_json::Error),
    /// An identifier leaf held text the active options do not tolerate.
    #[error("invalid identifier {text:?}: {source}")]
    IdentifierFormat {
        text: String,
        #[source]
        source: uuid::Error,
    },
    /// A copy function met a value its shape rules out.
    #[error("internal inconsistency: {0}")]
    InternalConsistency(String),
}

impl DecodeError {
    pub(crate) fn unexpected(expected: &str, found: &Value) -> Self {
        Self::InternalConsistency(format!("expected {expected}, found {}", found.kind()))
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }

    pub fn is_identifier_format(&self) -> bool {
        matches!(self, Self::IdentifierFormat { .. })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::InternalConsistency(_))
    }
}
