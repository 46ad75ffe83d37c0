use swc_core::common::Span;
use thiserror::Error;

/// Everything that can abort an instrumentation pass.
///
/// None of these are recoverable: a tree that failed once fails again, so the
/// caller gets either a complete output or one of these and nothing else.
#[derive(Debug, Error)]
pub enum InstrumentError {
    /// A synthesized subtree did not pass the validate-before-splice check.
    #[error("malformed synthesized {what}: {reason}")]
    Construction { what: &'static str, reason: String },

    /// The input tree lacks a shape the writer splices into.
    #[error("unexpected input shape at {span:?}: {what}")]
    InputShape { what: &'static str, span: Span },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to emit generated source")]
    Emit(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("malformed source map: {0}")]
    SourceMap(String),
}

impl InstrumentError {
    pub(crate) fn construction(what: &'static str, reason: impl Into<String>) -> Self {
        InstrumentError::Construction {
            what,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InstrumentError>;
