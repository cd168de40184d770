//! Error taxonomy shared by every promptgate layer.
//!
//! There is no partial-failure mode: any of these aborts the whole
//! evaluation and yields no decision. Collaborators map them to a
//! BLOCK-shaped error envelope for machine consumers.

use thiserror::Error;

/// Malformed or inconsistent configuration. Fatal, never retried; the
/// message names the offending key path verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigValidationError(pub String);

impl ConfigValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Malformed evaluation input: missing required fields, a bad combined
/// document, or options that are invalid for the requested mode.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InputValidationError(pub String);

impl InputValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Any failure that aborts an evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Config(#[from] ConfigValidationError),
    #[error(transparent)]
    Input(#[from] InputValidationError),
}
