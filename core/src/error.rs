//! Core error types
//!
//! Errors raised while resolving or validating strategy parameters.

use thiserror::Error;

use crate::parameters::ParameterKind;

/// Errors produced by the shared domain types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("strategy has no parameter named `{0}`")]
    UnknownParameter(String),

    #[error("parameter `{name}` expects a {expected} value, got {actual}")]
    TypeMismatch {
        name: &'static str,
        expected: ParameterKind,
        actual: ParameterKind,
    },
}

/// Type alias for core results
pub type CoreResult<T> = Result<T, CoreError>;
