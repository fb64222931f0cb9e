use std::error::Error as StdError;
use std::path::PathBuf;

use pmm_core::CoreError;
use script_bus::EventBusError;
use thiserror::Error;

/// Errors raised while loading, driving or running a strategy script.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("failed to read script manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("script manifest {0} declares no entry point")]
    NoEntryPoint(PathBuf),

    #[error(
        "script manifest {path} declares {} entry points ({}); exactly one is required",
        .names.len(),
        .names.join(", ")
    )]
    AmbiguousEntryPoint { path: PathBuf, names: Vec<String> },

    #[error("no script registered under `{0}`")]
    UnknownScript(String),

    #[error("a script is already registered under `{0}`")]
    DuplicateRegistration(String),

    #[error("invalid settings for script `{name}`: {reason}")]
    Settings { name: String, reason: String },

    #[error("live updates need a running tokio runtime")]
    NoRuntime,

    #[error("script runner failed: {0}")]
    Runner(String),

    #[error("{0}")]
    Hook(String),

    #[error(transparent)]
    Parameter(#[from] CoreError),

    #[error(transparent)]
    Bus(#[from] EventBusError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScriptError {
    /// Convenience for script authors: fail a hook with a message.
    pub fn hook(message: impl Into<String>) -> Self {
        ScriptError::Hook(message.into())
    }

    /// Renders the error's cause chain (and backtrace, when one was captured).
    pub fn trace(&self) -> String {
        if let ScriptError::Other(err) = self {
            return format!("{err:?}");
        }

        let mut lines = Vec::new();
        let mut source = StdError::source(self);
        while let Some(cause) = source {
            lines.push(format!("Caused by: {cause}"));
            source = cause.source();
        }
        lines.join("\n")
    }
}

/// Type alias for script results
pub type ScriptResult<T> = Result<T, ScriptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_entry_point_message() {
        let err = ScriptError::AmbiguousEntryPoint {
            path: PathBuf::from("scripts/mm.toml"),
            names: vec!["a".into(), "b".into()],
        };
        assert_eq!(
            err.to_string(),
            "script manifest scripts/mm.toml declares 2 entry points (a, b); exactly one is required"
        );
    }

    #[test]
    fn test_trace_of_anyhow_error_lists_context() {
        let err: ScriptError = anyhow::anyhow!("socket closed")
            .context("fetching funding rate")
            .into();
        let trace = err.trace();
        assert!(trace.contains("fetching funding rate"));
        assert!(trace.contains("socket closed"));
    }

    #[test]
    fn test_trace_of_plain_hook_error_is_empty() {
        assert_eq!(ScriptError::hook("bad spread").trace(), "");
    }
}
