use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, SendError, TryRecvError};
use thiserror::Error;

/// Errors surfaced by the script bus channels and codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    #[error("channel disconnected")]
    Disconnected,

    #[error("channel is empty")]
    Empty,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("codec error: {0}")]
    Codec(String),
}

impl EventBusError {
    pub(crate) fn from_send_error<T>(_err: SendError<T>) -> Self {
        EventBusError::Disconnected
    }

    pub(crate) fn from_recv_timeout(err: RecvTimeoutError, timeout: Duration) -> Self {
        match err {
            RecvTimeoutError::Timeout => EventBusError::Timeout(timeout),
            RecvTimeoutError::Disconnected => EventBusError::Disconnected,
        }
    }

    pub(crate) fn from_try_recv_error(err: TryRecvError) -> Self {
        match err {
            TryRecvError::Empty => EventBusError::Empty,
            TryRecvError::Disconnected => EventBusError::Disconnected,
        }
    }

    /// True for the transient conditions a polling loop should simply retry on.
    pub fn is_transient(&self) -> bool {
        matches!(self, EventBusError::Empty | EventBusError::Timeout(_))
    }
}

impl From<serde_json::Error> for EventBusError {
    fn from(err: serde_json::Error) -> Self {
        EventBusError::Codec(err.to_string())
    }
}
