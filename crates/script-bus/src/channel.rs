use std::fmt;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::EventBusError;
use crate::message::{HostMessage, ScriptMessage};

/// Result alias for publishing messages onto a channel.
pub type EventPublishResult = Result<(), EventBusError>;

/// Sender half of an unbounded FIFO channel.
#[derive(Clone)]
pub struct EventSender<T: Send + 'static> {
    inner: Sender<T>,
}

impl<T: Send + 'static> EventSender<T> {
    fn new(inner: Sender<T>) -> Self {
        Self { inner }
    }

    /// Queues a message. Never blocks; fails only once the receiver is gone.
    pub fn send(&self, message: T) -> EventPublishResult {
        self.inner
            .send(message)
            .map_err(EventBusError::from_send_error)
    }
}

impl<T: Send + 'static> fmt::Debug for EventSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender")
            .field("queued", &self.inner.len())
            .finish_non_exhaustive()
    }
}

/// Receiver wrapper. Deliberately not `Clone`: each direction has one consumer.
pub struct EventReceiver<T: Send + 'static> {
    inner: Receiver<T>,
}

impl<T: Send + 'static> EventReceiver<T> {
    fn new(inner: Receiver<T>) -> Self {
        Self { inner }
    }

    /// Receives synchronously with timeout semantics.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, EventBusError> {
        self.inner
            .recv_timeout(timeout)
            .map_err(|err| EventBusError::from_recv_timeout(err, timeout))
    }

    /// Attempts to receive without blocking.
    pub fn try_recv(&self) -> Result<T, EventBusError> {
        self.inner
            .try_recv()
            .map_err(EventBusError::from_try_recv_error)
    }

    /// Drains everything currently queued, in FIFO order, without blocking.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        self.inner.try_iter()
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T: Send + 'static> fmt::Debug for EventReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventReceiver")
            .field("queued", &self.inner.len())
            .finish_non_exhaustive()
    }
}

/// Creates one unbounded FIFO channel.
pub fn channel<T: Send + 'static>() -> (EventSender<T>, EventReceiver<T>) {
    let (tx, rx) = unbounded();
    (EventSender::new(tx), EventReceiver::new(rx))
}

/// Host half of a bridge: writes to the script, reads what the script sends back.
#[derive(Debug)]
pub struct HostEndpoint {
    pub to_script: EventSender<HostMessage>,
    pub from_script: EventReceiver<ScriptMessage>,
}

/// Script half of a bridge: reads host messages, writes calls and reports back.
#[derive(Debug)]
pub struct ScriptEndpoint {
    pub inbound: EventReceiver<HostMessage>,
    pub outbound: EventSender<ScriptMessage>,
}

/// Allocates the two unbounded channels between host and script and splits
/// them into the two endpoints.
pub fn script_channels() -> (HostEndpoint, ScriptEndpoint) {
    let (to_script, inbound) = channel();
    let (outbound, from_script) = channel();
    (
        HostEndpoint {
            to_script,
            from_script,
        },
        ScriptEndpoint { inbound, outbound },
    )
}
