//! Script bus: the message vocabulary and the two FIFO channels that connect a
//! trading host to a strategy script.

pub mod channel;
pub mod codec;
pub mod error;
pub mod message;

pub use channel::{
    channel, script_channels, EventPublishResult, EventReceiver, EventSender, HostEndpoint,
    ScriptEndpoint,
};
pub use codec::{decode, encode, Frame};
pub use error::EventBusError;
pub use message::{HostMessage, ScriptFailure, ScriptMessage, TickSnapshot};
