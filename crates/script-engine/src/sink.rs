//! Host sink
//!
//! The host engine as seen from the bridge. Script-originated calls are
//! delivered here after being drained from the script -> host channel.

use std::sync::Arc;

use metrics::counter;
use parking_lot::{Mutex, RwLock};
use pmm_core::ParameterChange;
use script_bus::ScriptMessage;
use tracing::{error, info, warn};

/// Latest live status line rendered by the script.
pub type LiveTextCell = Arc<RwLock<Option<String>>>;

/// Callbacks into the trading host.
pub trait HostSink: Send + Sync {
    /// User-facing notification
    fn notify(&self, message: &str);

    fn log(&self, message: &str);

    fn send_image(&self, reference: &str);

    /// Stop the strategy. The script gets no acknowledgement.
    fn request_stop(&self, reason: &str);

    fn force_order_refresh(&self);

    /// Apply a script-side parameter write to the authoritative strategy.
    fn apply_parameter(&self, change: &ParameterChange);

    /// Display a live status line.
    fn set_live_text(&self, text: &str);

    /// The script finished handling a refresh notice.
    fn order_refresh_complete(&self) {}
}

/// Routes one script message to the sink.
pub fn deliver(message: ScriptMessage, sink: &dyn HostSink, live_text: &LiveTextCell) {
    counter!(
        "script_bridge_messages_total",
        1,
        "direction" => "delivered",
        "kind" => message.kind()
    );

    match message {
        ScriptMessage::Notify(text) => sink.notify(&text),
        ScriptMessage::Log(text) => sink.log(&text),
        ScriptMessage::SendImage(reference) => sink.send_image(&reference),
        ScriptMessage::Stop(reason) => {
            info!(reason = %reason, "script requested strategy stop");
            sink.request_stop(&reason);
        }
        ScriptMessage::ForceRefresh => sink.force_order_refresh(),
        ScriptMessage::ParameterChanged(change) => {
            info!(change = %change, "script changed strategy parameter");
            sink.apply_parameter(&change);
        }
        ScriptMessage::StatusReport(text) => {
            if !text.is_empty() {
                sink.notify(&text);
            }
        }
        ScriptMessage::LiveText(text) => *live_text.write() = Some(text),
        ScriptMessage::OrderRefreshComplete => sink.order_refresh_complete(),
        ScriptMessage::Error(failure) => {
            error!(hook = %failure.hook, cause = %failure.cause, "script failure reported");
            sink.notify(&failure.to_string());
        }
        ScriptMessage::Unrecognized(kind) => {
            warn!(kind = %kind, "discarding unrecognized script message");
        }
    }
}

/// Everything a [`RecordingSink`] was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Notify(String),
    Log(String),
    Image(String),
    Stop(String),
    ForceRefresh,
    Parameter(ParameterChange),
    LiveText(String),
    RefreshComplete,
}

/// A sink that records calls in order, for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<SinkEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Notification texts only, in order.
    pub fn notifications(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Notify(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: SinkEvent) {
        self.events.lock().push(event);
    }
}

impl HostSink for RecordingSink {
    fn notify(&self, message: &str) {
        self.record(SinkEvent::Notify(message.to_string()));
    }

    fn log(&self, message: &str) {
        self.record(SinkEvent::Log(message.to_string()));
    }

    fn send_image(&self, reference: &str) {
        self.record(SinkEvent::Image(reference.to_string()));
    }

    fn request_stop(&self, reason: &str) {
        self.record(SinkEvent::Stop(reason.to_string()));
    }

    fn force_order_refresh(&self) {
        self.record(SinkEvent::ForceRefresh);
    }

    fn apply_parameter(&self, change: &ParameterChange) {
        self.record(SinkEvent::Parameter(change.clone()));
    }

    fn set_live_text(&self, text: &str) {
        self.record(SinkEvent::LiveText(text.to_string()));
    }

    fn order_refresh_complete(&self) {
        self.record(SinkEvent::RefreshComplete);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmm_core::{ParameterName, ParameterValue};
    use script_bus::ScriptFailure;

    #[test]
    fn test_delivery_routes_each_kind() {
        let sink = RecordingSink::new();
        let live = LiveTextCell::default();
        let change = ParameterChange::new(ParameterName::BuyLevels, ParameterValue::Integer(0));

        for message in [
            ScriptMessage::Notify("hi".into()),
            ScriptMessage::Stop("done".into()),
            ScriptMessage::ParameterChanged(change.clone()),
            ScriptMessage::StatusReport(String::new()),
            ScriptMessage::LiveText("mid 100".into()),
            ScriptMessage::Unrecognized("beep".into()),
            ScriptMessage::Error(ScriptFailure::new("on_tick", "boom", "")),
        ] {
            deliver(message, &sink, &live);
        }

        assert_eq!(
            sink.events(),
            vec![
                SinkEvent::Notify("hi".into()),
                SinkEvent::Stop("done".into()),
                SinkEvent::Parameter(change),
                SinkEvent::Notify("Script error in on_tick: boom".into()),
            ]
        );
        assert_eq!(live.read().as_deref(), Some("mid 100"));
    }
}
