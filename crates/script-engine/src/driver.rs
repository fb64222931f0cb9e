//! Host-side driver interface shared by both scheduling models.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use pmm_core::{
    BuyOrderCompletedEvent, FundingPaymentCompletedEvent, MarketInfo, OrderFilledEvent,
    ParameterChange, SellOrderCompletedEvent,
};
use script_bus::{
    EventReceiver, EventSender, HostEndpoint, HostMessage, ScriptMessage, TickSnapshot,
};
use tracing::{debug, info};

use crate::error::ScriptResult;
use crate::live::LiveUpdates;
use crate::sink::{deliver, HostSink, LiveTextCell};

/// Command reserved for toggling live updates. Never reaches the script.
pub const LIVE_COMMAND: &str = "live";

/// Notice sent when a command arrives with no script loaded.
pub const NO_SCRIPT_NOTICE: &str = "No script is active, command ignored";

/// The host's end of a bridge: channels, sink and live updates.
pub struct HostLink {
    to_script: EventSender<HostMessage>,
    from_script: EventReceiver<ScriptMessage>,
    sink: Arc<dyn HostSink>,
    live_text: LiveTextCell,
    live: LiveUpdates,
}

impl HostLink {
    pub fn new(endpoint: HostEndpoint, sink: Arc<dyn HostSink>, live_interval: Duration) -> Self {
        let HostEndpoint {
            to_script,
            from_script,
        } = endpoint;
        let live_text = LiveTextCell::default();

        let render_text = Arc::clone(&live_text);
        let toggle_text = Arc::clone(&live_text);
        let toggle_script = to_script.clone();
        let live = LiveUpdates::new(
            Arc::clone(&sink),
            live_interval,
            Arc::new(move || render_text.read().clone()),
            Arc::new(move |enabled| {
                if !enabled {
                    *toggle_text.write() = None;
                }
                if let Err(err) = toggle_script.send(HostMessage::LiveUpdates(enabled)) {
                    debug!(error = %err, "script gone, live flag not delivered");
                }
            }),
        );

        Self {
            to_script,
            from_script,
            sink,
            live_text,
            live,
        }
    }

    pub fn sink(&self) -> &Arc<dyn HostSink> {
        &self.sink
    }

    pub fn live(&self) -> &LiveUpdates {
        &self.live
    }

    /// The most recent live line rendered by the script
    pub fn live_text(&self) -> Option<String> {
        self.live_text.read().clone()
    }

    pub fn send(&self, message: HostMessage) -> ScriptResult<()> {
        counter!(
            "script_bridge_messages_total",
            1,
            "direction" => "inbound",
            "kind" => message.kind()
        );
        self.to_script.send(message)?;
        Ok(())
    }

    /// Delivers every queued script message to the sink.
    pub fn pump(&self) -> usize {
        let mut delivered = 0;
        for message in self.from_script.drain() {
            deliver(message, self.sink.as_ref(), &self.live_text);
            delivered += 1;
        }
        delivered
    }
}

/// Lifecycle and event forwarding for one attached script.
pub trait ScriptDriver {
    fn link(&self) -> &HostLink;

    /// Whether a script is loaded and running.
    fn is_active(&self) -> bool;

    /// Hands one message to the script. Dropped silently when none is loaded.
    fn forward(&mut self, message: HostMessage) -> ScriptResult<()>;

    /// Delivers pending script output to the host sink.
    fn pump(&mut self) -> usize;

    /// Ends the script with `Shutdown` and releases it.
    fn shutdown(&mut self) -> ScriptResult<()>;

    fn start(&mut self, market_info: MarketInfo) -> ScriptResult<()> {
        self.forward(HostMessage::Start(market_info))
    }

    fn tick(&mut self, snapshot: TickSnapshot) -> ScriptResult<()> {
        self.forward(HostMessage::Tick(snapshot))
    }

    fn order_filled(&mut self, event: OrderFilledEvent) -> ScriptResult<()> {
        self.forward(HostMessage::OrderFilled(event))
    }

    fn buy_order_completed(&mut self, event: BuyOrderCompletedEvent) -> ScriptResult<()> {
        self.forward(HostMessage::BuyOrderCompleted(event))
    }

    fn sell_order_completed(&mut self, event: SellOrderCompletedEvent) -> ScriptResult<()> {
        self.forward(HostMessage::SellOrderCompleted(event))
    }

    fn funding_payment_completed(
        &mut self,
        event: FundingPaymentCompletedEvent,
    ) -> ScriptResult<()> {
        self.forward(HostMessage::FundingPaymentCompleted(event))
    }

    /// Announces an order refresh; the script acknowledges it.
    fn order_refresh(&mut self) -> ScriptResult<()> {
        self.forward(HostMessage::RefreshNotice)
    }

    /// Pushes a host-side parameter edit into the script's mirror.
    fn push_parameter(&mut self, change: ParameterChange) -> ScriptResult<()> {
        self.forward(HostMessage::ParameterChanged(change))
    }

    /// Asks for a status line; a non-empty answer reaches the host's notifications.
    fn status(&mut self) -> ScriptResult<()> {
        self.forward(HostMessage::StatusRequest)
    }

    /// Handles a user command. `live` toggles live updates here on the host.
    fn command(&mut self, cmd: &str, args: Vec<String>) -> ScriptResult<()> {
        if !self.is_active() {
            self.link().sink().notify(NO_SCRIPT_NOTICE);
            return Ok(());
        }

        if cmd == LIVE_COMMAND {
            let enabled = self.link().live().toggle()?;
            info!(enabled, "toggled script live updates");
            return Ok(());
        }

        self.forward(HostMessage::command(cmd, args))
    }
}
