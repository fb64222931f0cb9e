//! Script instance
//!
//! Owns a loaded script together with its context and turns host messages
//! into hook calls. Failures inside hooks stop here: they are reported as
//! `Error` messages and the instance stays ready for the next message.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use metrics::counter;
use script_bus::{EventSender, HostMessage, ScriptFailure, ScriptMessage};
use tracing::{debug, error, info, warn};

use crate::config::RuntimeConfig;
use crate::context::ScriptContext;
use crate::error::ScriptResult;
use crate::script::Script;

/// Whether the receiving loop keeps going after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

pub struct ScriptInstance {
    script: Box<dyn Script>,
    ctx: ScriptContext,
    live_interval: Duration,
    last_live_render: Option<Instant>,
}

impl ScriptInstance {
    pub fn new(
        script: Box<dyn Script>,
        outbox: EventSender<ScriptMessage>,
        config: &RuntimeConfig,
    ) -> Self {
        Self {
            script,
            ctx: ScriptContext::new(outbox, config.mid_price_history),
            live_interval: config.live_interval,
            last_live_render: None,
        }
    }

    pub fn name(&self) -> &str {
        self.script.name()
    }

    pub fn context(&self) -> &ScriptContext {
        &self.ctx
    }

    /// Processes one host message.
    pub fn handle(&mut self, message: HostMessage) -> Flow {
        counter!(
            "script_bridge_messages_total",
            1,
            "direction" => "inbound",
            "kind" => message.kind()
        );
        debug!(kind = message.kind(), "script received message");

        match message {
            HostMessage::Start(market_info) => {
                info!(market = %market_info, "script attached to market");
                self.ctx.set_market_info(market_info);
            }
            HostMessage::Tick(snapshot) => {
                self.ctx.apply_tick(snapshot);
                self.guard("on_tick", |script, ctx| script.on_tick(ctx));
            }
            HostMessage::StatusRequest => {
                if let Some(text) = self.render_status() {
                    self.ctx.emit(ScriptMessage::StatusReport(text));
                }
            }
            HostMessage::CommandRequest { cmd, args } => {
                self.guard("on_command", |script, ctx| script.on_command(ctx, &cmd, &args));
            }
            HostMessage::RefreshNotice => {
                self.guard("on_order_refresh", |script, ctx| script.on_order_refresh(ctx));
                self.ctx.emit(ScriptMessage::OrderRefreshComplete);
            }
            HostMessage::OrderFilled(event) => {
                self.guard("on_order_filled", |script, ctx| {
                    script.on_order_filled(ctx, &event)
                });
            }
            HostMessage::BuyOrderCompleted(event) => {
                self.guard("on_buy_order_completed", |script, ctx| {
                    script.on_buy_order_completed(ctx, &event)
                });
            }
            HostMessage::SellOrderCompleted(event) => {
                self.guard("on_sell_order_completed", |script, ctx| {
                    script.on_sell_order_completed(ctx, &event)
                });
            }
            HostMessage::FundingPaymentCompleted(event) => {
                self.guard("on_funding_payment_completed", |script, ctx| {
                    script.on_funding_payment_completed(ctx, &event)
                });
            }
            HostMessage::LiveUpdates(enabled) => {
                self.ctx.set_live_updates(enabled);
                self.last_live_render = None;
            }
            HostMessage::ParameterChanged(change) => {
                if let Err(err) = self.ctx.parameters_mut().apply(&change) {
                    warn!(change = %change, error = %err, "ignoring invalid parameter push");
                }
            }
            HostMessage::Shutdown => return Flow::Shutdown,
            HostMessage::Unrecognized(kind) => {
                warn!(kind = %kind, "discarding unrecognized host message");
            }
        }
        Flow::Continue
    }

    /// Emits `LiveText` when live updates are on and the cadence has elapsed.
    pub fn render_live_if_due(&mut self, now: Instant) {
        if !self.ctx.live_updates() {
            return;
        }
        if let Some(last) = self.last_live_render {
            if now.saturating_duration_since(last) < self.live_interval {
                return;
            }
        }

        self.last_live_render = Some(now);
        if let Some(text) = self.render_status() {
            self.ctx.emit(ScriptMessage::LiveText(text));
        }
    }

    fn render_status(&mut self) -> Option<String> {
        self.guard("on_status", |script, ctx| script.on_status(ctx))
            .flatten()
            .filter(|text| !text.is_empty())
    }

    fn guard<T, F>(&mut self, hook: &'static str, f: F) -> Option<T>
    where
        F: FnOnce(&mut dyn Script, &mut ScriptContext) -> ScriptResult<T>,
    {
        let script = self.script.as_mut();
        let ctx = &mut self.ctx;
        let failure = match panic::catch_unwind(AssertUnwindSafe(|| f(script, ctx))) {
            Ok(Ok(value)) => return Some(value),
            Ok(Err(err)) => ScriptFailure::new(hook, err.to_string(), err.trace()),
            Err(payload) => ScriptFailure::new(
                hook,
                panic_message(payload.as_ref()),
                format!("panicked while running `{hook}`"),
            ),
        };

        error!(
            script = self.script.name(),
            hook,
            cause = %failure.cause,
            "script hook failed"
        );
        counter!("script_errors_total", 1, "hook" => hook);
        self.ctx.emit(ScriptMessage::Error(failure));
        None
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "script panicked".to_string()
    }
}
