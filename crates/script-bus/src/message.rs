//! Message vocabulary exchanged across the bridge
//!
//! Two closed enums, one per direction. Each message is consumed exactly once
//! by the receiving side. `HostMessage::Shutdown` is the sentinel that ends the
//! script's receive loop.

use chrono::{DateTime, Utc};
use pmm_core::{
    ActiveOrder, ActivePosition, Balances, BuyOrderCompletedEvent, FundingPaymentCompletedEvent,
    MarketInfo, OrderFilledEvent, ParameterChange, ParameterValues, SellOrderCompletedEvent,
    TradeEvent,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Periodic state snapshot delivered to the script once per host tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub timestamp: DateTime<Utc>,
    pub mid_price: Decimal,
    pub parameters: ParameterValues,
    #[serde(default)]
    pub total_balances: Balances,
    #[serde(default)]
    pub available_balances: Balances,
    #[serde(default)]
    pub orders: Vec<ActiveOrder>,

    /// Public trades recorded since the previous tick
    #[serde(default)]
    pub trades: Vec<TradeEvent>,
    #[serde(default)]
    pub positions: Vec<ActivePosition>,
}

impl TickSnapshot {
    pub fn new(timestamp: DateTime<Utc>, mid_price: Decimal, parameters: ParameterValues) -> Self {
        Self {
            timestamp,
            mid_price,
            parameters,
            total_balances: Balances::new(),
            available_balances: Balances::new(),
            orders: Vec::new(),
            trades: Vec::new(),
            positions: Vec::new(),
        }
    }

    pub fn with_balances(mut self, total: Balances, available: Balances) -> Self {
        self.total_balances = total;
        self.available_balances = available;
        self
    }

    pub fn with_orders(mut self, orders: Vec<ActiveOrder>) -> Self {
        self.orders = orders;
        self
    }

    pub fn with_trades(mut self, trades: Vec<TradeEvent>) -> Self {
        self.trades = trades;
        self
    }

    pub fn with_positions(mut self, positions: Vec<ActivePosition>) -> Self {
        self.positions = positions;
        self
    }
}

/// Messages flowing from the host engine to the script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum HostMessage {
    Start(MarketInfo),
    Tick(TickSnapshot),
    StatusRequest,
    CommandRequest {
        cmd: String,
        args: Vec<String>,
    },
    RefreshNotice,
    OrderFilled(OrderFilledEvent),
    BuyOrderCompleted(BuyOrderCompletedEvent),
    SellOrderCompleted(SellOrderCompletedEvent),
    FundingPaymentCompleted(FundingPaymentCompletedEvent),
    LiveUpdates(bool),
    ParameterChanged(ParameterChange),
    Shutdown,

    /// A decoded frame whose kind this build does not know; carries the kind.
    #[serde(skip)]
    Unrecognized(String),
}

impl HostMessage {
    /// Wire kinds this build understands.
    pub const KINDS: &'static [&'static str] = &[
        "start",
        "tick",
        "status_request",
        "command_request",
        "refresh_notice",
        "order_filled",
        "buy_order_completed",
        "sell_order_completed",
        "funding_payment_completed",
        "live_updates",
        "parameter_changed",
        "shutdown",
    ];

    pub fn kind(&self) -> &'static str {
        match self {
            HostMessage::Start(_) => "start",
            HostMessage::Tick(_) => "tick",
            HostMessage::StatusRequest => "status_request",
            HostMessage::CommandRequest { .. } => "command_request",
            HostMessage::RefreshNotice => "refresh_notice",
            HostMessage::OrderFilled(_) => "order_filled",
            HostMessage::BuyOrderCompleted(_) => "buy_order_completed",
            HostMessage::SellOrderCompleted(_) => "sell_order_completed",
            HostMessage::FundingPaymentCompleted(_) => "funding_payment_completed",
            HostMessage::LiveUpdates(_) => "live_updates",
            HostMessage::ParameterChanged(_) => "parameter_changed",
            HostMessage::Shutdown => "shutdown",
            HostMessage::Unrecognized(_) => "unrecognized",
        }
    }

    pub fn command(cmd: impl Into<String>, args: Vec<String>) -> Self {
        HostMessage::CommandRequest {
            cmd: cmd.into(),
            args,
        }
    }
}

/// An uncaught failure inside a script hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptFailure {
    /// Hook that was running, e.g. "on_tick"
    pub hook: String,
    pub cause: String,
    pub trace: String,
}

impl ScriptFailure {
    pub fn new(
        hook: impl Into<String>,
        cause: impl Into<String>,
        trace: impl Into<String>,
    ) -> Self {
        Self {
            hook: hook.into(),
            cause: cause.into(),
            trace: trace.into(),
        }
    }
}

impl fmt::Display for ScriptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script error in {}: {}", self.hook, self.cause)?;
        if !self.trace.is_empty() {
            write!(f, "\nTrace back: {}", self.trace)?;
        }
        Ok(())
    }
}

/// Messages flowing from the script back to the host engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum ScriptMessage {
    Notify(String),
    Log(String),
    SendImage(String),
    Stop(String),
    ForceRefresh,
    ParameterChanged(ParameterChange),
    StatusReport(String),
    LiveText(String),
    OrderRefreshComplete,
    Error(ScriptFailure),

    /// A decoded frame whose kind this build does not know; carries the kind.
    #[serde(skip)]
    Unrecognized(String),
}

impl ScriptMessage {
    /// Wire kinds this build understands.
    pub const KINDS: &'static [&'static str] = &[
        "notify",
        "log",
        "send_image",
        "stop",
        "force_refresh",
        "parameter_changed",
        "status_report",
        "live_text",
        "order_refresh_complete",
        "error",
    ];

    pub fn kind(&self) -> &'static str {
        match self {
            ScriptMessage::Notify(_) => "notify",
            ScriptMessage::Log(_) => "log",
            ScriptMessage::SendImage(_) => "send_image",
            ScriptMessage::Stop(_) => "stop",
            ScriptMessage::ForceRefresh => "force_refresh",
            ScriptMessage::ParameterChanged(_) => "parameter_changed",
            ScriptMessage::StatusReport(_) => "status_report",
            ScriptMessage::LiveText(_) => "live_text",
            ScriptMessage::OrderRefreshComplete => "order_refresh_complete",
            ScriptMessage::Error(_) => "error",
            ScriptMessage::Unrecognized(_) => "unrecognized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmm_core::{ParameterName, ParameterValue};
    use rust_decimal_macros::dec;

    #[test]
    fn test_kind_matches_serialized_tag() {
        let messages = vec![
            HostMessage::Start(MarketInfo::new("binance", "ETH-USDT")),
            HostMessage::Tick(TickSnapshot::new(
                Utc::now(),
                dec!(100),
                ParameterValues::new(),
            )),
            HostMessage::StatusRequest,
            HostMessage::command("spread", vec!["0.5".into()]),
            HostMessage::RefreshNotice,
            HostMessage::LiveUpdates(true),
            HostMessage::ParameterChanged(ParameterChange::new(
                ParameterName::BidSpread,
                ParameterValue::Decimal(dec!(0.02)),
            )),
            HostMessage::Shutdown,
        ];

        for message in messages {
            let json = serde_json::to_value(&message).unwrap();
            assert_eq!(json["kind"], message.kind());
            assert!(HostMessage::KINDS.contains(&message.kind()));
        }
    }

    #[test]
    fn test_script_kinds_are_known() {
        let messages = vec![
            ScriptMessage::Notify("hi".into()),
            ScriptMessage::Stop("kill switch".into()),
            ScriptMessage::ForceRefresh,
            ScriptMessage::OrderRefreshComplete,
            ScriptMessage::Error(ScriptFailure::new("on_tick", "boom", "")),
        ];

        for message in messages {
            let json = serde_json::to_value(&message).unwrap();
            assert_eq!(json["kind"], message.kind());
            assert!(ScriptMessage::KINDS.contains(&message.kind()));
        }
    }

    #[test]
    fn test_failure_display_includes_trace() {
        let failure = ScriptFailure::new("on_tick", "division by zero", "at on_tick");
        assert_eq!(
            failure.to_string(),
            "Script error in on_tick: division by zero\nTrace back: at on_tick"
        );

        let bare = ScriptFailure::new("on_status", "boom", "");
        assert_eq!(bare.to_string(), "Script error in on_status: boom");
    }
}
