//! Runtime context handed to every script hook.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use metrics::counter;
use pmm_core::{ActiveOrder, ActivePosition, Balances, MarketInfo, TradeEvent};
use rust_decimal::Decimal;
use script_bus::{EventSender, ScriptMessage, TickSnapshot};
use tracing::warn;

use crate::params::ParameterSet;
use crate::sampling;

/// Mid-price samples kept by default: one day of one-second ticks.
pub const DEFAULT_MID_PRICE_HISTORY: usize = 86_400;

/// What a script can see of the host, and the calls it can make back.
#[derive(Debug)]
pub struct ScriptContext {
    outbox: EventSender<ScriptMessage>,
    parameters: ParameterSet,
    market_info: Option<MarketInfo>,
    timestamp: Option<DateTime<Utc>>,
    mid_price: Decimal,
    mid_prices: VecDeque<Decimal>,
    history_capacity: usize,
    total_balances: Balances,
    available_balances: Balances,
    orders: Vec<ActiveOrder>,
    positions: Vec<ActivePosition>,
    trades: Vec<TradeEvent>,
    live_updates: bool,
}

impl ScriptContext {
    pub fn new(outbox: EventSender<ScriptMessage>, history_capacity: usize) -> Self {
        Self {
            parameters: ParameterSet::new(outbox.clone()),
            outbox,
            market_info: None,
            timestamp: None,
            mid_price: Decimal::ZERO,
            mid_prices: VecDeque::new(),
            history_capacity: history_capacity.max(1),
            total_balances: Balances::new(),
            available_balances: Balances::new(),
            orders: Vec::new(),
            positions: Vec::new(),
            trades: Vec::new(),
            live_updates: false,
        }
    }

    pub(crate) fn set_market_info(&mut self, market_info: MarketInfo) {
        self.market_info = Some(market_info);
    }

    pub(crate) fn set_live_updates(&mut self, enabled: bool) {
        self.live_updates = enabled;
    }

    /// Mirrors a host snapshot. Runs before the script's tick hook.
    pub(crate) fn apply_tick(&mut self, snapshot: TickSnapshot) {
        self.timestamp = Some(snapshot.timestamp);
        self.mid_price = snapshot.mid_price;
        if self.mid_prices.len() == self.history_capacity {
            self.mid_prices.pop_front();
        }
        self.mid_prices.push_back(snapshot.mid_price);

        self.parameters.replace(snapshot.parameters);
        self.total_balances = snapshot.total_balances;
        self.available_balances = snapshot.available_balances;
        self.orders = snapshot.orders;
        self.positions = snapshot.positions;
        self.trades = snapshot.trades;
    }

    pub fn market_info(&self) -> Option<&MarketInfo> {
        self.market_info.as_ref()
    }

    /// Timestamp of the latest tick
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn mid_price(&self) -> Decimal {
        self.mid_price
    }

    /// Mid prices recorded so far, oldest first
    pub fn mid_prices(&self) -> impl ExactSizeIterator<Item = &Decimal> + '_ {
        self.mid_prices.iter()
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }

    pub fn total_balances(&self) -> &Balances {
        &self.total_balances
    }

    pub fn available_balances(&self) -> &Balances {
        &self.available_balances
    }

    /// Total balance of one asset on one exchange, zero when unknown.
    pub fn total_balance(&self, exchange: &str, asset: &str) -> Decimal {
        lookup(&self.total_balances, exchange, asset)
    }

    pub fn available_balance(&self, exchange: &str, asset: &str) -> Decimal {
        lookup(&self.available_balances, exchange, asset)
    }

    pub fn active_orders(&self) -> &[ActiveOrder] {
        &self.orders
    }

    pub fn active_positions(&self) -> &[ActivePosition] {
        &self.positions
    }

    /// Trades seen since the previous tick
    pub fn trades(&self) -> &[TradeEvent] {
        &self.trades
    }

    pub fn live_updates(&self) -> bool {
        self.live_updates
    }

    pub fn notify(&self, message: impl Into<String>) {
        self.emit(ScriptMessage::Notify(message.into()));
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(ScriptMessage::Log(message.into()));
    }

    /// Asks the host to forward an image (a path or URL) to its notifiers.
    pub fn send_image(&self, reference: impl Into<String>) {
        self.emit(ScriptMessage::SendImage(reference.into()));
    }

    /// Asks the host to stop the strategy. One-way: there is no acknowledgement.
    pub fn request_stop(&self, reason: impl Into<String>) {
        self.emit(ScriptMessage::Stop(reason.into()));
    }

    pub fn force_order_refresh(&self) {
        self.emit(ScriptMessage::ForceRefresh);
    }

    pub fn set_live_text(&self, text: impl Into<String>) {
        self.emit(ScriptMessage::LiveText(text.into()));
    }

    pub(crate) fn emit(&self, message: ScriptMessage) {
        counter!(
            "script_bridge_messages_total",
            1,
            "direction" => "outbound",
            "kind" => message.kind()
        );
        if let Err(err) = self.outbox.send(message) {
            warn!(error = %err, "host side is gone, script message dropped");
        }
    }

    /// `length` mid prices taken every `interval` ticks back from the latest.
    fn sample_history(&self, interval: usize, length: usize) -> Option<Vec<Decimal>> {
        let indices = sampling::sample_indices(self.mid_prices.len(), interval, length)?;
        Some(indices.into_iter().map(|i| self.mid_prices[i]).collect())
    }

    /// Mean of `length` mid prices sampled every `interval` ticks.
    pub fn avg_mid_price(&self, interval: usize, length: usize) -> Option<Decimal> {
        if length == 0 {
            return None;
        }
        sampling::mean(&self.sample_history(interval, length)?)
    }

    /// Mean of `length` relative price changes sampled every `interval` ticks.
    pub fn avg_price_volatility(&self, interval: usize, length: usize) -> Option<Decimal> {
        self.locate_central_price_volatility(interval, length, sampling::mean)
    }

    /// Median of `length` relative price changes sampled every `interval` ticks.
    pub fn median_price_volatility(&self, interval: usize, length: usize) -> Option<Decimal> {
        self.locate_central_price_volatility(interval, length, sampling::median)
    }

    /// Reduces `length` relative price changes with a caller-supplied function.
    pub fn locate_central_price_volatility<F>(
        &self,
        interval: usize,
        length: usize,
        reducer: F,
    ) -> Option<Decimal>
    where
        F: FnOnce(&[Decimal]) -> Option<Decimal>,
    {
        if length == 0 {
            return None;
        }
        let samples = self.sample_history(interval, length + 1)?;
        sampling::reduce_changes(&samples, reducer)
    }
}

fn lookup(balances: &Balances, exchange: &str, asset: &str) -> Decimal {
    balances
        .get(exchange)
        .and_then(|assets| assets.get(asset))
        .copied()
        .unwrap_or(Decimal::ZERO)
}
