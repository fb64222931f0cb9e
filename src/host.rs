//! Paper host
//!
//! A minimal market making host used to drive scripts without an exchange:
//! a deterministic mid-price walk, one quote per side derived from the
//! current parameters, and fills whenever the price crosses a quote. It owns
//! the authoritative parameter values and applies script writes to them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use pmm_core::{
    ActiveOrder, Balances, MarketInfo, OrderFilledEvent, OrderType, ParameterChange,
    ParameterName, ParameterValue, ParameterValues, TradeEvent, TradeType,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use script_bus::TickSnapshot;
use script_engine::HostSink;
use tracing::{debug, info, warn};

use crate::config::HostConfig;

/// Parameters a fresh paper strategy starts with
pub fn default_parameters() -> ParameterValues {
    let defaults: [(ParameterName, ParameterValue); 10] = [
        (ParameterName::BuyLevels, 1i64.into()),
        (ParameterName::SellLevels, 1i64.into()),
        (ParameterName::OrderLevels, 1i64.into()),
        (ParameterName::BidSpread, dec!(0.01).into()),
        (ParameterName::AskSpread, dec!(0.01).into()),
        (ParameterName::MinimumSpread, dec!(-100).into()),
        (ParameterName::OrderAmount, dec!(1).into()),
        (ParameterName::OrderRefreshTime, dec!(30).into()),
        (ParameterName::HangingOrdersEnabled, false.into()),
        (ParameterName::InventorySkewEnabled, false.into()),
    ];

    let mut values = ParameterValues::new();
    for (name, value) in defaults {
        if let Err(err) = values.insert(name, value) {
            warn!(parameter = %name, error = %err, "bad default parameter");
        }
    }
    values
}

/// Largest single-tick move of the walk, in basis points
const MAX_STEP_BPS: i64 = 20;

/// Seeded random walk; the same seed replays the same prices.
#[derive(Debug)]
struct PriceWalk {
    price: Decimal,
    rng: ChaCha8Rng,
}

impl PriceWalk {
    fn new(start: Decimal, seed: u64) -> Self {
        Self {
            price: start,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn step(&mut self) -> Decimal {
        let bps = self.rng.gen_range(-MAX_STEP_BPS..=MAX_STEP_BPS);
        self.price = (self.price * (Decimal::ONE + Decimal::new(bps, 4))).round_dp(2);
        self.price
    }
}

#[derive(Debug)]
struct Book {
    walk: PriceWalk,
    bid: Option<ActiveOrder>,
    ask: Option<ActiveOrder>,
    base: Decimal,
    quote: Decimal,
    fills: u64,
}

/// One simulated tick: the snapshot for the script and any fills it caused.
#[derive(Debug)]
pub struct PaperTick {
    pub snapshot: TickSnapshot,
    pub fills: Vec<OrderFilledEvent>,
}

#[derive(Debug)]
pub struct PaperHost {
    market: MarketInfo,
    parameters: RwLock<ParameterValues>,
    book: Mutex<Book>,
    stop_reason: Mutex<Option<String>>,
    refresh_requested: AtomicBool,
    last_refresh: Mutex<Option<Instant>>,
    live_text: Mutex<Option<String>>,
}

impl PaperHost {
    pub fn new(config: &HostConfig) -> Self {
        Self {
            market: config.market_info(),
            parameters: RwLock::new(default_parameters()),
            book: Mutex::new(Book {
                walk: PriceWalk::new(config.start_price, config.price_seed),
                bid: None,
                ask: None,
                base: dec!(10),
                quote: dec!(20000),
                fills: 0,
            }),
            stop_reason: Mutex::new(None),
            refresh_requested: AtomicBool::new(false),
            last_refresh: Mutex::new(None),
            live_text: Mutex::new(None),
        }
    }

    pub fn market_info(&self) -> &MarketInfo {
        &self.market
    }

    pub fn parameters(&self) -> ParameterValues {
        self.parameters.read().clone()
    }

    pub fn stop_reason(&self) -> Option<String> {
        self.stop_reason.lock().clone()
    }

    pub fn live_text(&self) -> Option<String> {
        self.live_text.lock().clone()
    }

    /// True once per forced refresh, or when the refresh time has elapsed.
    pub fn refresh_due(&self, now: Instant) -> bool {
        let forced = self.refresh_requested.swap(false, Ordering::SeqCst);
        let period = self
            .parameters
            .read()
            .get(ParameterName::OrderRefreshTime)
            .and_then(ParameterValue::as_decimal)
            .and_then(|secs| secs.trunc().to_u64())
            .map(Duration::from_secs);

        let mut last = self.last_refresh.lock();
        let elapsed = match (*last, period) {
            (None, _) => true,
            (Some(at), Some(period)) => now.saturating_duration_since(at) >= period,
            (Some(_), None) => false,
        };
        if forced || elapsed {
            *last = Some(now);
            return true;
        }
        false
    }

    /// Advances the market one step.
    pub fn next_tick(&self) -> PaperTick {
        let parameters = self.parameters();
        let mut book = self.book.lock();
        let previous = book.walk.price;
        let mid = book.walk.step();
        let now = Utc::now();

        let mut fills = Vec::new();
        let mut trades = Vec::new();
        if let Some(bid) = book.bid.filter(|bid| mid <= bid.price) {
            book.base += bid.amount;
            book.quote -= bid.value();
            book.bid = None;
            fills.push(self.fill(&mut book, TradeType::Buy, bid));
        }
        if let Some(ask) = book.ask.filter(|ask| mid >= ask.price) {
            book.base -= ask.amount;
            book.quote += ask.value();
            book.ask = None;
            fills.push(self.fill(&mut book, TradeType::Sell, ask));
        }
        for fill in &fills {
            trades.push(TradeEvent {
                trading_pair: fill.trading_pair.clone(),
                timestamp: fill.timestamp,
                trade_type: fill.trade_type,
                price: fill.price,
                amount: fill.amount,
            });
        }
        debug!(previous = %previous, mid = %mid, fills = fills.len(), "paper market stepped");

        book.bid = quote(&parameters, mid, TradeType::Buy);
        book.ask = quote(&parameters, mid, TradeType::Sell);
        let orders = book.bid.into_iter().chain(book.ask).collect();

        let mut assets = BTreeMap::new();
        assets.insert(self.market.base_asset().to_string(), book.base);
        assets.insert(self.market.quote_asset().to_string(), book.quote);
        let mut balances = Balances::new();
        balances.insert(self.market.exchange.clone(), assets);

        let snapshot = TickSnapshot::new(now, mid, parameters)
            .with_balances(balances.clone(), balances)
            .with_orders(orders)
            .with_trades(trades);
        PaperTick { snapshot, fills }
    }

    fn fill(&self, book: &mut Book, trade_type: TradeType, order: ActiveOrder) -> OrderFilledEvent {
        book.fills += 1;
        OrderFilledEvent {
            timestamp: Utc::now(),
            order_id: format!("paper-{}", book.fills),
            trading_pair: self.market.trading_pair.clone(),
            trade_type,
            order_type: OrderType::Limit,
            price: order.price,
            amount: order.amount,
            trade_fee: Decimal::ZERO,
            exchange_trade_id: book.fills.to_string(),
        }
    }
}

fn quote(parameters: &ParameterValues, mid: Decimal, side: TradeType) -> Option<ActiveOrder> {
    let (levels, spread) = match side {
        TradeType::Buy => (ParameterName::BuyLevels, ParameterName::BidSpread),
        TradeType::Sell => (ParameterName::SellLevels, ParameterName::AskSpread),
    };
    let levels = parameters.get(levels).and_then(ParameterValue::as_integer)?;
    let spread = parameters.get(spread).and_then(ParameterValue::as_decimal)?;
    let amount = parameters
        .get(ParameterName::OrderAmount)
        .and_then(ParameterValue::as_decimal)?;
    if levels <= 0 || amount <= Decimal::ZERO {
        return None;
    }

    let price = match side {
        TradeType::Buy => mid * (Decimal::ONE - spread),
        TradeType::Sell => mid * (Decimal::ONE + spread),
    };
    Some(ActiveOrder::new(price.round_dp(2), amount, side == TradeType::Buy))
}

impl HostSink for PaperHost {
    fn notify(&self, message: &str) {
        info!(target: "notify", "{message}");
    }

    fn log(&self, message: &str) {
        info!(target: "script", "{message}");
    }

    fn send_image(&self, reference: &str) {
        info!(target: "notify", image = %reference, "script sent an image");
    }

    fn request_stop(&self, reason: &str) {
        let mut stop = self.stop_reason.lock();
        if stop.is_none() {
            *stop = Some(reason.to_string());
        }
    }

    fn force_order_refresh(&self) {
        self.refresh_requested.store(true, Ordering::SeqCst);
    }

    fn apply_parameter(&self, change: &ParameterChange) {
        if let Err(err) = self.parameters.write().insert(change.name, change.value.clone()) {
            warn!(change = %change, error = %err, "rejected parameter change from script");
        }
    }

    fn set_live_text(&self, text: &str) {
        *self.live_text.lock() = Some(text.to_string());
        info!(target: "live", "{text}");
    }

    fn order_refresh_complete(&self) {
        debug!("script acknowledged order refresh");
    }
}
