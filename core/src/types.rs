//! Market, order and event types exchanged between a market making host and
//! the strategy script attached to it.
//!
//! Everything in this module is plain data: the host builds these values from
//! its own order book and connector state, and the script only ever reads them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Trading pair identifier, e.g. "ETH-USDT"
pub type TradingPair = String;

/// Exchange (connector) name, e.g. "binance"
pub type Exchange = String;

/// Balances keyed by exchange, then by asset symbol
pub type Balances = BTreeMap<Exchange, BTreeMap<String, Decimal>>;

/// The market a script is attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfo {
    /// Exchange the strategy trades on
    pub exchange: Exchange,

    /// Trading pair the strategy quotes
    pub trading_pair: TradingPair,
}

impl MarketInfo {
    /// Creates market info for an exchange and trading pair
    pub fn new(exchange: impl Into<Exchange>, trading_pair: impl Into<TradingPair>) -> Self {
        Self {
            exchange: exchange.into(),
            trading_pair: trading_pair.into(),
        }
    }

    /// Base asset of the trading pair ("ETH" for "ETH-USDT")
    pub fn base_asset(&self) -> &str {
        self.trading_pair
            .split_once('-')
            .map(|(base, _)| base)
            .unwrap_or(&self.trading_pair)
    }

    /// Quote asset of the trading pair ("USDT" for "ETH-USDT")
    pub fn quote_asset(&self) -> &str {
        self.trading_pair
            .split_once('-')
            .map(|(_, quote)| quote)
            .unwrap_or("")
    }
}

impl fmt::Display for MarketInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.exchange, self.trading_pair)
    }
}

/// A live maker order as seen by the script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveOrder {
    pub price: Decimal,
    pub amount: Decimal,
    pub is_buy: bool,
}

impl ActiveOrder {
    pub fn new(price: Decimal, amount: Decimal, is_buy: bool) -> Self {
        Self {
            price,
            amount,
            is_buy,
        }
    }

    /// Quote value of the order (price * amount)
    pub fn value(&self) -> Decimal {
        self.price * self.amount
    }
}

/// Long or short side of a derivative position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

/// An open position on a derivative connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePosition {
    pub trading_pair: TradingPair,
    pub side: PositionSide,

    /// Position size in base asset, always positive
    pub amount: Decimal,
    pub entry_price: Decimal,
    pub leverage: u32,
    pub unrealized_pnl: Decimal,
}

/// Buy or sell side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            TradeType::Buy => TradeType::Sell,
            TradeType::Sell => TradeType::Buy,
        }
    }
}

/// Order types the host strategy places
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    LimitMaker,
}

/// A public trade printed on the order book since the previous tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub trading_pair: TradingPair,
    pub timestamp: DateTime<Utc>,
    pub trade_type: TradeType,
    pub price: Decimal,
    pub amount: Decimal,
}

/// One of the strategy's own orders was (partially) filled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilledEvent {
    pub timestamp: DateTime<Utc>,
    pub order_id: String,
    pub trading_pair: TradingPair,
    pub trade_type: TradeType,
    pub order_type: OrderType,
    pub price: Decimal,
    pub amount: Decimal,

    /// Fee paid for this fill, in quote asset
    pub trade_fee: Decimal,
    pub exchange_trade_id: String,
}

/// A buy or sell order was completely filled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompletedEvent {
    pub timestamp: DateTime<Utc>,
    pub order_id: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub fee_asset: String,
    pub base_asset_amount: Decimal,
    pub quote_asset_amount: Decimal,
    pub fee_amount: Decimal,
    pub order_type: OrderType,
}

impl OrderCompletedEvent {
    /// Average execution price (quote / base), zero when nothing was traded
    pub fn average_price(&self) -> Decimal {
        if self.base_asset_amount.is_zero() {
            Decimal::ZERO
        } else {
            self.quote_asset_amount / self.base_asset_amount
        }
    }
}

/// A buy order was completely filled
pub type BuyOrderCompletedEvent = OrderCompletedEvent;

/// A sell order was completely filled
pub type SellOrderCompletedEvent = OrderCompletedEvent;

/// A funding payment was settled on a perpetual connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingPaymentCompletedEvent {
    pub timestamp: DateTime<Utc>,
    pub market: Exchange,
    pub trading_pair: TradingPair,

    /// Positive when received, negative when paid
    pub amount: Decimal,
    pub funding_rate: Decimal,
}
