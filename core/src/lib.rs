//! # PMM Core
//!
//! Domain types shared by a market making host and the strategy scripts that
//! run beside it: market context, orders, trading events, balances and the
//! closed set of tunable strategy parameters.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod error;
pub mod parameters;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use parameters::{
    check_kind, ParameterChange, ParameterKind, ParameterName, ParameterValue, ParameterValues,
};
pub use types::{
    ActiveOrder, ActivePosition, Balances, BuyOrderCompletedEvent, Exchange,
    FundingPaymentCompletedEvent, MarketInfo, OrderCompletedEvent, OrderFilledEvent, OrderType,
    PositionSide, SellOrderCompletedEvent, TradeEvent, TradeType, TradingPair,
};
