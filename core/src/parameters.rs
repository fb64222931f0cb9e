//! Strategy parameter names and values
//!
//! The pure market making knobs a script may read and tune. Names are a closed
//! set so both sides of the bridge agree on them; values carry their own type
//! so a change message can be applied without a side lookup.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// Value type accepted by a parameter slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Integer,
    Decimal,
    Bool,
    Json,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKind::Integer => write!(f, "integer"),
            ParameterKind::Decimal => write!(f, "decimal"),
            ParameterKind::Bool => write!(f, "bool"),
            ParameterKind::Json => write!(f, "json"),
        }
    }
}

macro_rules! strategy_parameters {
    ($( $variant:ident => $name:literal : $kind:ident ),+ $(,)?) => {
        /// Names of the strategy knobs exposed to scripts
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum ParameterName {
            $($variant),+
        }

        impl ParameterName {
            /// Every parameter, in declaration order
            pub const ALL: &'static [ParameterName] = &[$(ParameterName::$variant),+];

            /// Attribute name used by the host strategy
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(ParameterName::$variant => $name),+
                }
            }

            /// Value type the slot accepts
            pub fn kind(&self) -> ParameterKind {
                match self {
                    $(ParameterName::$variant => ParameterKind::$kind),+
                }
            }
        }

        impl FromStr for ParameterName {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(ParameterName::$variant),)+
                    other => Err(CoreError::UnknownParameter(other.to_string())),
                }
            }
        }
    };
}

strategy_parameters! {
    BuyLevels => "buy_levels": Integer,
    SellLevels => "sell_levels": Integer,
    OrderLevels => "order_levels": Integer,
    BidSpread => "bid_spread": Decimal,
    AskSpread => "ask_spread": Decimal,
    MinimumSpread => "minimum_spread": Decimal,
    OrderAmount => "order_amount": Decimal,
    OrderLevelSpread => "order_level_spread": Decimal,
    OrderLevelAmount => "order_level_amount": Decimal,
    OrderRefreshTime => "order_refresh_time": Decimal,
    OrderRefreshTolerancePct => "order_refresh_tolerance_pct": Decimal,
    FilledOrderDelay => "filled_order_delay": Decimal,
    HangingOrdersEnabled => "hanging_orders_enabled": Bool,
    HangingOrdersCancelPct => "hanging_orders_cancel_pct": Decimal,
    InventorySkewEnabled => "inventory_skew_enabled": Bool,
    InventoryTargetBasePct => "inventory_target_base_pct": Decimal,
    InventoryRangeMultiplier => "inventory_range_multiplier": Decimal,
    OrderOverride => "order_override": Json,
    OrderOptimizationEnabled => "order_optimization_enabled": Bool,
    AskOrderOptimizationDepth => "ask_order_optimization_depth": Decimal,
    BidOrderOptimizationDepth => "bid_order_optimization_depth": Decimal,
    MinimumBidDepth => "minimum_bid_depth": Decimal,
    MinimumAskDepth => "minimum_ask_depth": Decimal,
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    Integer(i64),
    Decimal(Decimal),
    Bool(bool),
    Json(serde_json::Value),
}

impl ParameterValue {
    pub fn kind(&self) -> ParameterKind {
        match self {
            ParameterValue::Integer(_) => ParameterKind::Integer,
            ParameterValue::Decimal(_) => ParameterKind::Decimal,
            ParameterValue::Bool(_) => ParameterKind::Bool,
            ParameterValue::Json(_) => ParameterKind::Json,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ParameterValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ParameterValue::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ParameterValue::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Integer(v) => write!(f, "{v}"),
            ParameterValue::Decimal(v) => write!(f, "{v}"),
            ParameterValue::Bool(v) => write!(f, "{v}"),
            ParameterValue::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Integer(v)
    }
}

impl From<Decimal> for ParameterValue {
    fn from(v: Decimal) -> Self {
        ParameterValue::Decimal(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

impl From<serde_json::Value> for ParameterValue {
    fn from(v: serde_json::Value) -> Self {
        ParameterValue::Json(v)
    }
}

/// Checks that `value` fits the slot named `name`
pub fn check_kind(name: ParameterName, value: &ParameterValue) -> CoreResult<()> {
    if name.kind() == value.kind() {
        Ok(())
    } else {
        Err(CoreError::TypeMismatch {
            name: name.as_str(),
            expected: name.kind(),
            actual: value.kind(),
        })
    }
}

/// Plain parameter values; an absent name means the slot is unset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterValues {
    values: BTreeMap<ParameterName, ParameterValue>,
}

impl ParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: ParameterName) -> Option<&ParameterValue> {
        self.values.get(&name)
    }

    /// Stores a value after checking its type, returning the previous one
    pub fn insert(
        &mut self,
        name: ParameterName,
        value: ParameterValue,
    ) -> CoreResult<Option<ParameterValue>> {
        check_kind(name, &value)?;
        Ok(self.values.insert(name, value))
    }

    /// Builder-style insert for assembling snapshots
    pub fn with(
        mut self,
        name: ParameterName,
        value: impl Into<ParameterValue>,
    ) -> CoreResult<Self> {
        self.insert(name, value.into())?;
        Ok(self)
    }

    pub fn remove(&mut self, name: ParameterName) -> Option<ParameterValue> {
        self.values.remove(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParameterName, &ParameterValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A parameter transition produced by a write that changed the stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterChange {
    pub name: ParameterName,
    pub value: ParameterValue,
}

impl ParameterChange {
    pub fn new(name: ParameterName, value: ParameterValue) -> Self {
        Self { name, value }
    }
}

impl fmt::Display for ParameterChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_name_round_trips_through_str() {
        for name in ParameterName::ALL {
            assert_eq!(name.as_str().parse::<ParameterName>().unwrap(), *name);
        }
        assert_eq!(ParameterName::ALL.len(), 23);
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = "price_ceiling".parse::<ParameterName>().unwrap_err();
        assert_eq!(err, CoreError::UnknownParameter("price_ceiling".into()));
    }

    #[test]
    fn test_serde_name_matches_attribute_name() {
        let json = serde_json::to_string(&ParameterName::OrderRefreshTolerancePct).unwrap();
        assert_eq!(json, "\"order_refresh_tolerance_pct\"");
    }

    #[test]
    fn test_insert_checks_kind() {
        let mut values = ParameterValues::new();
        assert!(values
            .insert(ParameterName::BidSpread, dec!(0.01).into())
            .unwrap()
            .is_none());

        let err = values
            .insert(ParameterName::BidSpread, ParameterValue::Bool(true))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::TypeMismatch {
                expected: ParameterKind::Decimal,
                actual: ParameterKind::Bool,
                ..
            }
        ));
        assert_eq!(
            values.get(ParameterName::BidSpread),
            Some(&ParameterValue::Decimal(dec!(0.01)))
        );
    }

    #[test]
    fn test_decimal_equality_ignores_scale() {
        assert_eq!(
            ParameterValue::Decimal(dec!(1.0)),
            ParameterValue::Decimal(dec!(1.00))
        );
    }

    #[test]
    fn test_values_serialize_as_map() {
        let values = ParameterValues::new()
            .with(ParameterName::OrderLevels, 3i64)
            .unwrap()
            .with(ParameterName::InventorySkewEnabled, true)
            .unwrap();
        let json = serde_json::to_value(&values).unwrap();
        assert_eq!(json["order_levels"]["type"], "integer");
        assert_eq!(json["inventory_skew_enabled"]["value"], true);

        let back: ParameterValues = serde_json::from_value(json).unwrap();
        assert_eq!(back, values);
    }
}
