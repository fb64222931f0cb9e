//! Reactive parameter set
//!
//! The script's mirror of the host strategy's tunable knobs. Writes made by
//! the script go through [`ParameterSet::set`] (or one of the typed setters)
//! and are reported to the host as `ParameterChanged` messages; values pushed
//! by the host are applied silently.
//!
//! Change detection rules, per slot:
//! - the first write into an unset slot is silent;
//! - writing the value already stored is silent;
//! - any other write emits exactly one `ParameterChanged` carrying the new
//!   value, sent before the write is applied.

use metrics::counter;
use pmm_core::{
    check_kind, CoreResult, ParameterChange, ParameterName, ParameterValue, ParameterValues,
};
use rust_decimal::Decimal;
use script_bus::{EventSender, ScriptMessage};
use tracing::{debug, warn};

/// Strategy parameters as seen by a script.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    values: ParameterValues,
    outbox: Option<EventSender<ScriptMessage>>,
}

impl ParameterSet {
    /// Creates an empty set whose changes are reported on `outbox`.
    pub fn new(outbox: EventSender<ScriptMessage>) -> Self {
        Self {
            values: ParameterValues::new(),
            outbox: Some(outbox),
        }
    }

    /// Creates a set that records writes but never reports them.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn get(&self, name: ParameterName) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    /// Looks a parameter up by its attribute name.
    pub fn get_by_name(&self, name: &str) -> CoreResult<Option<&ParameterValue>> {
        Ok(self.values.get(name.parse()?))
    }

    pub fn values(&self) -> &ParameterValues {
        &self.values
    }

    /// Script-side write. Returns whether a change was reported.
    pub fn set(
        &mut self,
        name: ParameterName,
        value: impl Into<ParameterValue>,
    ) -> CoreResult<bool> {
        let value = value.into();
        check_kind(name, &value)?;
        Ok(self.write(name, value))
    }

    /// Script-side write addressed by attribute name.
    pub fn set_by_name(
        &mut self,
        name: &str,
        value: impl Into<ParameterValue>,
    ) -> CoreResult<bool> {
        self.set(name.parse()?, value)
    }

    /// Host-side write: stores a pushed value without reporting it back.
    pub fn apply(&mut self, change: &ParameterChange) -> CoreResult<()> {
        self.values.insert(change.name, change.value.clone())?;
        Ok(())
    }

    /// Replaces every slot with a host snapshot, silently.
    pub fn replace(&mut self, values: ParameterValues) {
        self.values = values;
    }

    // Caller guarantees the value matches the slot's kind.
    fn write(&mut self, name: ParameterName, value: ParameterValue) -> bool {
        let changed = matches!(self.values.get(name), Some(current) if *current != value);

        if changed {
            self.report(ParameterChange::new(name, value.clone()));
        }

        if let Err(err) = self.values.insert(name, value) {
            warn!(parameter = %name, error = %err, "rejected parameter write");
        }
        changed
    }

    fn report(&self, change: ParameterChange) {
        let Some(outbox) = &self.outbox else {
            return;
        };

        debug!(change = %change, "reporting parameter change");
        counter!(
            "script_bridge_messages_total",
            1,
            "direction" => "outbound",
            "kind" => "parameter_changed"
        );
        if let Err(err) = outbox.send(ScriptMessage::ParameterChanged(change)) {
            warn!(error = %err, "host side is gone, parameter change not delivered");
        }
    }
}

macro_rules! typed_parameters {
    ($( $getter:ident / $setter:ident => $variant:ident : $ty:ty, $accessor:ident );+ $(;)?) => {
        impl ParameterSet {
            $(
                pub fn $getter(&self) -> Option<$ty> {
                    self.values.get(ParameterName::$variant).and_then(ParameterValue::$accessor)
                }

                pub fn $setter(&mut self, value: $ty) -> bool {
                    self.write(ParameterName::$variant, value.into())
                }
            )+
        }
    };
}

typed_parameters! {
    buy_levels / set_buy_levels => BuyLevels: i64, as_integer;
    sell_levels / set_sell_levels => SellLevels: i64, as_integer;
    order_levels / set_order_levels => OrderLevels: i64, as_integer;
    bid_spread / set_bid_spread => BidSpread: Decimal, as_decimal;
    ask_spread / set_ask_spread => AskSpread: Decimal, as_decimal;
    minimum_spread / set_minimum_spread => MinimumSpread: Decimal, as_decimal;
    order_amount / set_order_amount => OrderAmount: Decimal, as_decimal;
    order_level_spread / set_order_level_spread => OrderLevelSpread: Decimal, as_decimal;
    order_level_amount / set_order_level_amount => OrderLevelAmount: Decimal, as_decimal;
    order_refresh_time / set_order_refresh_time => OrderRefreshTime: Decimal, as_decimal;
    order_refresh_tolerance_pct / set_order_refresh_tolerance_pct =>
        OrderRefreshTolerancePct: Decimal, as_decimal;
    filled_order_delay / set_filled_order_delay => FilledOrderDelay: Decimal, as_decimal;
    hanging_orders_enabled / set_hanging_orders_enabled => HangingOrdersEnabled: bool, as_bool;
    hanging_orders_cancel_pct / set_hanging_orders_cancel_pct =>
        HangingOrdersCancelPct: Decimal, as_decimal;
    inventory_skew_enabled / set_inventory_skew_enabled => InventorySkewEnabled: bool, as_bool;
    inventory_target_base_pct / set_inventory_target_base_pct =>
        InventoryTargetBasePct: Decimal, as_decimal;
    inventory_range_multiplier / set_inventory_range_multiplier =>
        InventoryRangeMultiplier: Decimal, as_decimal;
    order_optimization_enabled / set_order_optimization_enabled =>
        OrderOptimizationEnabled: bool, as_bool;
    ask_order_optimization_depth / set_ask_order_optimization_depth =>
        AskOrderOptimizationDepth: Decimal, as_decimal;
    bid_order_optimization_depth / set_bid_order_optimization_depth =>
        BidOrderOptimizationDepth: Decimal, as_decimal;
    minimum_bid_depth / set_minimum_bid_depth => MinimumBidDepth: Decimal, as_decimal;
    minimum_ask_depth / set_minimum_ask_depth => MinimumAskDepth: Decimal, as_decimal;
}

impl ParameterSet {
    pub fn order_override(&self) -> Option<&serde_json::Value> {
        self.values
            .get(ParameterName::OrderOverride)
            .and_then(ParameterValue::as_json)
    }

    pub fn set_order_override(&mut self, value: serde_json::Value) -> bool {
        self.write(ParameterName::OrderOverride, value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmm_core::CoreError;
    use rust_decimal_macros::dec;
    use script_bus::{channel, EventReceiver};

    fn reactive() -> (ParameterSet, EventReceiver<ScriptMessage>) {
        let (tx, rx) = channel();
        (ParameterSet::new(tx), rx)
    }

    #[test]
    fn test_first_write_from_unset_is_silent() {
        let (mut params, rx) = reactive();
        assert!(!params.set_bid_spread(dec!(0.01)));
        assert!(rx.is_empty());
        assert_eq!(params.bid_spread(), Some(dec!(0.01)));
    }

    #[test]
    fn test_rewriting_same_value_is_silent() {
        let (mut params, rx) = reactive();
        params.set_bid_spread(dec!(0.01));
        assert!(!params.set_bid_spread(dec!(0.010)));
        assert!(rx.is_empty());
    }

    #[test]
    fn test_changed_value_emits_exactly_once() {
        let (mut params, rx) = reactive();
        params.set_bid_spread(dec!(0.01));
        assert!(params.set_bid_spread(dec!(0.02)));

        let sent: Vec<_> = rx.drain().collect();
        assert_eq!(
            sent,
            vec![ScriptMessage::ParameterChanged(ParameterChange::new(
                ParameterName::BidSpread,
                ParameterValue::Decimal(dec!(0.02)),
            ))]
        );
        assert_eq!(params.bid_spread(), Some(dec!(0.02)));
    }

    #[test]
    fn test_host_push_never_emits() {
        let (mut params, rx) = reactive();
        params.set_buy_levels(2);
        params
            .apply(&ParameterChange::new(
                ParameterName::BuyLevels,
                ParameterValue::Integer(5),
            ))
            .unwrap();
        let pushed = ParameterValues::new()
            .with(ParameterName::SellLevels, 1i64)
            .unwrap();
        params.replace(pushed);

        assert!(rx.is_empty());
        assert_eq!(params.buy_levels(), None);
        assert_eq!(params.sell_levels(), Some(1));
    }

    #[test]
    fn test_write_after_snapshot_reports_against_snapshot_value() {
        let (mut params, rx) = reactive();
        let snapshot = ParameterValues::new()
            .with(ParameterName::OrderLevels, 3i64)
            .unwrap();
        params.replace(snapshot);
        assert!(params.set_order_levels(4));
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_set_by_name_checks_name_and_type() {
        let (mut params, _rx) = reactive();
        assert_eq!(
            params.set_by_name("bid_spreads", dec!(0.01)),
            Err(CoreError::UnknownParameter("bid_spreads".into()))
        );
        assert!(matches!(
            params.set_by_name("hanging_orders_enabled", dec!(1)),
            Err(CoreError::TypeMismatch { .. })
        ));
        assert_eq!(params.set_by_name("hanging_orders_enabled", true), Ok(false));
        assert_eq!(
            params.get_by_name("hanging_orders_enabled").unwrap(),
            Some(&ParameterValue::Bool(true))
        );
    }

    #[test]
    fn test_order_override_is_json() {
        let (mut params, rx) = reactive();
        params.set_order_override(serde_json::json!({"order_1": ["buy", 0.5, 100]}));
        assert!(params.set_order_override(serde_json::json!({})));
        assert_eq!(rx.len(), 1);
        assert_eq!(params.order_override(), Some(&serde_json::json!({})));
    }

    #[test]
    fn test_detached_set_records_without_reporting() {
        let mut params = ParameterSet::detached();
        params.set_ask_spread(dec!(0.01));
        assert!(params.set_ask_spread(dec!(0.03)));
        assert_eq!(params.ask_spread(), Some(dec!(0.03)));
    }
}
