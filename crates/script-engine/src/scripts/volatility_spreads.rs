//! Widens bid and ask spreads when recent price volatility exceeds them.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::context::ScriptContext;
use crate::error::{ScriptError, ScriptResult};
use crate::sampling::round_by_step;
use crate::script::Script;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VolatilitySpreadsSettings {
    pub volatility_interval: usize,
    pub volatility_length: usize,
    /// Applied to the median volatility before comparing with the spreads
    pub multiplier: Decimal,
    /// Adjusted spreads are floored to this step
    pub spread_step: Decimal,
    /// Changes smaller than this are not applied
    pub min_adjustment: Decimal,
}

impl Default for VolatilitySpreadsSettings {
    fn default() -> Self {
        Self {
            volatility_interval: 5,
            volatility_length: 10,
            multiplier: Decimal::ONE,
            spread_step: dec!(0.0005),
            min_adjustment: dec!(0.0005),
        }
    }
}

#[derive(Debug)]
pub struct VolatilitySpreads {
    settings: VolatilitySpreadsSettings,
    original_spreads: Option<(Decimal, Decimal)>,
}

impl VolatilitySpreads {
    pub fn new(settings: VolatilitySpreadsSettings) -> Self {
        Self {
            settings,
            original_spreads: None,
        }
    }

    fn volatility(&self, ctx: &ScriptContext) -> Option<Decimal> {
        ctx.median_price_volatility(
            self.settings.volatility_interval,
            self.settings.volatility_length,
        )
    }

    fn target(&self, original: Decimal, volatility: Decimal) -> Decimal {
        let adjusted = round_by_step(
            volatility * self.settings.multiplier,
            self.settings.spread_step,
        );
        original.max(adjusted)
    }
}

impl Script for VolatilitySpreads {
    fn on_tick(&mut self, ctx: &mut ScriptContext) -> ScriptResult<()> {
        let params = ctx.parameters();
        let (Some(bid), Some(ask)) = (params.bid_spread(), params.ask_spread()) else {
            return Ok(());
        };
        let (original_bid, original_ask) = *self.original_spreads.get_or_insert((bid, ask));

        let Some(volatility) = self.volatility(ctx) else {
            return Ok(());
        };

        let new_bid = self.target(original_bid, volatility);
        let new_ask = self.target(original_ask, volatility);
        let moved = (new_bid - bid).abs() >= self.settings.min_adjustment
            || (new_ask - ask).abs() >= self.settings.min_adjustment;
        if !moved {
            return Ok(());
        }

        let params = ctx.parameters_mut();
        params.set_bid_spread(new_bid);
        params.set_ask_spread(new_ask);
        ctx.notify(format!(
            "Spreads adjusted to bid {new_bid} ask {new_ask} on volatility {volatility:.4}"
        ));
        Ok(())
    }

    fn on_command(
        &mut self,
        ctx: &mut ScriptContext,
        cmd: &str,
        _args: &[String],
    ) -> ScriptResult<()> {
        match cmd {
            "reset" => {
                let Some((bid, ask)) = self.original_spreads else {
                    return Err(ScriptError::hook("no spreads recorded yet"));
                };
                let params = ctx.parameters_mut();
                params.set_bid_spread(bid);
                params.set_ask_spread(ask);
                ctx.notify(format!("Spreads reset to bid {bid} ask {ask}"));
            }
            "refresh" => ctx.force_order_refresh(),
            other => ctx.notify(format!("Unknown command: {other}")),
        }
        Ok(())
    }

    fn on_status(&mut self, ctx: &ScriptContext) -> ScriptResult<Option<String>> {
        let params = ctx.parameters();
        let spreads = match (params.bid_spread(), params.ask_spread()) {
            (Some(bid), Some(ask)) => format!("bid spread: {bid} ask spread: {ask}"),
            _ => "spreads unknown".to_string(),
        };
        let volatility = self
            .volatility(ctx)
            .map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"));
        Ok(Some(format!("{spreads} volatility: {volatility}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::instance::ScriptInstance;
    use chrono::Utc;
    use pmm_core::{ParameterChange, ParameterName, ParameterValue, ParameterValues};
    use script_bus::{channel, EventReceiver, HostMessage, ScriptMessage, TickSnapshot};

    fn setup() -> (ScriptInstance, EventReceiver<ScriptMessage>) {
        let (tx, rx) = channel();
        let script = VolatilitySpreads::new(VolatilitySpreadsSettings {
            volatility_interval: 1,
            volatility_length: 2,
            ..Default::default()
        });
        (
            ScriptInstance::new(Box::new(script), tx, &RuntimeConfig::default()),
            rx,
        )
    }

    fn tick(price: Decimal) -> HostMessage {
        let params = ParameterValues::new()
            .with(ParameterName::BidSpread, dec!(0.01))
            .unwrap()
            .with(ParameterName::AskSpread, dec!(0.01))
            .unwrap();
        HostMessage::Tick(TickSnapshot::new(Utc::now(), price, params))
    }

    #[test]
    fn test_target_never_goes_below_original() {
        let script = VolatilitySpreads::new(VolatilitySpreadsSettings::default());
        assert_eq!(script.target(dec!(0.01), dec!(0.0037)), dec!(0.01));
        assert_eq!(script.target(dec!(0.01), dec!(0.0234)), dec!(0.0230));
    }

    #[test]
    fn test_calm_market_keeps_spreads() {
        let (mut instance, rx) = setup();
        for price in [dec!(100), dec!(100.1), dec!(100)] {
            instance.handle(tick(price));
        }
        assert!(rx.is_empty());
    }

    #[test]
    fn test_volatile_market_widens_spreads() {
        let (mut instance, rx) = setup();
        for price in [dec!(100), dec!(103), dec!(100)] {
            instance.handle(tick(price));
        }

        let sent: Vec<_> = rx.drain().collect();
        assert_eq!(
            sent[..2],
            [
                ScriptMessage::ParameterChanged(ParameterChange::new(
                    ParameterName::BidSpread,
                    ParameterValue::Decimal(dec!(0.03)),
                )),
                ScriptMessage::ParameterChanged(ParameterChange::new(
                    ParameterName::AskSpread,
                    ParameterValue::Decimal(dec!(0.03)),
                )),
            ]
        );
        assert!(matches!(
            &sent[2],
            ScriptMessage::Notify(text) if text.starts_with("Spreads adjusted")
        ));
    }

    #[test]
    fn test_status_reads_volatility_from_history() {
        let (mut instance, rx) = setup();
        instance.handle(HostMessage::StatusRequest);
        assert!(matches!(
            rx.try_recv().unwrap(),
            ScriptMessage::StatusReport(text) if text.ends_with("volatility: n/a")
        ));

        for price in [dec!(100), dec!(103), dec!(100)] {
            instance.handle(tick(price));
        }
        rx.drain().for_each(drop);
        instance.handle(HostMessage::StatusRequest);
        assert!(matches!(
            rx.try_recv().unwrap(),
            ScriptMessage::StatusReport(text) if text.ends_with("volatility: 0.0300")
        ));
    }

    #[test]
    fn test_reset_before_first_tick_is_a_hook_error() {
        let (mut instance, rx) = setup();
        instance.handle(HostMessage::command("reset", vec![]));
        assert!(matches!(
            rx.try_recv().unwrap(),
            ScriptMessage::Error(f) if f.hook == "on_command"
        ));
    }
}
