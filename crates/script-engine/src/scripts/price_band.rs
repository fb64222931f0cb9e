//! Price band
//!
//! Keeps quoting inside a band around the moving average mid price. Above the
//! band buy levels are switched off, below it sell levels are, and inside it
//! both sides are restored to the levels seen on the first usable tick. An
//! optional stop distance asks the host to stop the strategy outright.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::context::ScriptContext;
use crate::error::ScriptResult;
use crate::script::Script;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PriceBandSettings {
    /// Band half-width above the average, as a fraction
    pub upper_bound_pct: Decimal,
    pub lower_bound_pct: Decimal,
    /// Ticks between averaged samples
    pub avg_interval: usize,
    pub avg_length: usize,
    /// Stop the strategy when the mid price falls this far below the average
    pub stop_below_pct: Option<Decimal>,
}

impl Default for PriceBandSettings {
    fn default() -> Self {
        Self {
            upper_bound_pct: dec!(0.05),
            lower_bound_pct: dec!(0.05),
            avg_interval: 3,
            avg_length: 10,
            stop_below_pct: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Above,
    Inside,
    Below,
}

impl Zone {
    fn describe(&self) -> &'static str {
        match self {
            Zone::Above => "above",
            Zone::Inside => "inside",
            Zone::Below => "below",
        }
    }
}

#[derive(Debug)]
pub struct PriceBand {
    settings: PriceBandSettings,
    original_levels: Option<(i64, i64)>,
    zone: Option<Zone>,
    band: Option<(Decimal, Decimal)>,
    stop_requested: bool,
}

impl PriceBand {
    pub fn new(settings: PriceBandSettings) -> Self {
        Self {
            settings,
            original_levels: None,
            zone: None,
            band: None,
            stop_requested: false,
        }
    }
}

impl Script for PriceBand {
    fn on_tick(&mut self, ctx: &mut ScriptContext) -> ScriptResult<()> {
        let interval = self.settings.avg_interval;
        let Some(avg) = ctx.avg_mid_price(interval, self.settings.avg_length) else {
            return Ok(());
        };

        let params = ctx.parameters();
        let (Some(buy_levels), Some(sell_levels)) = (params.buy_levels(), params.sell_levels())
        else {
            return Ok(());
        };
        let (original_buy, original_sell) = *self
            .original_levels
            .get_or_insert((buy_levels, sell_levels));

        let upper = avg * (Decimal::ONE + self.settings.upper_bound_pct);
        let lower = avg * (Decimal::ONE - self.settings.lower_bound_pct);
        self.band = Some((lower, upper));

        let mid = ctx.mid_price();
        if let Some(stop_pct) = self.settings.stop_below_pct {
            if !self.stop_requested && mid <= avg * (Decimal::ONE - stop_pct) {
                self.stop_requested = true;
                ctx.request_stop(format!(
                    "mid price {mid} fell more than {stop_pct} below average {avg}"
                ));
                return Ok(());
            }
        }

        let zone = if mid >= upper {
            Zone::Above
        } else if mid <= lower {
            Zone::Below
        } else {
            Zone::Inside
        };

        let params = ctx.parameters_mut();
        match zone {
            Zone::Above => {
                params.set_buy_levels(0);
                params.set_sell_levels(original_sell);
            }
            Zone::Below => {
                params.set_buy_levels(original_buy);
                params.set_sell_levels(0);
            }
            Zone::Inside => {
                params.set_buy_levels(original_buy);
                params.set_sell_levels(original_sell);
            }
        }

        if self.zone.replace(zone) != Some(zone) {
            ctx.log(format!("mid price {mid} is {} band [{lower}, {upper}]", zone.describe()));
        }
        Ok(())
    }

    fn on_status(&mut self, ctx: &ScriptContext) -> ScriptResult<Option<String>> {
        let Some((lower, upper)) = self.band else {
            return Ok(Some("Collecting mid prices for the band average.".to_string()));
        };
        Ok(Some(format!(
            "Mid price: {:.4} band: [{:.4}, {:.4}]",
            ctx.mid_price(),
            lower,
            upper
        )))
    }
}
