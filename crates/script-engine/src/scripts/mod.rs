//! Scripts shipped with the engine.

pub mod price_band;
pub mod volatility_spreads;

pub use price_band::{PriceBand, PriceBandSettings};
pub use volatility_spreads::{VolatilitySpreads, VolatilitySpreadsSettings};

use tracing::warn;

use crate::registry::{parse_settings, ScriptRegistry};
use crate::script::Script;

pub const PRICE_BAND: &str = "price_band";
pub const VOLATILITY_SPREADS: &str = "volatility_spreads";

pub(crate) fn register_builtin(registry: &mut ScriptRegistry) {
    let builtins: [(&str, fn(&serde_json::Value) -> crate::ScriptResult<Box<dyn Script>>); 2] = [
        (PRICE_BAND, |settings| {
            let settings = parse_settings(PRICE_BAND, settings)?;
            Ok(Box::new(PriceBand::new(settings)))
        }),
        (VOLATILITY_SPREADS, |settings| {
            let settings = parse_settings(VOLATILITY_SPREADS, settings)?;
            Ok(Box::new(VolatilitySpreads::new(settings)))
        }),
    ];

    for (name, factory) in builtins {
        if let Err(err) = registry.register(name, factory) {
            warn!(error = %err, "built-in script not registered");
        }
    }
}
