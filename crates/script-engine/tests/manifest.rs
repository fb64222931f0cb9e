//! Loading built-in scripts from manifests and driving them in-process.

use std::io::Write;
use std::sync::Arc;

use chrono::Utc;
use pmm_core::{ParameterName, ParameterValues};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use script_bus::TickSnapshot;
use script_engine::{
    RecordingSink, RuntimeConfig, ScriptAdapter, ScriptDriver, ScriptError, ScriptRegistry,
    SinkEvent,
};
use tempfile::NamedTempFile;

fn manifest(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn snapshot(mid_price: Decimal) -> TickSnapshot {
    let params = ParameterValues::new()
        .with(ParameterName::BuyLevels, 1i64)
        .unwrap()
        .with(ParameterName::SellLevels, 1i64)
        .unwrap();
    TickSnapshot::new(Utc::now(), mid_price, params)
}

#[test]
fn test_builtin_registry_lists_shipped_scripts() {
    let registry = ScriptRegistry::with_builtin();
    let names: Vec<_> = registry.names().collect();
    assert_eq!(names, vec!["price_band", "volatility_spreads"]);
}

#[test]
fn test_price_band_manifest_drives_levels() {
    let file = manifest(
        r#"
[script]
entry = "price_band"

[script.settings]
avg_interval = 1
avg_length = 2
upper_bound_pct = "0.01"
lower_bound_pct = "0.01"
"#,
    );

    let sink = Arc::new(RecordingSink::new());
    let mut adapter = ScriptAdapter::new(sink.clone(), RuntimeConfig::default()).unwrap();
    adapter
        .load(&ScriptRegistry::with_builtin(), file.path())
        .unwrap();
    assert_eq!(adapter.script_name(), Some("PriceBand"));

    adapter.tick(snapshot(dec!(100))).unwrap();
    adapter.tick(snapshot(dec!(90))).unwrap();

    let levels: Vec<_> = sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            SinkEvent::Parameter(change) => Some(change.name),
            _ => None,
        })
        .collect();
    assert_eq!(levels, vec![ParameterName::SellLevels]);
}

#[test]
fn test_bad_settings_leave_adapter_idle() {
    let file = manifest("[script]\nentry = \"volatility_spreads\"\n\n[script.settings]\nvolatility_length = \"ten\"\n");

    let sink = Arc::new(RecordingSink::new());
    let mut adapter = ScriptAdapter::new(sink, RuntimeConfig::default()).unwrap();
    let err = adapter
        .load(&ScriptRegistry::with_builtin(), file.path())
        .unwrap_err();

    assert!(matches!(err, ScriptError::Settings { ref name, .. } if name == "volatility_spreads"));
    assert!(!adapter.is_active());
}
