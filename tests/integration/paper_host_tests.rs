//! The paper host driven by a script over the cross-process bridge.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pmm_core::{ParameterName, ParameterValue};
use pmm_script_host::config::HostConfig;
use pmm_script_host::host::PaperHost;
use rust_decimal_macros::dec;
use script_engine::{RuntimeConfig, Script, ScriptBridge, ScriptContext, ScriptDriver, ScriptResult};

/// Stops quoting bids on the third tick and asks the host to stop on the fifth.
struct Throttle {
    ticks: u32,
}

impl Script for Throttle {
    fn on_tick(&mut self, ctx: &mut ScriptContext) -> ScriptResult<()> {
        self.ticks += 1;
        if self.ticks == 3 {
            ctx.parameters_mut().set_buy_levels(0);
        }
        if self.ticks == 5 {
            ctx.request_stop("enough");
        }
        Ok(())
    }
}

fn runtime() -> RuntimeConfig {
    RuntimeConfig {
        poll_interval: Duration::from_millis(5),
        ..Default::default()
    }
}

fn wait_for(bridge: &mut ScriptBridge, done: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        bridge.pump();
        if done() {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("host never reached the expected state");
}

#[test]
fn test_script_writes_reach_the_authoritative_parameters() {
    let host = Arc::new(PaperHost::new(&HostConfig::default()));
    let mut bridge =
        ScriptBridge::spawn(Box::new(Throttle { ticks: 0 }), host.clone(), runtime()).unwrap();

    for _ in 0..3 {
        bridge.tick(host.next_tick().snapshot).unwrap();
    }
    wait_for(&mut bridge, || {
        host.parameters().get(ParameterName::BuyLevels) == Some(&ParameterValue::Integer(0))
    });

    let tick = host.next_tick();
    assert!(tick.snapshot.orders.iter().all(|order| !order.is_buy));
    bridge.shutdown().unwrap();
}

#[test]
fn test_stop_request_reaches_host() {
    let host = Arc::new(PaperHost::new(&HostConfig::default()));
    let mut bridge =
        ScriptBridge::spawn(Box::new(Throttle { ticks: 0 }), host.clone(), runtime()).unwrap();

    for _ in 0..5 {
        bridge.tick(host.next_tick().snapshot).unwrap();
    }
    wait_for(&mut bridge, || host.stop_reason().is_some());
    assert_eq!(host.stop_reason().as_deref(), Some("enough"));
    bridge.shutdown().unwrap();
}

#[test]
fn test_tick_snapshot_carries_host_parameters() {
    let host = PaperHost::new(&HostConfig::default());
    let tick = host.next_tick();
    assert_eq!(
        tick.snapshot.parameters.get(ParameterName::BidSpread),
        Some(&ParameterValue::Decimal(dec!(0.01)))
    );
    assert_eq!(tick.snapshot.orders.len(), 2);
}
