//! Both scheduling models observe the same script behaviour.

use std::sync::Arc;
use std::time::Duration;

use pmm_script_host::config::HostConfig;
use pmm_script_host::host::PaperHost;
use script_engine::{
    RecordingSink, RuntimeConfig, Script, ScriptAdapter, ScriptBridge, ScriptContext,
    ScriptDriver, ScriptResult, SinkEvent,
};

/// Reports each tick's mid price as a log line.
struct MidLogger;

impl Script for MidLogger {
    fn on_tick(&mut self, ctx: &mut ScriptContext) -> ScriptResult<()> {
        ctx.log(ctx.mid_price().to_string());
        Ok(())
    }
}

fn logged(events: &[SinkEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            SinkEvent::Log(text) => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_in_process_and_cross_process_agree() {
    let host = PaperHost::new(&HostConfig::default());
    let snapshots: Vec<_> = (0..10).map(|_| host.next_tick().snapshot).collect();
    let expected: Vec<String> = snapshots.iter().map(|s| s.mid_price.to_string()).collect();

    let in_process_sink = Arc::new(RecordingSink::new());
    let mut adapter =
        ScriptAdapter::new(in_process_sink.clone(), RuntimeConfig::default()).unwrap();
    adapter.attach(Box::new(MidLogger));
    for snapshot in snapshots.iter().cloned() {
        adapter.tick(snapshot).unwrap();
    }
    adapter.shutdown().unwrap();
    assert_eq!(logged(&in_process_sink.events()), expected);

    let cross_process_sink = Arc::new(RecordingSink::new());
    let config = RuntimeConfig {
        poll_interval: Duration::from_millis(5),
        ..Default::default()
    };
    let mut bridge =
        ScriptBridge::spawn(Box::new(MidLogger), cross_process_sink.clone(), config).unwrap();
    for snapshot in snapshots {
        bridge.tick(snapshot).unwrap();
    }
    bridge.shutdown().unwrap();
    assert_eq!(logged(&cross_process_sink.events()), expected);
}
