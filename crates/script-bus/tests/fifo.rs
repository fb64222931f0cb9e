//! Cross-thread ordering tests for the bridge channels.

use std::thread;
use std::time::Duration;

use script_bus::{script_channels, HostMessage, ScriptMessage};

/// Messages sent from one thread arrive in send order on the other
#[test]
fn test_host_to_script_is_fifo_across_threads() {
    let (host, script) = script_channels();

    let consumer = thread::spawn(move || {
        let mut seen = Vec::new();
        loop {
            match script.inbound.recv_timeout(Duration::from_millis(50)) {
                Ok(HostMessage::Shutdown) => break,
                Ok(HostMessage::CommandRequest { cmd, .. }) => seen.push(cmd),
                Ok(other) => panic!("unexpected message {other:?}"),
                Err(err) if err.is_transient() => continue,
                Err(err) => panic!("channel failed: {err}"),
            }
        }
        seen
    });

    for i in 0..500 {
        host.to_script
            .send(HostMessage::command(format!("cmd-{i}"), Vec::new()))
            .unwrap();
    }
    host.to_script.send(HostMessage::Shutdown).unwrap();

    let seen = consumer.join().unwrap();
    let expected: Vec<String> = (0..500).map(|i| format!("cmd-{i}")).collect();
    assert_eq!(seen, expected);
}

/// Dropping the script endpoint disconnects the host's receiver
#[test]
fn test_script_drop_disconnects_host_side() {
    let (host, script) = script_channels();
    script
        .outbound
        .send(ScriptMessage::Log("last words".into()))
        .unwrap();
    drop(script);

    assert_eq!(
        host.from_script.drain().collect::<Vec<_>>(),
        vec![ScriptMessage::Log("last words".into())]
    );
    assert!(host.to_script.send(HostMessage::StatusRequest).is_err());
}
