//! Script Runner
//!
//! The script side of the cross-process model: a blocking loop that polls the
//! inbound channel, dispatches each message to the script instance, and
//! renders live text between messages. `Shutdown` is the normal way out.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use script_bus::{channel, EventBusError, EventReceiver, ScriptEndpoint};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::RuntimeConfig;
use crate::instance::{Flow, ScriptInstance};
use crate::script::Script;

/// Why a runner loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerExit {
    /// A `Shutdown` message was processed.
    Shutdown,
    /// The host dropped its side of the channel.
    Disconnected,
}

/// Summary returned when the loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub exit: RunnerExit,
    /// Messages handled, including the final `Shutdown`
    pub processed: u64,
}

/// Host-side handle on a runner thread.
#[derive(Debug)]
pub struct RunnerHandle {
    thread: JoinHandle<()>,
    done: EventReceiver<RunReport>,
}

impl RunnerHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits up to `timeout` for the loop to end.
    ///
    /// `Timeout` means the script is still inside a hook; dropping the
    /// handle then detaches the thread. `Disconnected` means the thread died
    /// without reporting.
    pub fn wait(self, timeout: Duration) -> Result<RunReport, EventBusError> {
        let report = self.done.recv_timeout(timeout)?;
        if self.thread.join().is_err() {
            warn!("runner thread panicked after reporting");
        }
        Ok(report)
    }
}

pub struct ScriptRunner {
    instance: ScriptInstance,
    endpoint: ScriptEndpoint,
    config: RuntimeConfig,
    run_id: Uuid,
}

impl ScriptRunner {
    pub fn new(script: Box<dyn Script>, endpoint: ScriptEndpoint, config: RuntimeConfig) -> Self {
        let instance = ScriptInstance::new(script, endpoint.outbound.clone(), &config);
        Self {
            instance,
            endpoint,
            config,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Runs until `Shutdown` arrives or the host disconnects.
    pub fn run(mut self) -> RunReport {
        let span = info_span!("script", script = %self.instance.name(), run_id = %self.run_id);
        let _entered = span.enter();
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "script runner started"
        );

        let mut processed = 0u64;
        let exit = loop {
            match self.endpoint.inbound.recv_timeout(self.config.poll_interval) {
                Ok(message) => {
                    processed += 1;
                    if self.instance.handle(message) == Flow::Shutdown {
                        break RunnerExit::Shutdown;
                    }
                }
                Err(err) if err.is_transient() => {}
                Err(EventBusError::Disconnected) => {
                    warn!("host channel disconnected without shutdown");
                    break RunnerExit::Disconnected;
                }
                Err(err) => {
                    warn!(error = %err, "script inbound channel failed");
                    break RunnerExit::Disconnected;
                }
            }
            self.instance.render_live_if_due(Instant::now());
        };

        info!(?exit, processed, "script runner stopped");
        RunReport { exit, processed }
    }

    /// Moves the runner onto a dedicated OS thread.
    pub fn spawn(self) -> io::Result<RunnerHandle> {
        let (report_tx, done) = channel();
        let thread = thread::Builder::new()
            .name(format!("script-{}", self.instance.name()))
            .spawn(move || {
                let report = self.run();
                if report_tx.send(report).is_err() {
                    debug!("host stopped waiting for the runner report");
                }
            })?;
        Ok(RunnerHandle { thread, done })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ScriptContext;
    use crate::error::ScriptResult;
    use chrono::Utc;
    use pmm_core::ParameterValues;
    use rust_decimal::Decimal;
    use script_bus::{script_channels, HostMessage, ScriptMessage, TickSnapshot};

    struct Echo;

    impl Script for Echo {
        fn on_command(
            &mut self,
            ctx: &mut ScriptContext,
            cmd: &str,
            _args: &[String],
        ) -> ScriptResult<()> {
            ctx.notify(cmd);
            Ok(())
        }
    }

    fn fast_config() -> RuntimeConfig {
        RuntimeConfig {
            poll_interval: Duration::from_millis(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_shutdown_stops_processing() {
        let (host, script) = script_channels();
        for cmd in ["a", "b"] {
            host.to_script.send(HostMessage::command(cmd, vec![])).unwrap();
        }
        host.to_script.send(HostMessage::Shutdown).unwrap();
        host.to_script.send(HostMessage::command("c", vec![])).unwrap();

        let report = ScriptRunner::new(Box::new(Echo), script, fast_config()).run();

        assert_eq!(report, RunReport { exit: RunnerExit::Shutdown, processed: 3 });
        let seen: Vec<_> = host.from_script.drain().collect();
        assert_eq!(
            seen,
            vec![ScriptMessage::Notify("a".into()), ScriptMessage::Notify("b".into())]
        );
    }

    #[test]
    fn test_disconnect_ends_loop() {
        let (host, script) = script_channels();
        let handle = ScriptRunner::new(Box::new(Echo), script, fast_config())
            .spawn()
            .unwrap();
        drop(host);
        let report = handle.wait(Duration::from_secs(2)).unwrap();
        assert_eq!(report.exit, RunnerExit::Disconnected);
    }

    #[test]
    fn test_wait_times_out_on_busy_script() {
        struct Busy;
        impl Script for Busy {
            fn on_tick(&mut self, _ctx: &mut ScriptContext) -> ScriptResult<()> {
                thread::sleep(Duration::from_millis(500));
                Ok(())
            }
        }

        let (host, script) = script_channels();
        let handle = ScriptRunner::new(Box::new(Busy), script, fast_config())
            .spawn()
            .unwrap();
        let snapshot = TickSnapshot::new(Utc::now(), Decimal::ONE, ParameterValues::new());
        host.to_script.send(HostMessage::Tick(snapshot)).unwrap();
        host.to_script.send(HostMessage::Shutdown).unwrap();
        thread::sleep(Duration::from_millis(20));

        let started = Instant::now();
        let timeout = Duration::from_millis(50);
        assert_eq!(handle.wait(timeout), Err(EventBusError::Timeout(timeout)));
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_unrecognized_message_does_not_stop_loop() {
        let (host, script) = script_channels();
        host.to_script.send(HostMessage::command("a", vec![])).unwrap();
        host.to_script.send(HostMessage::Unrecognized("rebalance".into())).unwrap();
        host.to_script.send(HostMessage::command("b", vec![])).unwrap();
        host.to_script.send(HostMessage::Shutdown).unwrap();

        let report = ScriptRunner::new(Box::new(Echo), script, fast_config()).run();

        assert_eq!(report, RunReport { exit: RunnerExit::Shutdown, processed: 4 });
        let seen: Vec<_> = host.from_script.drain().collect();
        assert_eq!(
            seen,
            vec![ScriptMessage::Notify("a".into()), ScriptMessage::Notify("b".into())]
        );
    }
}
