//! Cross-process bridge
//!
//! Runs the script on a dedicated thread behind two unbounded channels. The
//! host forwards events without waiting for the script and collects its
//! output with [`ScriptDriver::pump`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use script_bus::{script_channels, EventBusError, HostMessage};
use tracing::{info, warn};

use crate::config::RuntimeConfig;
use crate::driver::{HostLink, ScriptDriver};
use crate::error::{ScriptError, ScriptResult};
use crate::registry::ScriptRegistry;
use crate::runner::{RunnerHandle, ScriptRunner};
use crate::script::Script;
use crate::sink::HostSink;

pub struct ScriptBridge {
    link: HostLink,
    worker: Option<RunnerHandle>,
    script_name: String,
    shutdown_timeout: Duration,
}

impl ScriptBridge {
    /// Starts `script` on its own thread.
    pub fn spawn(
        script: Box<dyn Script>,
        sink: Arc<dyn HostSink>,
        config: RuntimeConfig,
    ) -> ScriptResult<Self> {
        config.validate()?;

        let script_name = script.name().to_string();
        let (host, endpoint) = script_channels();
        let live_interval = config.live_interval;
        let shutdown_timeout = config.shutdown_timeout;
        let runner = ScriptRunner::new(script, endpoint, config);
        info!(script = %script_name, run_id = %runner.run_id(), "spawning script runner");
        let worker = runner
            .spawn()
            .map_err(|err| ScriptError::Runner(err.to_string()))?;

        Ok(Self {
            link: HostLink::new(host, sink, live_interval),
            worker: Some(worker),
            script_name,
            shutdown_timeout,
        })
    }

    /// Loads the manifest at `path` and starts its entry point.
    pub fn load(
        registry: &ScriptRegistry,
        path: &Path,
        sink: Arc<dyn HostSink>,
        config: RuntimeConfig,
    ) -> ScriptResult<Self> {
        let loaded = registry.load(path)?;
        Self::spawn(loaded.script, sink, config)
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }
}

impl ScriptDriver for ScriptBridge {
    fn link(&self) -> &HostLink {
        &self.link
    }

    fn is_active(&self) -> bool {
        self.worker
            .as_ref()
            .map_or(false, |worker| !worker.is_finished())
    }

    fn forward(&mut self, message: HostMessage) -> ScriptResult<()> {
        if self.worker.is_none() {
            return Ok(());
        }
        self.link.send(message)
    }

    fn pump(&mut self) -> usize {
        self.link.pump()
    }

    fn shutdown(&mut self) -> ScriptResult<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        self.link.live().stop();
        match self.link.send(HostMessage::Shutdown) {
            Ok(()) | Err(ScriptError::Bus(EventBusError::Disconnected)) => {}
            Err(err) => return Err(err),
        }

        let outcome = worker.wait(self.shutdown_timeout);
        self.link.pump();
        match outcome {
            Ok(report) => {
                info!(
                    script = %self.script_name,
                    exit = ?report.exit,
                    processed = report.processed,
                    "script bridge closed"
                );
                Ok(())
            }
            Err(EventBusError::Timeout(timeout)) => {
                warn!(
                    script = %self.script_name,
                    timeout_ms = timeout.as_millis() as u64,
                    "script did not stop in time, detaching its thread"
                );
                Ok(())
            }
            Err(_) => Err(ScriptError::Runner(format!(
                "runner thread for `{}` exited without a report",
                self.script_name
            ))),
        }
    }
}

impl Drop for ScriptBridge {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(err) = self.shutdown() {
                warn!(
                    script = %self.script_name,
                    error = %err,
                    "script bridge did not close cleanly"
                );
            }
        }
    }
}
