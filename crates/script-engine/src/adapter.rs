//! In-process adapter
//!
//! Runs the script on the host's own thread. Messages still travel over the
//! bridge channels, but every call drains them before returning, so hooks run
//! synchronously inside the host's call.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use script_bus::{script_channels, EventReceiver, EventSender, HostMessage, ScriptMessage};
use tracing::{info, warn};

use crate::config::RuntimeConfig;
use crate::driver::{HostLink, ScriptDriver};
use crate::error::ScriptResult;
use crate::instance::{Flow, ScriptInstance};
use crate::registry::ScriptRegistry;
use crate::script::Script;
use crate::sink::HostSink;

pub struct ScriptAdapter {
    link: HostLink,
    inbound: EventReceiver<HostMessage>,
    outbound: EventSender<ScriptMessage>,
    instance: Option<ScriptInstance>,
    config: RuntimeConfig,
}

impl ScriptAdapter {
    /// An adapter with no script loaded.
    pub fn new(sink: Arc<dyn HostSink>, config: RuntimeConfig) -> ScriptResult<Self> {
        config.validate()?;

        let (host, script) = script_channels();
        Ok(Self {
            link: HostLink::new(host, sink, config.live_interval),
            inbound: script.inbound,
            outbound: script.outbound,
            instance: None,
            config,
        })
    }

    /// Loads the manifest at `path`. On failure the adapter keeps running
    /// without a script.
    pub fn load(&mut self, registry: &ScriptRegistry, path: &Path) -> ScriptResult<()> {
        let loaded = registry.load(path)?;
        self.attach(loaded.script);
        Ok(())
    }

    /// Installs a script, replacing any current one.
    pub fn attach(&mut self, script: Box<dyn Script>) {
        let discarded = self.inbound.drain().count();
        if discarded > 0 {
            warn!(discarded, "dropping messages queued for the previous script");
        }

        let instance = ScriptInstance::new(script, self.outbound.clone(), &self.config);
        info!(script = %instance.name(), "script attached in-process");
        self.instance = Some(instance);
    }

    pub fn script_name(&self) -> Option<&str> {
        self.instance.as_ref().map(ScriptInstance::name)
    }

    fn process_inbound(&mut self) {
        while let Ok(message) = self.inbound.try_recv() {
            let Some(instance) = self.instance.as_mut() else {
                continue;
            };
            if instance.handle(message) == Flow::Shutdown {
                info!(script = %instance.name(), "script shut down");
                self.instance = None;
            }
        }

        if let Some(instance) = self.instance.as_mut() {
            instance.render_live_if_due(Instant::now());
        }
    }
}

impl ScriptDriver for ScriptAdapter {
    fn link(&self) -> &HostLink {
        &self.link
    }

    fn is_active(&self) -> bool {
        self.instance.is_some()
    }

    fn forward(&mut self, message: HostMessage) -> ScriptResult<()> {
        if self.instance.is_none() {
            return Ok(());
        }
        self.link.send(message)?;
        self.pump();
        Ok(())
    }

    fn pump(&mut self) -> usize {
        self.process_inbound();
        self.link.pump()
    }

    fn shutdown(&mut self) -> ScriptResult<()> {
        self.link.live().stop();
        if self.instance.is_some() {
            self.link.send(HostMessage::Shutdown)?;
            self.pump();
        }
        Ok(())
    }
}
