//! Live update loop
//!
//! While active, displays the script's live status line on the host at a
//! fixed cadence. At most one loop runs: starting a new one cancels the
//! current loop and waits for it to finish before the new one begins.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ScriptError, ScriptResult};
use crate::sink::HostSink;

/// Notification sent once when a loop ends.
pub const STOPPED_NOTICE: &str = "Stopped script live update.";

/// Called with `true` when a loop starts and `false` when it ends.
pub type LiveToggleHook = Arc<dyn Fn(bool) + Send + Sync>;

/// Produces the line to display, if any.
pub type LiveRenderer = Arc<dyn Fn() -> Option<String> + Send + Sync>;

struct ActiveLoop {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Clone)]
pub struct LiveUpdates {
    sink: Arc<dyn HostSink>,
    interval: Duration,
    render: LiveRenderer,
    on_toggle: LiveToggleHook,
    current: Arc<Mutex<Option<ActiveLoop>>>,
}

impl LiveUpdates {
    pub fn new(
        sink: Arc<dyn HostSink>,
        interval: Duration,
        render: LiveRenderer,
        on_toggle: LiveToggleHook,
    ) -> Self {
        Self {
            sink,
            interval,
            render,
            on_toggle,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether a loop is running and has not been asked to stop.
    pub fn is_active(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .map_or(false, |active| !active.token.is_cancelled() && !active.handle.is_finished())
    }

    /// Starts a loop, replacing any running one. Needs a tokio runtime.
    pub fn start(&self) -> ScriptResult<()> {
        let runtime = Handle::try_current().map_err(|_| ScriptError::NoRuntime)?;

        let mut current = self.current.lock();
        let prior = current.take();
        if let Some(prior) = &prior {
            prior.token.cancel();
        }

        let token = CancellationToken::new();
        let handle = runtime.spawn(run_loop(
            prior.map(|prior| prior.handle),
            token.clone(),
            self.interval,
            Arc::clone(&self.sink),
            Arc::clone(&self.render),
            Arc::clone(&self.on_toggle),
        ));
        *current = Some(ActiveLoop { token, handle });
        Ok(())
    }

    /// Asks the running loop to stop. It notifies the host on its way out.
    pub fn stop(&self) {
        if let Some(active) = self.current.lock().as_ref() {
            active.token.cancel();
        }
    }

    /// Starts when idle, stops when active. Returns the new state.
    pub fn toggle(&self) -> ScriptResult<bool> {
        if self.is_active() {
            self.stop();
            Ok(false)
        } else {
            self.start()?;
            Ok(true)
        }
    }

    /// Stops the running loop and waits for it to finish.
    pub async fn shutdown(&self) {
        let active = self.current.lock().take();
        if let Some(active) = active {
            active.token.cancel();
            if let Err(err) = active.handle.await {
                warn!(error = %err, "live update loop ended abnormally");
            }
        }
    }
}

async fn run_loop(
    prior: Option<JoinHandle<()>>,
    token: CancellationToken,
    interval: Duration,
    sink: Arc<dyn HostSink>,
    render: LiveRenderer,
    on_toggle: LiveToggleHook,
) {
    if let Some(prior) = prior {
        if let Err(err) = prior.await {
            warn!(error = %err, "previous live update loop ended abnormally");
        }
    }
    if token.is_cancelled() {
        return;
    }

    debug!(interval_ms = interval.as_millis() as u64, "live update loop started");
    on_toggle(true);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                if let Some(text) = render() {
                    sink.set_live_text(&text);
                }
            }
        }
    }

    on_toggle(false);
    sink.notify(STOPPED_NOTICE);
}
