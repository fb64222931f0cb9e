//! # Script Engine
//!
//! Runs user strategy scripts beside a market making host and keeps the two
//! in sync.
//!
//! ## Architecture
//!
//! - [`Script`]: the hooks a strategy script implements
//! - [`ScriptContext`]: market state, reactive [`ParameterSet`] and outbound calls
//! - [`ScriptInstance`]: dispatches host messages to hooks, isolating failures
//! - [`ScriptAdapter`]: in-process model, hooks run inside the host's call
//! - [`ScriptBridge`] + [`ScriptRunner`]: script on its own thread behind channels
//! - [`LiveUpdates`]: host-side live status loop
//! - [`ScriptRegistry`]: named factories resolved from a TOML manifest
//!
//! ## Example
//!
//! ```ignore
//! use script_engine::{RuntimeConfig, ScriptBridge, ScriptDriver, ScriptRegistry};
//!
//! let registry = ScriptRegistry::with_builtin();
//! let mut bridge = ScriptBridge::load(&registry, path, sink, RuntimeConfig::default())?;
//! bridge.start(market_info)?;
//! bridge.tick(snapshot)?;
//! bridge.pump();
//! bridge.shutdown()?;
//! ```

#![warn(rust_2018_idioms)]

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod instance;
pub mod live;
pub mod params;
pub mod registry;
pub mod runner;
pub mod sampling;
pub mod script;
pub mod scripts;
pub mod sink;

pub use adapter::ScriptAdapter;
pub use bridge::ScriptBridge;
pub use config::RuntimeConfig;
pub use context::{ScriptContext, DEFAULT_MID_PRICE_HISTORY};
pub use driver::{HostLink, ScriptDriver, LIVE_COMMAND, NO_SCRIPT_NOTICE};
pub use error::{ScriptError, ScriptResult};
pub use instance::{Flow, ScriptInstance};
pub use live::{LiveUpdates, STOPPED_NOTICE};
pub use params::ParameterSet;
pub use registry::{parse_settings, LoadedScript, ScriptFactory, ScriptManifest, ScriptRegistry};
pub use runner::{RunReport, RunnerExit, ScriptRunner};
pub use script::Script;
pub use sink::{deliver, HostSink, LiveTextCell, RecordingSink, SinkEvent};
