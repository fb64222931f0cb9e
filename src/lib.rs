//! # PMM Script Host
//!
//! A market making host that runs a user strategy script beside it and lets
//! the script adjust the strategy while it trades.
//!
//! ## Architecture
//!
//! The system is organized into modular crates:
//! - `pmm-core`: market, order and event types plus the strategy parameter vocabulary
//! - `script-bus`: host <-> script message vocabulary, channels and frame codec
//! - `script-engine`: script runtime, reactive parameters, adapter, bridge and live updates
//!
//! This crate adds the host side: layered configuration, a paper trading host
//! implementing [`script_engine::HostSink`], and tracing setup for the binary.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications, missing_debug_implementations)]

pub mod config;
pub mod host;
pub mod telemetry;

pub use config::{ConfigError, HostConfig, SchedulingModel};
pub use host::{default_parameters, PaperHost, PaperTick};

/// Re-exports for driving scripts from the host
pub mod prelude {
    pub use crate::config::{HostConfig, SchedulingModel};
    pub use crate::host::PaperHost;
    pub use pmm_core::{MarketInfo, ParameterChange, ParameterName, ParameterValue};
    pub use script_engine::{
        HostSink, RuntimeConfig, Script, ScriptAdapter, ScriptBridge, ScriptContext,
        ScriptDriver, ScriptRegistry,
    };
}
