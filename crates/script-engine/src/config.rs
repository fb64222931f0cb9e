use std::time::Duration;

use crate::context::DEFAULT_MID_PRICE_HISTORY;
use crate::error::{ScriptError, ScriptResult};

/// Timing and capacity settings for running a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// How long the cross-process runner blocks on its inbound channel
    /// before checking whether live text is due.
    pub poll_interval: Duration,

    /// Cadence of live status rendering, on both sides of the bridge.
    pub live_interval: Duration,

    /// Number of mid prices kept for sampling.
    pub mid_price_history: usize,

    /// How long a bridge shutdown waits for the script thread before
    /// detaching it.
    pub shutdown_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            live_interval: Duration::from_secs(1),
            mid_price_history: DEFAULT_MID_PRICE_HISTORY,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> ScriptResult<()> {
        if self.poll_interval.is_zero() {
            return Err(ScriptError::Runner("poll interval must be non-zero".into()));
        }
        if self.live_interval.is_zero() {
            return Err(ScriptError::Runner("live update interval must be non-zero".into()));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(ScriptError::Runner("shutdown timeout must be non-zero".into()));
        }
        if self.mid_price_history == 0 {
            return Err(ScriptError::Runner(
                "mid price history must hold at least one sample".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RuntimeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_intervals_are_rejected() {
        let config = RuntimeConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RuntimeConfig {
            live_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RuntimeConfig {
            shutdown_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RuntimeConfig {
            mid_price_history: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
