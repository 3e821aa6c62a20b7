use std::path::Path;
use std::time::Duration;

use graphsplit_core::notify::DEFAULT_NOTIFY_CAPACITY;
use graphsplit_graph::PartitionOptions;
use serde::{Deserialize, Serialize};

use crate::backoff::BackoffPolicy;
use crate::error::ConfigError;

/// Timers and retry policies for the three scheduler loops.
///
/// Every field has a default, so an empty TOML document is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Fallback wake-up for the decomposition loop when no signal arrives.
    #[serde(default = "default_decompose_interval_secs")]
    pub decompose_interval_secs: u64,

    /// Sleep when no `created` task exists.
    #[serde(default = "default_dispatch_idle_secs")]
    pub dispatch_idle_secs: u64,

    /// Pause between successful dispatches.
    #[serde(default = "default_dispatch_pause_ms")]
    pub dispatch_pause_ms: u64,

    #[serde(default = "default_dispatch_retry")]
    pub dispatch_retry: BackoffPolicy,

    /// Pause between polls of executing tasks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Sleep when no `executing` task exists.
    #[serde(default = "default_poll_idle_secs")]
    pub poll_idle_secs: u64,

    #[serde(default = "default_poll_retry")]
    pub poll_retry: BackoffPolicy,

    #[serde(default = "default_notify_capacity")]
    pub notify_capacity: usize,

    #[serde(default)]
    pub partition: PartitionOptions,
}

fn default_decompose_interval_secs() -> u64 { 5 }
fn default_dispatch_idle_secs() -> u64 { 5 }
fn default_dispatch_pause_ms() -> u64 { 100 }
fn default_dispatch_retry() -> BackoffPolicy { BackoffPolicy::Fixed { delay_ms: 5_000 } }
fn default_poll_interval_ms() -> u64 { 2_000 }
fn default_poll_idle_secs() -> u64 { 10 }
fn default_poll_retry() -> BackoffPolicy { BackoffPolicy::Fixed { delay_ms: 2_000 } }
fn default_notify_capacity() -> usize { DEFAULT_NOTIFY_CAPACITY }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            decompose_interval_secs: default_decompose_interval_secs(),
            dispatch_idle_secs: default_dispatch_idle_secs(),
            dispatch_pause_ms: default_dispatch_pause_ms(),
            dispatch_retry: default_dispatch_retry(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_idle_secs: default_poll_idle_secs(),
            poll_retry: default_poll_retry(),
            notify_capacity: default_notify_capacity(),
            partition: PartitionOptions::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn decompose_interval(&self) -> Duration {
        Duration::from_secs(self.decompose_interval_secs)
    }

    pub fn dispatch_idle(&self) -> Duration {
        Duration::from_secs(self.dispatch_idle_secs)
    }

    pub fn dispatch_pause(&self) -> Duration {
        Duration::from_millis(self.dispatch_pause_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_idle(&self) -> Duration {
        Duration::from_secs(self.poll_idle_secs)
    }
}
