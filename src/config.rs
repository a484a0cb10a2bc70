use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::Result;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// number of async worker threads, range [1, 32768), defaults to 4
    pub async_worker_thread_number: u16,
    /// execution config
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// how independent branches are scheduled
    pub mode: ExecutionMode,
    /// per-node timeout in milliseconds, unset means no timeout
    pub node_timeout_ms: Option<u64>,
}

/// Scheduling strategy for one workflow run.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionMode {
    /// Nodes without an ancestor/descendant relationship run concurrently.
    #[default]
    Parallel,
    /// One node at a time, in topological order.
    Sequential,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            async_worker_thread_number: 4,
            execution: ExecutionConfig::default(),
        }
    }
}

impl ExecutionConfig {
    pub fn node_timeout(&self) -> Option<Duration> {
        self.node_timeout_ms.map(Duration::from_millis)
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref())?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        Ok(config)
    }
}
