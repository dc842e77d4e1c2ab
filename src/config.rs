use crate::platform::DEFAULT_SYSFS_ROOT;
use crate::utils::logger::LoggerConfig;
use crate::utils::params_io::load_cfg_merge;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_PREFIX: &str = "STATE_HELPER";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GovernorConfig {
    pub enabled: bool,
    /// `None` means every possible core.
    pub max_cpus_online: Option<usize>,
    pub debug_mask: bool,
    /// Core the helper worker is pinned to.
    pub worker_core: Option<usize>,
    pub sysfs_root: Option<String>,
    pub logger: LoggerConfig,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_cpus_online: None,
            debug_mask: true,
            worker_core: None,
            sysfs_root: None,
            logger: LoggerConfig::default(),
        }
    }
}

impl GovernorConfig {
    /// Optional file merged with `STATE_HELPER__*` environment variables.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        load_cfg_merge(path, Some(ENV_PREFIX))
    }

    pub fn sysfs_root(&self) -> &str {
        self.sysfs_root.as_deref().unwrap_or(DEFAULT_SYSFS_ROOT)
    }
}
