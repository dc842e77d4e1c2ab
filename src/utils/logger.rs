use anyhow::Context;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: String,
    pub file_dir: Option<String>,
    pub file_prefix: Option<String>,
    pub rolling: Option<String>,
    pub max_files: usize,
}

impl LoggerConfig {
    /// Loads logging configuration from environment variables.
    /// If a variable is not set, it will use a default value.
    /// Filled in variables are: LOG_LEVEL, LOG_FILE_DIR, LOG_FILE_PREFIX, LOG_ROLLING
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            level: get("LOG_LEVEL").unwrap_or(defaults.level),
            file_dir: get("LOG_FILE_DIR"),
            file_prefix: get("LOG_FILE_PREFIX"),
            rolling: get("LOG_ROLLING").or(defaults.rolling),
            max_files: defaults.max_files,
        }
    }

    /// Installs the global subscriber. Keep the returned guard alive for as
    /// long as file output should be flushed.
    pub fn init(&self) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
        let level = Level::from_str(&self.level).unwrap_or(Level::INFO);

        if let Some(dir_str) = self.file_dir.as_deref() {
            let prefix = self.file_prefix.as_deref().unwrap_or("state_helper");

            let rotation = match self.rolling.as_deref() {
                Some("hourly") => Rotation::HOURLY,
                Some("minutely") => Rotation::MINUTELY,
                Some("never") => Rotation::NEVER,
                _ => Rotation::DAILY,
            };

            let appender: RollingFileAppender = RollingFileAppender::builder()
                .rotation(rotation)
                .max_log_files(self.max_files.max(1))
                .filename_prefix(prefix)
                .build(dir_str)
                .with_context(|| format!("failed to create rolling appender in {}", dir_str))?;

            let (nb, guard) = tracing_appender::non_blocking(appender);

            let _ = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(nb)
                .try_init();

            tracing::info!(
                "[StateHelper] logging to dir: {}, prefix: {}, rotation: {:?}",
                dir_str,
                prefix,
                self.rolling
            );
            Ok(Some(guard))
        } else {
            let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
            Ok(None)
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_dir: None,
            file_prefix: None,
            rolling: Some("daily".to_string()),
            max_files: 2,
        }
    }
}

/// Diagnostic line emitted only while `debug_mask` is set.
///
/// Usage:
///   helper_debug!(tunables, "[StateHelper] switching CPU{} offline", core);
#[macro_export]
macro_rules! helper_debug {
    ($tunables:expr, $($arg:tt)*) => {{
        if $tunables.debug() {
            tracing::info!($($arg)*);
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_vars_fill_logger_fields() {
        let vars = HashMap::from([
            ("LOG_LEVEL", "debug"),
            ("LOG_FILE_DIR", "/var/log/state_helper"),
            ("LOG_ROLLING", "hourly"),
        ]);
        let cfg = LoggerConfig::from_vars(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.level, "debug");
        assert_eq!(cfg.file_dir.as_deref(), Some("/var/log/state_helper"));
        assert_eq!(cfg.file_prefix, None);
        assert_eq!(cfg.rolling.as_deref(), Some("hourly"));
        assert_eq!(cfg.max_files, 2);
    }

    #[test]
    fn unset_env_falls_back_to_defaults() {
        let cfg = LoggerConfig::from_vars(|_| None);
        assert_eq!(cfg.level, "info");
        assert!(cfg.file_dir.is_none());
        assert_eq!(cfg.rolling.as_deref(), Some("daily"));
    }
}
