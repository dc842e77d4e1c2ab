use crate::error::{GovernorError, GovernorResult};
use crossbeam::utils::CachePadded;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const ATTR_ENABLED: &str = "enabled";
pub const ATTR_MAX_CPUS_ONLINE: &str = "max_cpus_online";
pub const ATTR_DEBUG_MASK: &str = "debug_mask";

/// Process-wide governor settings.
///
/// Every field is a single atomic scalar. Readers never see a torn value,
/// only possibly a stale one, which just changes what the next pass
/// converges to.
pub struct Tunables {
    enabled: CachePadded<AtomicBool>,
    max_online: CachePadded<AtomicUsize>,
    debug: CachePadded<AtomicBool>,
    total_cores: usize,
}

/// Plain copy of the settings, for status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TunablesSnapshot {
    pub enabled: bool,
    pub max_cpus_online: usize,
    pub debug_mask: bool,
}

impl Tunables {
    /// Compiled-in defaults: enabled, every core allowed online, debug on.
    pub fn new(total_cores: usize) -> Self {
        let total_cores = total_cores.max(1);
        Self {
            enabled: CachePadded::new(AtomicBool::new(true)),
            max_online: CachePadded::new(AtomicUsize::new(total_cores)),
            debug: CachePadded::new(AtomicBool::new(true)),
            total_cores,
        }
    }

    /// Builds a store from loaded values, validating `max_online` the same
    /// way a runtime write would.
    pub fn with_values(
        total_cores: usize,
        enabled: bool,
        max_online: Option<usize>,
        debug: bool,
    ) -> GovernorResult<Self> {
        let t = Self::new(total_cores);
        if let Some(max) = max_online {
            t.set_max_online(max)?;
        }
        t.set_enabled(enabled);
        t.set_debug(debug);
        Ok(t)
    }

    #[inline]
    pub fn total_cores(&self) -> usize {
        self.total_cores
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Stores the flag and returns the previous value.
    #[inline]
    pub fn set_enabled(&self, v: bool) -> bool {
        self.enabled.swap(v, Ordering::AcqRel)
    }

    #[inline]
    pub fn max_online(&self) -> usize {
        self.max_online.load(Ordering::Acquire)
    }

    /// Accepts only `[1, total_cores]`.
    pub fn set_max_online(&self, v: usize) -> GovernorResult<()> {
        if v < 1 || v > self.total_cores {
            return Err(GovernorError::invalid(ATTR_MAX_CPUS_ONLINE, v.to_string()));
        }
        self.max_online.store(v, Ordering::Release);
        Ok(())
    }

    #[inline]
    pub fn debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_debug(&self, v: bool) -> bool {
        self.debug.swap(v, Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TunablesSnapshot {
        TunablesSnapshot {
            enabled: self.enabled(),
            max_cpus_online: self.max_online(),
            debug_mask: self.debug(),
        }
    }
}

impl fmt::Debug for Tunables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tunables")
            .field("enabled", &self.enabled())
            .field("max_online", &self.max_online())
            .field("debug", &self.debug())
            .field("total_cores", &self.total_cores)
            .finish()
    }
}

/// Parses an attribute write as a decimal unsigned integer.
pub fn parse_uint(attr: &'static str, raw: &str) -> GovernorResult<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| GovernorError::invalid(attr, raw))
}

/// Parses a 0/1 attribute write.
pub fn parse_flag(attr: &'static str, raw: &str) -> GovernorResult<bool> {
    match parse_uint(attr, raw)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(GovernorError::invalid(attr, raw)),
    }
}
