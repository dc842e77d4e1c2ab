use crate::error::{GovernorError, GovernorResult, Transition};
use crate::platform::CoreControl;
use anyhow::{Context, bail};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_SYSFS_ROOT: &str = "/sys/devices/system/cpu";

/// Linux CPU hotplug through `/sys/devices/system/cpu/cpuN/online`.
#[derive(Debug, Clone)]
pub struct SysfsCores {
    root: PathBuf,
    possible: Vec<usize>,
}

impl SysfsCores {
    /// Reads the `possible` mask under `root` once; it does not change at runtime.
    pub fn open(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mask_path = root.join("possible");
        let raw = fs::read_to_string(&mask_path)
            .with_context(|| format!("failed to read {}", mask_path.display()))?;
        let possible = parse_cpu_list(&raw)
            .with_context(|| format!("malformed cpu list in {}", mask_path.display()))?;
        if possible.is_empty() {
            bail!("no possible cpus listed in {}", mask_path.display());
        }
        Ok(Self { root, possible })
    }

    fn online_file(&self, core: usize) -> PathBuf {
        self.root.join(format!("cpu{core}")).join("online")
    }

    fn write_online(&self, core: usize, action: Transition) -> GovernorResult<()> {
        let value = match action {
            Transition::Offline => "0",
            Transition::Online => "1",
        };
        // Never create the knob: a core without one is not hotpluggable.
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.online_file(core))
            .and_then(|mut f| f.write_all(value.as_bytes()))
            .map_err(|e| GovernorError::transition(core, action, e))
    }
}

impl CoreControl for SysfsCores {
    fn request_offline(&self, core: usize) -> GovernorResult<()> {
        self.write_online(core, Transition::Offline)
    }

    fn request_online(&self, core: usize) -> GovernorResult<()> {
        self.write_online(core, Transition::Online)
    }

    fn is_online(&self, core: usize) -> bool {
        match fs::read_to_string(self.online_file(core)) {
            Ok(s) => s.trim() == "1",
            // Cores without an `online` knob (usually cpu0) cannot be unplugged.
            Err(_) => self.root.join(format!("cpu{core}")).is_dir(),
        }
    }

    fn possible_cores(&self) -> &[usize] {
        &self.possible
    }
}

/// Parses a kernel cpu list such as `0-3,6,8-9`.
pub fn parse_cpu_list(raw: &str) -> anyhow::Result<Vec<usize>> {
    let mut out = Vec::new();
    for part in raw.trim().split(',').filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: usize = lo.trim().parse().with_context(|| format!("bad range {part}"))?;
                let hi: usize = hi.trim().parse().with_context(|| format!("bad range {part}"))?;
                if hi < lo {
                    bail!("inverted range {part}");
                }
                out.extend(lo..=hi);
            }
            None => out.push(part.trim().parse().with_context(|| format!("bad cpu {part}"))?),
        }
    }
    out.sort_unstable();
    out.dedup();
    Ok(out)
}
