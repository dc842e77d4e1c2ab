pub use sim::*;
pub use sysfs::*;

mod sim;
mod sysfs;

use crate::error::GovernorResult;

/// The boot core. It is never requested offline.
pub const BOOT_CORE: usize = 0;

/// Hotplug control over the platform's cores.
///
/// The governor keeps no per-core state of its own; every decision is made
/// against what this reports at the moment of asking.
pub trait CoreControl: Send + Sync + 'static {
    /// Ask the platform to park `core`. The platform may refuse.
    fn request_offline(&self, core: usize) -> GovernorResult<()>;

    /// Ask the platform to bring `core` back into the scheduling pool.
    fn request_online(&self, core: usize) -> GovernorResult<()>;

    fn is_online(&self, core: usize) -> bool;

    /// Every core id the platform could ever bring online, ascending.
    fn possible_cores(&self) -> &[usize];

    #[inline]
    fn total_cores(&self) -> usize {
        self.possible_cores().len()
    }

    fn count_online(&self) -> usize {
        self.possible_cores()
            .iter()
            .filter(|&&core| self.is_online(core))
            .count()
    }
}
