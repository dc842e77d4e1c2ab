use crate::error::Transition;
use crate::helper_debug;
use crate::platform::{BOOT_CORE, CoreControl};
use crate::state::StateSource;
use crate::target::compute_target;
use crate::tunables::Tunables;
use std::sync::Arc;

/// What a single reconciliation pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Governor disabled; nothing was looked at.
    Disabled,
    /// Live count already matched the target.
    AlreadyAchieved { target: usize },
    /// Cores were parked or woken. `online` is the live count afterwards.
    Adjusted {
        target: usize,
        action: Transition,
        switched: Vec<usize>,
        refused: Vec<usize>,
        online: usize,
    },
}

impl PassOutcome {
    pub fn is_noop(&self) -> bool {
        !matches!(self, PassOutcome::Adjusted { .. })
    }
}

/// Brings the live online-core count toward the current target.
///
/// Only ever driven from the single helper worker, so passes never overlap
/// and the transition loop needs no locking of its own. Live state is
/// re-read after every transition instead of planning up front; cores moved
/// by someone else mid-pass are simply accounted for.
pub struct Reconciler {
    tunables: Arc<Tunables>,
    cores: Arc<dyn CoreControl>,
    state: Arc<dyn StateSource>,
}

impl Reconciler {
    pub fn new(
        tunables: Arc<Tunables>,
        cores: Arc<dyn CoreControl>,
        state: Arc<dyn StateSource>,
    ) -> Self {
        Self {
            tunables,
            cores,
            state,
        }
    }

    pub fn reconcile(&self) -> PassOutcome {
        if !self.tunables.enabled() {
            return PassOutcome::Disabled;
        }

        let target = compute_target(self.state.suspended(), self.tunables.max_online());
        let current = self.cores.count_online();

        let outcome = if target < current {
            self.offline_down_to(target)
        } else if target > current {
            self.online_up_to(target)
        } else {
            helper_debug!(
                self.tunables,
                "[StateHelper] Target already achieved: {}.",
                target
            );
            return PassOutcome::AlreadyAchieved { target };
        };

        if self.tunables.debug() {
            tracing::info!("[StateHelper] Target requested: {}.", target);
            for &core in self.cores.possible_cores() {
                tracing::info!(
                    "[StateHelper] CPU{} status: {}",
                    core,
                    u8::from(self.cores.is_online(core))
                );
            }
        }

        outcome
    }

    fn offline_down_to(&self, target: usize) -> PassOutcome {
        let mut switched = Vec::new();
        let mut refused = Vec::new();

        for &core in self.cores.possible_cores() {
            if core == BOOT_CORE || !self.cores.is_online(core) {
                continue;
            }
            helper_debug!(self.tunables, "[StateHelper] Switching CPU{} offline.", core);
            // A refusal is tolerated: the live count below decides whether
            // the next candidate is still needed.
            match self.cores.request_offline(core) {
                Ok(()) => switched.push(core),
                Err(e) => {
                    helper_debug!(self.tunables, "[StateHelper] {}", e);
                    refused.push(core);
                }
            }
            if self.cores.count_online() <= target {
                break;
            }
        }

        PassOutcome::Adjusted {
            target,
            action: Transition::Offline,
            switched,
            refused,
            online: self.cores.count_online(),
        }
    }

    fn online_up_to(&self, target: usize) -> PassOutcome {
        let mut switched = Vec::new();
        let mut refused = Vec::new();

        for &core in self.cores.possible_cores() {
            if self.cores.count_online() >= target {
                break;
            }
            if self.cores.is_online(core) {
                continue;
            }
            match self.cores.request_online(core) {
                Ok(()) => {
                    helper_debug!(self.tunables, "[StateHelper] Switching CPU{} online.", core);
                    switched.push(core);
                }
                Err(e) => {
                    helper_debug!(self.tunables, "[StateHelper] {}", e);
                    refused.push(core);
                }
            }
        }

        PassOutcome::Adjusted {
            target,
            action: Transition::Online,
            switched,
            refused,
            online: self.cores.count_online(),
        }
    }
}

/// Wakes every possible core that is currently offline, regardless of
/// configuration. Returns the cores that stayed offline.
pub fn restore_all(cores: &dyn CoreControl, tunables: &Tunables) -> Vec<usize> {
    let mut stuck = Vec::new();
    for &core in cores.possible_cores() {
        if cores.is_online(core) {
            continue;
        }
        if let Err(e) = cores.request_online(core) {
            helper_debug!(tunables, "[StateHelper] {}", e);
            stuck.push(core);
        }
    }
    stuck
}
