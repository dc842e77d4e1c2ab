use crate::error::{GovernorError, GovernorResult, Transition};
use crate::platform::{BOOT_CORE, CoreControl};
use parking_lot::Mutex;
use std::thread;
use std::time::Duration;

/// One transition request as seen by [`SimulatedCores`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub core: usize,
    pub action: Transition,
    pub accepted: bool,
}

#[derive(Debug)]
struct SimState {
    online: Vec<bool>,
    refuse: Vec<bool>,
    journal: Vec<Request>,
}

/// In-memory core array standing in for real hotplug hardware.
///
/// Records every request it receives, can be told to refuse specific
/// cores, and can add a fixed latency to each transition.
#[derive(Debug)]
pub struct SimulatedCores {
    possible: Vec<usize>,
    state: Mutex<SimState>,
    latency: Duration,
}

impl SimulatedCores {
    /// `total` cores, all online.
    pub fn new(total: usize) -> Self {
        let total = total.max(1);
        Self {
            possible: (0..total).collect(),
            state: Mutex::new(SimState {
                online: vec![true; total],
                refuse: vec![false; total],
                journal: Vec::new(),
            }),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the platform refuse (or stop refusing) transitions of `core`.
    pub fn set_refuse(&self, core: usize, refuse: bool) {
        if let Some(slot) = self.state.lock().refuse.get_mut(core) {
            *slot = refuse;
        }
    }

    /// Flip a core behind the governor's back, like another hotplug user would.
    pub fn force(&self, core: usize, online: bool) {
        if let Some(slot) = self.state.lock().online.get_mut(core) {
            *slot = online;
        }
    }

    pub fn online_set(&self) -> Vec<usize> {
        let st = self.state.lock();
        st.online
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn journal(&self) -> Vec<Request> {
        self.state.lock().journal.clone()
    }

    pub fn take_journal(&self) -> Vec<Request> {
        std::mem::take(&mut self.state.lock().journal)
    }

    fn apply(&self, core: usize, action: Transition) -> GovernorResult<()> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        let mut st = self.state.lock();
        if core >= st.online.len() {
            return Err(GovernorError::transition(core, action, "no such core"));
        }

        let refused = st.refuse[core] || (action == Transition::Offline && core == BOOT_CORE);
        st.journal.push(Request {
            core,
            action,
            accepted: !refused,
        });
        if refused {
            return Err(GovernorError::transition(core, action, "refused by platform"));
        }

        st.online[core] = action == Transition::Online;
        Ok(())
    }
}

impl CoreControl for SimulatedCores {
    fn request_offline(&self, core: usize) -> GovernorResult<()> {
        self.apply(core, Transition::Offline)
    }

    fn request_online(&self, core: usize) -> GovernorResult<()> {
        self.apply(core, Transition::Online)
    }

    fn is_online(&self, core: usize) -> bool {
        self.state.lock().online.get(core).copied().unwrap_or(false)
    }

    fn possible_cores(&self) -> &[usize] {
        &self.possible
    }

    fn count_online(&self) -> usize {
        self.state.lock().online.iter().filter(|on| **on).count()
    }
}
