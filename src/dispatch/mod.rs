pub use worker::*;

mod worker;

use crate::state::StateEvent;
use crossbeam::channel as cbchan;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Why a pass was requested. Only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    State(StateEvent),
    Config,
    Startup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleResult {
    /// A new pass is now pending.
    Queued,
    /// A pass was already pending; this trigger folds into it.
    Coalesced,
    /// The worker is gone.
    Closed,
}

/// Counters shared between the producers and the worker.
#[derive(Debug, Default)]
pub struct QueueStats {
    queued: AtomicU64,
    coalesced: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicU64,
}

impl QueueStats {
    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub(crate) fn on_completed(&self) {
        self.completed.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn on_cancelled(&self, n: u64) {
        self.cancelled.fetch_add(n, Ordering::Relaxed);
    }
}

/// Single-slot pending-pass queue.
///
/// The slot is the only buffer: a trigger that finds it occupied is
/// dropped. Once the worker takes the pending pass out, the next trigger
/// queues a fresh one, so every burst gets at least one pass that starts
/// after it.
pub struct PassQueue;

impl PassQueue {
    pub fn new() -> (Dispatcher, PendingPasses) {
        let (tx, rx) = cbchan::bounded::<Trigger>(1);
        let stats = Arc::new(QueueStats::default());
        (
            Dispatcher {
                tx,
                stats: stats.clone(),
            },
            PendingPasses { rx, stats },
        )
    }
}

/// Producer half. Cheap to clone into notification callbacks.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    tx: cbchan::Sender<Trigger>,
    stats: Arc<QueueStats>,
}

impl Dispatcher {
    /// Non-blocking; never waits for the worker.
    pub fn schedule(&self, trigger: Trigger) -> ScheduleResult {
        match self.tx.try_send(trigger) {
            Ok(()) => {
                self.stats.queued.fetch_add(1, Ordering::Relaxed);
                ScheduleResult::Queued
            }
            Err(cbchan::TrySendError::Full(_)) => {
                self.stats.coalesced.fetch_add(1, Ordering::Relaxed);
                ScheduleResult::Coalesced
            }
            Err(cbchan::TrySendError::Disconnected(_)) => ScheduleResult::Closed,
        }
    }

    pub fn on_state_change(&self, event: StateEvent) -> ScheduleResult {
        self.schedule(Trigger::State(event))
    }

    pub fn on_config_change(&self) -> ScheduleResult {
        self.schedule(Trigger::Config)
    }

    pub fn stats(&self) -> &Arc<QueueStats> {
        &self.stats
    }
}

/// Consumer half, owned by the worker.
#[derive(Clone, Debug)]
pub struct PendingPasses {
    rx: cbchan::Receiver<Trigger>,
    stats: Arc<QueueStats>,
}

impl PendingPasses {
    /// Drops whatever is pending without running it. Returns how many.
    pub fn cancel_pending(&self) -> u64 {
        let n = self.rx.try_iter().count() as u64;
        self.stats.on_cancelled(n);
        n
    }

    pub fn is_pending(&self) -> bool {
        !self.rx.is_empty()
    }
}
