use crate::dispatch::{PendingPasses, QueueStats};
use crate::engine::{PassOutcome, Reconciler};
use crate::utils::{CancelToken, try_pin_core};
use crossbeam::channel as cbchan;
use crossbeam::select;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub const WORKER_NAME: &str = "state_helper_wq";

/// The single thread that runs reconciliation passes.
pub struct Worker {
    join: Option<JoinHandle<()>>,
    stop_tx: Option<cbchan::Sender<()>>,
    pending: PendingPasses,
    cancel: CancelToken,
    last: Arc<Mutex<Option<PassOutcome>>>,
}

impl Worker {
    /// Spawns the worker. Fails only if the OS refuses a new thread.
    pub fn spawn(
        reconciler: Reconciler,
        pending: PendingPasses,
        cancel: CancelToken,
        pin_core: Option<usize>,
    ) -> io::Result<Self> {
        let (stop_tx, stop_rx) = cbchan::bounded::<()>(0);
        let last = Arc::new(Mutex::new(None));

        let join = {
            let pending = pending.clone();
            let cancel = cancel.clone();
            let last = last.clone();

            thread::Builder::new()
                .name(WORKER_NAME.to_string())
                .spawn(move || {
                    if let Some(core_id) = pin_core {
                        match try_pin_core(core_id) {
                            Ok(core_id) => {
                                tracing::debug!("[StateHelper] worker pinned to core: {}", core_id)
                            }
                            Err(e) => tracing::warn!("[StateHelper] cannot pin worker: {}", e),
                        }
                    }
                    run_loop(&reconciler, &pending, &stop_rx, &cancel, &last);
                })?
        };

        Ok(Self {
            join: Some(join),
            stop_tx: Some(stop_tx),
            pending,
            cancel,
            last,
        })
    }

    pub fn last_outcome(&self) -> Option<PassOutcome> {
        self.last.lock().clone()
    }

    pub fn stats(&self) -> &Arc<QueueStats> {
        &self.pending.stats
    }

    /// Cancels a pass that has not started and waits out one in flight.
    /// No pass runs once this returns.
    pub fn shutdown(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.cancel.cancel();
        let dropped = self.pending.cancel_pending();
        if dropped > 0 {
            tracing::debug!("[StateHelper] cancelled {} pending pass(es)", dropped);
        }
        // Disconnecting the stop channel wakes the worker if it is idle.
        self.stop_tx.take();
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            tracing::error!("[StateHelper] worker panicked");
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.halt();
        }
    }
}

fn run_loop(
    reconciler: &Reconciler,
    pending: &PendingPasses,
    stop_rx: &cbchan::Receiver<()>,
    cancel: &CancelToken,
    last: &Mutex<Option<PassOutcome>>,
) {
    let rx = &pending.rx;
    loop {
        select! {
            recv(rx) -> msg => {
                let Ok(trigger) = msg else { break };
                if cancel.is_cancelled() {
                    pending.stats.on_cancelled(1);
                    break;
                }
                tracing::trace!("[StateHelper] pass triggered by {:?}", trigger);
                let outcome = reconciler.reconcile();
                *last.lock() = Some(outcome);
                pending.stats.on_completed();
            }
            recv(stop_rx) -> _ => break,
        }
    }
}
