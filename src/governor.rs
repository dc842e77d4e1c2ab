use crate::config::GovernorConfig;
use crate::dispatch::{
    Dispatcher, PassQueue, PendingPasses, QueueStats, ScheduleResult, Trigger, Worker,
};
use crate::engine::{PassOutcome, Reconciler, restore_all};
use crate::error::{GovernorError, GovernorResult};
use crate::platform::{BOOT_CORE, CoreControl};
use crate::state::{ClientId, StateEvent, StateSource};
use crate::tunables::{
    ATTR_DEBUG_MASK, ATTR_ENABLED, ATTR_MAX_CPUS_ONLINE, Tunables, TunablesSnapshot, parse_flag,
    parse_uint,
};
use crate::utils::CancelToken;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

/// Allocates the helper worker.
pub(crate) type SpawnWorker =
    fn(Reconciler, PendingPasses, CancelToken, Option<usize>) -> io::Result<Worker>;

/// Resources held while the governor is enabled.
struct Active {
    worker: Worker,
    dispatcher: Dispatcher,
    client: ClientId,
}

/// Lifecycle manager and attribute interface of the state helper.
///
/// `Disabled -> start() -> Enabled -> stop() -> Disabled`. A failed start
/// lands back in `Disabled` with the enabled flag cleared. Stopping always
/// succeeds and always leaves every possible core online.
pub struct Governor {
    tunables: Arc<Tunables>,
    cores: Arc<dyn CoreControl>,
    state: Arc<dyn StateSource>,
    pin_core: Option<usize>,
    spawn_worker: SpawnWorker,
    cancel: CancelToken,
    /// Also serializes enable/disable writes against each other.
    active: Mutex<Option<Active>>,
}

impl Governor {
    pub fn new(
        tunables: Arc<Tunables>,
        cores: Arc<dyn CoreControl>,
        state: Arc<dyn StateSource>,
    ) -> Self {
        Self {
            tunables,
            cores,
            state,
            pin_core: None,
            spawn_worker: Worker::spawn,
            cancel: CancelToken::new_root(),
            active: Mutex::new(None),
        }
    }

    /// Builds the governor from loaded settings. Out-of-range
    /// `max_cpus_online` is rejected like a runtime write.
    pub fn from_config(
        cfg: &GovernorConfig,
        cores: Arc<dyn CoreControl>,
        state: Arc<dyn StateSource>,
    ) -> GovernorResult<Self> {
        let tunables = Tunables::with_values(
            cores.total_cores(),
            cfg.enabled,
            cfg.max_cpus_online,
            cfg.debug_mask,
        )?;
        // Any other core may be parked under the worker mid-pass.
        if let Some(core) = cfg.worker_core
            && core != BOOT_CORE
        {
            return Err(GovernorError::invalid("worker_core", core.to_string()));
        }
        Ok(Self::new(Arc::new(tunables), cores, state).with_pin_core(cfg.worker_core))
    }

    pub fn with_pin_core(mut self, core: Option<usize>) -> Self {
        self.pin_core = core;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_spawner(mut self, spawn_worker: SpawnWorker) -> Self {
        self.spawn_worker = spawn_worker;
        self
    }

    pub fn tunables(&self) -> &Arc<Tunables> {
        &self.tunables
    }

    pub fn is_running(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Starts the governor if the loaded settings say it is enabled.
    pub fn attach(&self) -> GovernorResult<()> {
        tracing::info!("[StateHelper] Device init");
        if self.tunables.enabled() {
            self.start()
        } else {
            Ok(())
        }
    }

    /// Stops the governor if it is running.
    pub fn detach(&self) {
        if self.is_running() {
            self.stop();
        }
    }

    pub fn start(&self) -> GovernorResult<()> {
        let mut active = self.active.lock();
        self.start_locked(&mut active)
    }

    pub fn stop(&self) {
        let mut active = self.active.lock();
        self.stop_locked(&mut active);
    }

    /// Requests a pass on the running worker.
    pub fn schedule(&self, trigger: Trigger) -> ScheduleResult {
        match self.active.lock().as_ref() {
            Some(a) => a.dispatcher.schedule(trigger),
            None => ScheduleResult::Closed,
        }
    }

    pub fn last_outcome(&self) -> Option<PassOutcome> {
        self.active.lock().as_ref().and_then(|a| a.worker.last_outcome())
    }

    pub fn stats(&self) -> Option<Arc<QueueStats>> {
        self.active.lock().as_ref().map(|a| a.worker.stats().clone())
    }

    fn start_locked(&self, active: &mut Option<Active>) -> GovernorResult<()> {
        if active.is_some() {
            return Ok(());
        }

        let (dispatcher, pending) = PassQueue::new();
        let reconciler = Reconciler::new(
            self.tunables.clone(),
            self.cores.clone(),
            self.state.clone(),
        );

        let worker = match (self.spawn_worker)(
            reconciler,
            pending,
            self.cancel.new_child(),
            self.pin_core,
        ) {
            Ok(worker) => worker,
            Err(e) => {
                tracing::error!("[StateHelper] Failed to allocate helper workqueue: {}", e);
                self.tunables.set_enabled(false);
                return Err(GovernorError::QueueAlloc(e));
            }
        };

        let notify = dispatcher.clone();
        let client = match self.state.register(Arc::new(move |event: StateEvent| {
            notify.on_state_change(event);
        })) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!("[StateHelper] Failed to register State notifier callback: {}", e);
                worker.shutdown();
                self.tunables.set_enabled(false);
                return Err(e);
            }
        };

        // Hardware may not match the configured state yet.
        dispatcher.schedule(Trigger::Startup);

        *active = Some(Active {
            worker,
            dispatcher,
            client,
        });
        tracing::info!("[StateHelper] started");
        Ok(())
    }

    fn stop_locked(&self, active: &mut Option<Active>) {
        let Some(Active { worker, client, .. }) = active.take() else {
            return;
        };

        self.state.unregister(client);
        worker.shutdown();

        let stuck = restore_all(self.cores.as_ref(), &self.tunables);
        if stuck.is_empty() {
            tracing::info!("[StateHelper] stopped, all cores online");
        } else {
            tracing::warn!("[StateHelper] stopped, cores still offline: {:?}", stuck);
        }
    }

    // ---- attribute interface ----

    pub fn show(&self, attr: &str) -> GovernorResult<String> {
        match attr {
            ATTR_ENABLED => Ok(self.show_enabled()),
            ATTR_MAX_CPUS_ONLINE => Ok(self.show_max_cpus_online()),
            ATTR_DEBUG_MASK => Ok(self.show_debug_mask()),
            other => Err(GovernorError::UnknownAttribute(other.to_string())),
        }
    }

    pub fn store(&self, attr: &str, raw: &str) -> GovernorResult<()> {
        match attr {
            ATTR_ENABLED => self.store_enabled(raw),
            ATTR_MAX_CPUS_ONLINE => self.store_max_cpus_online(raw),
            ATTR_DEBUG_MASK => self.store_debug_mask(raw),
            other => Err(GovernorError::UnknownAttribute(other.to_string())),
        }
    }

    pub fn show_enabled(&self) -> String {
        format!("{}\n", u8::from(self.tunables.enabled()))
    }

    pub fn show_max_cpus_online(&self) -> String {
        format!("{}\n", self.tunables.max_online())
    }

    pub fn show_debug_mask(&self) -> String {
        format!("{}\n", u8::from(self.tunables.debug()))
    }

    pub fn snapshot(&self) -> TunablesSnapshot {
        self.tunables.snapshot()
    }

    /// `1` starts the governor, `0` stops it. Rewriting the current value
    /// is accepted and does nothing.
    pub fn store_enabled(&self, raw: &str) -> GovernorResult<()> {
        let val = parse_flag(ATTR_ENABLED, raw)?;

        let mut active = self.active.lock();
        if val == self.tunables.enabled() && val == active.is_some() {
            return Ok(());
        }
        self.tunables.set_enabled(val);

        if val {
            self.start_locked(&mut active)
        } else {
            self.stop_locked(&mut active);
            Ok(())
        }
    }

    /// Takes effect on the next pass, which is scheduled right away while enabled.
    pub fn store_max_cpus_online(&self, raw: &str) -> GovernorResult<()> {
        let val = parse_uint(ATTR_MAX_CPUS_ONLINE, raw)?;
        self.tunables.set_max_online(val)?;

        if self.tunables.enabled() && self.schedule(Trigger::Config) == ScheduleResult::Closed {
            tracing::debug!(
                "[StateHelper] max_cpus_online={} stored, no worker running to apply it",
                val
            );
        }
        Ok(())
    }

    pub fn store_debug_mask(&self, raw: &str) -> GovernorResult<()> {
        let val = parse_flag(ATTR_DEBUG_MASK, raw)?;
        self.tunables.set_debug(val);
        Ok(())
    }
}

impl Drop for Governor {
    fn drop(&mut self) {
        let mut active = self.active.lock();
        self.stop_locked(&mut active);
        self.cancel.cancel();
    }
}
