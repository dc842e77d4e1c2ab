#[cfg(test)]
mod tests {
    use crate::config::GovernorConfig;
    use crate::dispatch::{ScheduleResult, Trigger};
    use crate::engine::PassOutcome;
    use crate::error::{GovernorError, GovernorResult, Transition};
    use crate::governor::Governor;
    use crate::platform::{BOOT_CORE, CoreControl, SimulatedCores};
    use crate::state::{ClientId, StateCallback, StateNotifier, StateSource};
    use crate::tunables::Tunables;
    use std::io;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    // ---- state source whose registration always fails
    struct RefusingSource;

    impl StateSource for RefusingSource {
        fn register(&self, _callback: StateCallback) -> GovernorResult<ClientId> {
            Err(GovernorError::Register("notifier chain is closed".into()))
        }

        fn unregister(&self, _id: ClientId) {}

        fn suspended(&self) -> bool {
            false
        }
    }

    struct Rig {
        cores: Arc<SimulatedCores>,
        state: Arc<StateNotifier>,
        governor: Governor,
    }

    fn rig_with(cores: SimulatedCores) -> Rig {
        let cores = Arc::new(cores);
        let state = StateNotifier::new_arc();
        let tunables = Arc::new(Tunables::new(cores.total_cores()));
        let governor = Governor::new(tunables, cores.clone(), state.clone());
        Rig {
            cores,
            state,
            governor,
        }
    }

    fn rig(total: usize) -> Rig {
        rig_with(SimulatedCores::new(total))
    }

    // ---- helper: poll until the condition holds or the deadline passes
    fn wait_until(dur: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        loop {
            if cond() {
                return true;
            }
            if start.elapsed() > dur {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn wait_passes(g: &Governor, n: u64) -> bool {
        wait_until(Duration::from_secs(2), || {
            g.stats().is_some_and(|s| s.completed() >= n)
        })
    }

    fn offline_requests(cores: &SimulatedCores) -> Vec<usize> {
        cores
            .journal()
            .iter()
            .filter(|r| r.action == Transition::Offline)
            .map(|r| r.core)
            .collect()
    }

    #[test]
    fn start_runs_initial_pass() {
        let r = rig(4);
        r.governor.tunables().set_max_online(2).unwrap();
        r.governor.start().unwrap();

        assert!(wait_until(Duration::from_secs(2), || r.cores.count_online() == 2));
        assert_eq!(r.cores.online_set(), vec![0, 3]);
    }

    #[test]
    fn suspend_then_resume() {
        let r = rig(4);
        r.governor.start().unwrap();
        assert!(wait_passes(&r.governor, 1));
        assert_eq!(
            r.governor.last_outcome(),
            Some(PassOutcome::AlreadyAchieved { target: 4 })
        );

        r.state.suspend();
        assert!(wait_until(Duration::from_secs(2), || r.cores.count_online() == 1));
        assert_eq!(offline_requests(&r.cores), vec![1, 2, 3]);
        assert!(r.cores.is_online(BOOT_CORE));

        r.cores.take_journal();
        r.state.resume();
        assert!(wait_until(Duration::from_secs(2), || r.cores.count_online() == 4));
        let woken: Vec<usize> = r.cores.journal().iter().map(|q| q.core).collect();
        assert_eq!(woken, vec![1, 2, 3]);
    }

    #[test]
    fn max_write_while_enabled_reconciles() {
        let r = rig(4);
        r.governor.start().unwrap();
        assert!(wait_passes(&r.governor, 1));

        r.governor.store("max_cpus_online", "2\n").unwrap();
        assert!(wait_until(Duration::from_secs(2), || r.cores.count_online() == 2));
        assert_eq!(offline_requests(&r.cores), vec![1, 2]);
        assert_eq!(r.governor.show("max_cpus_online").unwrap(), "2\n");
    }

    #[test]
    fn rejected_writes_change_nothing() {
        let r = rig(4);
        r.governor.start().unwrap();
        assert!(wait_passes(&r.governor, 1));

        for bad in ["0", "5", "-1", "two", ""] {
            let err = r.governor.store_max_cpus_online(bad).unwrap_err();
            assert!(err.is_invalid_argument(), "{bad:?}");
        }
        assert!(r.governor.store_enabled("2").unwrap_err().is_invalid_argument());
        assert!(r.governor.store_debug_mask("on").unwrap_err().is_invalid_argument());
        assert!(matches!(
            r.governor.store("nr_cpus", "1"),
            Err(GovernorError::UnknownAttribute(_))
        ));

        assert_eq!(r.governor.show_max_cpus_online(), "4\n");
        assert_eq!(r.governor.show_enabled(), "1\n");
        assert_eq!(r.cores.count_online(), 4);
        assert!(r.cores.journal().is_empty());
    }

    #[test]
    fn disable_restores_every_core() {
        let r = rig(4);
        r.governor.start().unwrap();
        r.state.suspend();
        assert!(wait_until(Duration::from_secs(2), || r.cores.count_online() == 1));

        r.governor.store_enabled("0").unwrap();
        assert!(!r.governor.is_running());
        assert_eq!(r.cores.online_set(), vec![0, 1, 2, 3]);
        assert_eq!(r.governor.show_enabled(), "0\n");

        // No longer subscribed.
        assert_eq!(r.state.client_count(), 0);
        r.state.resume();
        r.state.suspend();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(r.cores.count_online(), 4);
    }

    #[test]
    fn max_write_while_disabled_only_stores() {
        let r = rig(4);
        r.governor.tunables().set_enabled(false);

        r.governor.store_max_cpus_online("2").unwrap();
        assert_eq!(r.governor.schedule(Trigger::Config), ScheduleResult::Closed);
        thread::sleep(Duration::from_millis(20));
        assert!(r.cores.journal().is_empty());

        // Enabling picks the stored value up on the initial pass.
        r.governor.store_enabled("1").unwrap();
        assert!(wait_until(Duration::from_secs(2), || r.cores.count_online() == 2));
    }

    #[test]
    fn rewriting_enabled_is_a_noop() {
        let r = rig(2);
        r.governor.start().unwrap();
        assert!(wait_passes(&r.governor, 1));
        let stats = r.governor.stats().unwrap();

        r.governor.store_enabled("1").unwrap();
        assert!(r.governor.is_running());
        assert!(Arc::ptr_eq(&stats, &r.governor.stats().unwrap()));
    }

    #[test]
    fn failed_registration_leaves_governor_disabled() {
        let cores = Arc::new(SimulatedCores::new(4));
        let tunables = Arc::new(Tunables::new(4));
        tunables.set_enabled(false);
        let governor = Governor::new(tunables, cores.clone(), Arc::new(RefusingSource));

        let err = governor.store_enabled("1").unwrap_err();
        assert!(matches!(err, GovernorError::Register(_)));
        assert!(!governor.is_running());
        assert_eq!(governor.show_enabled(), "0\n");
        assert!(cores.journal().is_empty());
    }

    #[test]
    fn failed_worker_allocation_leaves_governor_disabled() {
        let r = rig(4);
        let tunables = r.governor.tunables().clone();
        let governor = Governor::new(tunables, r.cores.clone(), r.state.clone())
            .with_spawner(|_, _, _, _| Err(io::Error::other("thread limit reached")));

        let err = governor.start().unwrap_err();
        assert!(matches!(err, GovernorError::QueueAlloc(_)));
        assert!(!governor.is_running());
        assert_eq!(governor.show_enabled(), "0\n");
        assert_eq!(r.state.client_count(), 0);
        assert!(r.cores.journal().is_empty());

        // The attribute path reports the same failure.
        assert!(matches!(
            governor.store_enabled("1"),
            Err(GovernorError::QueueAlloc(_))
        ));
        assert_eq!(governor.show_enabled(), "0\n");
    }

    #[test]
    fn max_write_before_attach_is_kept_for_start() {
        let r = rig(4);
        assert!(r.governor.tunables().enabled());
        assert!(!r.governor.is_running());

        r.governor.store_max_cpus_online("2").unwrap();
        assert_eq!(r.governor.show_max_cpus_online(), "2\n");
        thread::sleep(Duration::from_millis(20));
        assert!(r.cores.journal().is_empty());

        r.governor.attach().unwrap();
        assert!(wait_until(Duration::from_secs(2), || r.cores.count_online() == 2));
    }

    #[test]
    fn burst_of_triggers_coalesces() {
        let r = rig_with(SimulatedCores::new(8).with_latency(Duration::from_millis(20)));
        r.governor.start().unwrap();
        assert!(wait_passes(&r.governor, 1));
        let stats = r.governor.stats().unwrap();
        let queued_before = stats.queued();

        // The suspend pass takes ~140ms; everything below lands while it is
        // pending or running.
        r.state.suspend();
        for _ in 0..50 {
            r.governor.store_max_cpus_online("8").unwrap();
        }

        assert!(stats.queued() - queued_before <= 2);
        assert!(stats.coalesced() >= 48);

        assert!(wait_until(Duration::from_secs(5), || r.cores.count_online() == 1));
        assert!(wait_until(Duration::from_secs(2), || stats.completed() == stats.queued()));
        assert_eq!(offline_requests(&r.cores), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn stop_waits_out_inflight_pass() {
        let r = rig_with(SimulatedCores::new(6).with_latency(Duration::from_millis(10)));
        r.governor.start().unwrap();
        assert!(wait_passes(&r.governor, 1));

        r.state.suspend();
        thread::sleep(Duration::from_millis(15));
        r.governor.stop();

        assert_eq!(r.cores.count_online(), 6);
        let settled = r.cores.journal().len();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(r.cores.journal().len(), settled);
        assert!(
            r.cores
                .journal()
                .last()
                .is_none_or(|q| q.action == Transition::Online)
        );
    }

    #[test]
    fn drop_restores_cores() {
        let r = rig(3);
        r.governor.start().unwrap();
        r.state.suspend();
        assert!(wait_until(Duration::from_secs(2), || r.cores.count_online() == 1));

        let cores = r.cores.clone();
        let state = r.state.clone();
        drop(r);
        assert_eq!(cores.count_online(), 3);
        assert_eq!(state.client_count(), 0);
    }

    #[test]
    fn attach_honours_loaded_settings() {
        let cores: Arc<dyn CoreControl> = Arc::new(SimulatedCores::new(4));
        let state = StateNotifier::new_arc();

        let cfg = GovernorConfig {
            enabled: false,
            max_cpus_online: Some(3),
            debug_mask: false,
            ..GovernorConfig::default()
        };
        let governor = Governor::from_config(&cfg, cores.clone(), state.clone()).unwrap();
        governor.attach().unwrap();
        assert!(!governor.is_running());
        assert_eq!(governor.show_debug_mask(), "0\n");

        let cfg = GovernorConfig {
            max_cpus_online: Some(9),
            ..GovernorConfig::default()
        };
        assert!(
            Governor::from_config(&cfg, cores, state)
                .err()
                .is_some_and(|e| e.is_invalid_argument())
        );
    }

    #[test]
    fn worker_core_must_be_boot_core() {
        let cores: Arc<dyn CoreControl> = Arc::new(SimulatedCores::new(4));
        let state = StateNotifier::new_arc();

        let cfg = GovernorConfig {
            worker_core: Some(2),
            ..GovernorConfig::default()
        };
        assert!(matches!(
            Governor::from_config(&cfg, cores.clone(), state.clone()),
            Err(GovernorError::InvalidArgument { attr: "worker_core", .. })
        ));

        let cfg = GovernorConfig {
            worker_core: Some(BOOT_CORE),
            ..GovernorConfig::default()
        };
        assert!(Governor::from_config(&cfg, cores, state).is_ok());
    }

    #[test]
    fn debug_toggle_has_no_control_effect() {
        let r = rig(4);
        r.governor.store_debug_mask("0").unwrap();
        r.governor.start().unwrap();
        r.governor.store_max_cpus_online("3").unwrap();
        assert!(wait_until(Duration::from_secs(2), || r.cores.count_online() == 3));
        r.governor.store_debug_mask("1").unwrap();
        assert_eq!(r.governor.show("debug_mask").unwrap(), "1\n");
    }
}
