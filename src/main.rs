use anyhow::{Context, Result};
use crossbeam::channel as cbchan;
use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;
use state_helper::prelude::*;
use state_helper::utils::logger::LoggerConfig;
use state_helper::utils::params_io::take_from_args;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Operator commands read from stdin, one per line:
///   suspend | resume | show | <attr> | <attr>=<value>
fn handle_line(line: &str, governor: &Governor, state: &StateNotifier) {
    let line = line.trim();
    match line {
        "" => {}
        "suspend" => {
            state.suspend();
        }
        "resume" => {
            state.resume();
        }
        "show" => match serde_json::to_string(&governor.snapshot()) {
            Ok(s) => println!("{s}"),
            Err(e) => tracing::error!("[StateHelper] cannot encode status: {}", e),
        },
        _ => match line.split_once('=') {
            Some((attr, value)) => {
                if let Err(e) = governor.store(attr.trim(), value) {
                    tracing::error!("[StateHelper] write {} rejected: {}", attr.trim(), e);
                }
            }
            None => match governor.show(line) {
                Ok(v) => print!("{v}"),
                Err(e) => tracing::error!("[StateHelper] {}", e),
            },
        },
    }
}

fn main() -> Result<()> {
    let cfg_path = take_from_args(1).map(PathBuf::from);
    let cfg = GovernorConfig::load(cfg_path.as_deref())?;
    // Without a config file, logging follows LOG_* variables.
    let logger = if cfg_path.is_some() {
        cfg.logger.clone()
    } else {
        LoggerConfig::from_env()
    };
    let _log_guard = logger.init()?;

    let cores = Arc::new(SysfsCores::open(cfg.sysfs_root())?);
    let state = StateNotifier::new_arc();
    let governor = Governor::from_config(&cfg, cores, state.clone())
        .context("invalid state helper configuration")?;

    if let Err(e) = governor.attach() {
        tracing::error!("[StateHelper] start failed, staying disabled: {}", e);
    }

    let term_flag = Arc::new(AtomicBool::new(false));
    for sig in TERM_SIGNALS {
        flag::register(*sig, term_flag.clone())
            .with_context(|| format!("failed to register signal {sig}"))?;
    }

    let (line_tx, line_rx) = cbchan::unbounded::<String>();
    thread::Builder::new()
        .name("state_helper_stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn stdin reader")?;

    loop {
        if term_flag.load(Ordering::Relaxed) {
            tracing::warn!("[StateHelper] termination signal received");
            break;
        }
        match line_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(line) => handle_line(&line, &governor, &state),
            Err(cbchan::RecvTimeoutError::Timeout) => {}
            Err(cbchan::RecvTimeoutError::Disconnected) => break,
        }
    }

    governor.detach();
    Ok(())
}
