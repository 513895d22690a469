//! Process guard.
//!
//! Before mutating an application's profile directories the owning processes
//! have to be gone, otherwise half-written SQLite databases and session files
//! end up in the archive or on disk. The guard terminates matching processes
//! gracefully, waits up to a deadline, then escalates to a forceful kill.
//! Only a verified "nothing left alive" counts as success; callers must not
//! touch any files on failure.
//!
//! The terminate/wait/kill sequence runs against a [`ProcessTable`] so it can
//! be exercised without signalling real processes; [`SysinfoTable`] is the
//! live implementation.

use std::thread;
use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessesToUpdate, Signal, System};

use crate::error::{EngineError, EngineResult};

/// Default grace period before escalating from terminate to kill.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Case-insensitive substring match against a process name.
///
/// Deliberately loose: this is what the registry of running applications
/// gives us to work with, and it can over-match (a process merely containing
/// "firefox" in its name is fair game). Known precision limitation.
fn name_matches(process_name: &str, needle_lower: &str) -> bool {
    process_name.to_lowercase().contains(needle_lower)
}

/// Observation and signalling surface over the running-process table.
trait ProcessTable {
    /// Pids whose process name contains `needle_lower`.
    fn matching(&mut self, needle_lower: &str) -> Vec<u32>;
    /// Request graceful termination. Delivery failures are ignored; only the
    /// final liveness observation counts.
    fn terminate(&mut self, pid: u32);
    fn force_kill(&mut self, pid: u32);
    /// Re-observe the given pids and keep the ones still alive.
    fn retain_alive(&mut self, pids: Vec<u32>) -> Vec<u32>;
}

/// Live process table backed by `sysinfo`.
struct SysinfoTable {
    sys: System,
}

impl SysinfoTable {
    fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::All, true);
        Self { sys }
    }
}

impl ProcessTable for SysinfoTable {
    fn matching(&mut self, needle_lower: &str) -> Vec<u32> {
        self.sys
            .processes()
            .iter()
            .filter(|(_, p)| name_matches(&p.name().to_string_lossy(), needle_lower))
            .map(|(pid, _)| pid.as_u32())
            .collect()
    }

    fn terminate(&mut self, pid: u32) {
        if let Some(process) = self.sys.process(Pid::from_u32(pid)) {
            // None means the signal could not be delivered; best effort.
            let _ = process.kill_with(Signal::Term);
        }
    }

    fn force_kill(&mut self, pid: u32) {
        if let Some(process) = self.sys.process(Pid::from_u32(pid)) {
            process.kill();
        }
    }

    fn retain_alive(&mut self, pids: Vec<u32>) -> Vec<u32> {
        let refresh: Vec<Pid> = pids.iter().map(|p| Pid::from_u32(*p)).collect();
        self.sys
            .refresh_processes(ProcessesToUpdate::Some(&refresh), true);
        pids.into_iter()
            .filter(|p| self.sys.process(Pid::from_u32(*p)).is_some())
            .collect()
    }
}

/// Whether any running process name contains `name` (case-insensitive).
pub fn any_running(name: &str) -> bool {
    !SysinfoTable::new().matching(&name.to_lowercase()).is_empty()
}

/// Terminate every process whose name contains `name` (case-insensitive).
///
/// Succeeds immediately when nothing matches. Otherwise sends a graceful
/// termination request to each match, waits up to `timeout` for them to
/// exit, and force-kills the stragglers. Returns
/// [`EngineError::ProcessStillRunning`] if any targeted process survives the
/// forceful phase.
pub fn close_processes(name: &str, timeout: Duration) -> EngineResult<()> {
    close_with(&mut SysinfoTable::new(), name, timeout)
}

fn close_with(table: &mut dyn ProcessTable, name: &str, timeout: Duration) -> EngineResult<()> {
    let needle = name.to_lowercase();
    let targets = table.matching(&needle);
    if targets.is_empty() {
        log::debug!("no running process matches '{}'", name);
        return Ok(());
    }
    log::info!("closing {} process(es) matching '{}'", targets.len(), name);

    for pid in &targets {
        table.terminate(*pid);
    }

    // Wait for the graceful phase to drain.
    let deadline = Instant::now() + timeout;
    let mut alive = targets;
    while !alive.is_empty() && Instant::now() < deadline {
        thread::sleep(POLL_INTERVAL);
        alive = table.retain_alive(alive);
    }

    // Escalate on whatever is left.
    for pid in &alive {
        log::warn!("process {} ignored termination, killing", pid);
        table.force_kill(*pid);
    }

    if !alive.is_empty() {
        thread::sleep(POLL_INTERVAL);
        alive = table.retain_alive(alive);
    }

    if alive.is_empty() {
        Ok(())
    } else {
        Err(EngineError::ProcessStillRunning(name.to_string()))
    }
}

/// Closes an application's processes before its files are touched.
///
/// The command layer depends on this seam rather than on [`close_processes`]
/// directly, so tests can substitute a stub instead of signalling whatever
/// happens to run on the machine.
pub trait AppCloser {
    fn close(&self, name: &str, timeout: Duration) -> EngineResult<()>;
}

/// The live closer used by the CLI.
pub struct SystemCloser;

impl AppCloser for SystemCloser {
    fn close(&self, name: &str, timeout: Duration) -> EngineResult<()> {
        close_processes(name, timeout)
    }
}
