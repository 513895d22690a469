//! Operation coordinator.
//!
//! Owns the single-flight invariant: at most one backup or restore may be in
//! flight at a time, system-wide. The guard is an exclusive lock on a file,
//! so the invariant holds across threads and across concurrently running
//! mozmover processes alike. A second start attempt is rejected synchronously
//! with [`EngineError::OperationAlreadyInProgress`] before anything is
//! touched; it is never queued.
//!
//! Workers run on a spawned thread and report through the event channel.
//! Exactly one terminal event is emitted per operation and the lock is
//! released afterwards, even if the worker panics.

use crossbeam_channel::Receiver;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crate::backup::write_backup;
use crate::error::{EngineError, EngineResult};
use crate::events::{CancelToken, Event, EventSender, channel};
use crate::restore::restore_backup;

/// A backup or restore request.
#[derive(Debug, Clone)]
pub enum Job {
    /// Archive the given profile directories into one zip.
    Backup {
        sources: Vec<PathBuf>,
        archive: PathBuf,
    },
    /// Extract a zip and replace the destination profile directory.
    Restore { archive: PathBuf, dest: PathBuf },
}

/// Exclusive lock held for the lifetime of one operation.
///
/// Dropping the guard releases the lock; the drop runs on the worker thread
/// after the terminal event, and during unwinding if the worker panics.
struct FlightGuard {
    file: File,
}

impl FlightGuard {
    fn acquire(path: &Path) -> EngineResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.try_lock_exclusive()
            .map_err(|_| EngineError::OperationAlreadyInProgress)?;
        Ok(Self { file })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Handle to a running operation: its event stream, cancellation, and join.
#[derive(Debug)]
pub struct OperationHandle {
    events: Receiver<Event>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

impl OperationHandle {
    /// Event stream for this operation. Iterating drains events until the
    /// worker finishes and drops its sender.
    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    /// Request cooperative cancellation; the worker stops at its next check
    /// and reports a `Failed` terminal event.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the worker thread has finished.
    pub fn wait(mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for OperationHandle {
    fn drop(&mut self) {
        // Detach rather than join: dropping the handle must not block, and
        // the worker finishes (and unlocks) on its own.
        drop(self.worker.take());
    }
}

/// Coordinator for starting operations.
#[derive(Debug, Clone)]
pub struct Engine {
    lock_file: PathBuf,
}

impl Engine {
    pub fn new(lock_file: PathBuf) -> Self {
        Self { lock_file }
    }

    /// Start a job, or reject it synchronously if one is already running.
    ///
    /// Rejection happens before any file is created or removed, so a
    /// [`EngineError::OperationAlreadyInProgress`] never leaves partial state.
    pub fn try_start(&self, job: Job) -> EngineResult<OperationHandle> {
        let guard = FlightGuard::acquire(&self.lock_file)?;
        let (tx, rx) = channel();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();

        let worker = thread::spawn(move || {
            let _guard = guard;
            run_job(&job, &tx, &worker_cancel);
        });

        Ok(OperationHandle {
            events: rx,
            cancel,
            worker: Some(worker),
        })
    }
}

fn run_job(job: &Job, events: &EventSender, cancel: &CancelToken) {
    let result = match job {
        Job::Backup { sources, archive } => write_backup(sources, archive, events, cancel),
        Job::Restore { archive, dest } => restore_backup(archive, dest, events, cancel),
    };

    match result {
        Ok(()) => events.completed(),
        Err(e) => {
            log::error!("operation failed: {}", e);
            events.failed(e.to_string());
        }
    }
}
