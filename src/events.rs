//! Event/progress channel between a running operation and its caller.
//!
//! Every long-running operation reports through exactly four event kinds and
//! emits exactly one terminal event (`Completed` or `Failed`); nothing is
//! emitted after the terminal event. Senders ignore a disconnected receiver
//! so an operation can finish even after its caller stopped listening.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Notification from a running backup or restore operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Completion percentage, 0..=100, non-decreasing within one operation.
    Progress(u8),
    /// Human-readable status line, e.g. which phase is running.
    Log(String),
    /// Terminal: the operation finished successfully.
    Completed,
    /// Terminal: the operation failed; the message describes the cause.
    Failed(String),
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Completed | Event::Failed(_))
    }
}

/// Sending half handed to the worker.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<Event>,
}

impl EventSender {
    pub fn progress(&self, percent: u8) {
        let _ = self.tx.send(Event::Progress(percent.min(100)));
    }

    pub fn log(&self, message: impl Into<String>) {
        let _ = self.tx.send(Event::Log(message.into()));
    }

    pub fn completed(&self) {
        let _ = self.tx.send(Event::Completed);
    }

    pub fn failed(&self, message: impl Into<String>) {
        let _ = self.tx.send(Event::Failed(message.into()));
    }
}

/// Create an event channel. The receiver end is a plain iterator-friendly
/// `crossbeam_channel::Receiver`, decoupled from any presentation framework.
pub fn channel() -> (EventSender, Receiver<Event>) {
    let (tx, rx) = unbounded();
    (EventSender { tx }, rx)
}

/// Cooperative cancellation flag, checked by workers between file operations.
///
/// Cancellation stops the operation at the next check and lets it clean up
/// (partial archive removal, temp directory teardown) before reporting
/// failure, rather than tearing the worker down mid-write.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
