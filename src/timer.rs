//! Cancellable one-shot timers.
//!
//! State machines never sleep themselves. They ask a [`Scheduler`] for a [`Timer`] and are
//! handed the timer back by their owner once it fires. [`VirtualScheduler`] drives a
//! virtual clock for tests, [`TokioScheduler`] uses tokio sleeps.

use crate::record::Capability;
use log::trace;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Handle of a scheduled timer
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

/// What a timer does when it fires
#[derive(Clone, Debug, PartialEq)]
pub enum TimerKind {
    /// Write `!value` back to `capability`
    ToggleRevert {
        /// Capability to revert
        capability: Capability,
        /// Value written when the timer was scheduled
        value: bool,
    },
    /// Forget the active blind motion
    BlindIdle,
    /// End a group debounce window
    Debounce,
}

/// A timer request, tagged with the token of the device that owns it
#[derive(Clone, Debug, PartialEq)]
pub struct Timer {
    /// [`crate::Device::token`] of the owner
    pub owner: u64,
    /// Action on expiry
    pub kind: TimerKind,
}

/// Schedules and cancels timers
pub trait Scheduler {
    /// Fires `timer` once `after` has elapsed
    fn schedule(&mut self, after: Duration, timer: Timer) -> TimerId;
    /// Cancels a pending timer, unknown or fired ids are ignored
    fn cancel(&mut self, id: TimerId);
}

/// Deterministic scheduler on a virtual clock
#[derive(Debug, Default)]
pub struct VirtualScheduler {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<TimerId, (Duration, Timer)>,
}

impl VirtualScheduler {
    /// Scheduler at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of timers not yet fired or cancelled
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Moves the clock forward and returns the expired timers in deadline order
    pub fn advance(&mut self, by: Duration) -> Vec<(TimerId, Timer)> {
        self.now += by;
        let now = self.now;
        let mut expired: Vec<_> = self
            .pending
            .iter()
            .filter(|(_, (deadline, _))| *deadline <= now)
            .map(|(id, (deadline, _))| (*deadline, *id))
            .collect();
        expired.sort();
        expired
            .into_iter()
            .filter_map(|(_, id)| self.pending.remove(&id).map(|(_, t)| (id, t)))
            .collect()
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule(&mut self, after: Duration, timer: Timer) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.insert(id, (self.now + after, timer));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.pending.remove(&id);
    }
}

/// Scheduler backed by tokio tasks. Fired timers are delivered on the channel returned by
/// [`TokioScheduler::new`].
pub struct TokioScheduler {
    next_id: u64,
    fired_tx: UnboundedSender<(TimerId, Timer)>,
    tasks: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    /// Creates the scheduler and the receiver of fired timers
    pub fn new() -> (Self, UnboundedReceiver<(TimerId, Timer)>) {
        let (fired_tx, fired_rx) = unbounded_channel();
        (
            Self {
                next_id: 0,
                fired_tx,
                tasks: HashMap::new(),
            },
            fired_rx,
        )
    }

    /// Forgets the task of a timer that was received from the channel
    pub fn fired(&mut self, id: TimerId) {
        self.tasks.remove(&id);
    }

    /// Number of timers not yet fired or cancelled
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, after: Duration, timer: Timer) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let tx = self.fired_tx.clone();
        trace!("Scheduling {:?} in {:?}", timer, after);
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // The receiver is gone when the host shut down
            let _ = tx.send((id, timer));
        });
        self.tasks.insert(id, task);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }
}
