//! Cancellable scheduled-callback services.
//!
//! [`Scheduler`] is the only timing primitive the observer relies on.
//! [`ThreadScheduler`] runs timers on a dedicated worker thread;
//! [`ManualScheduler`] runs them on a virtual clock advanced by the caller.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};
use uuid::Uuid;

/// Unique identifier for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(Uuid);

impl TimerId {
    /// Create a new random timer id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A deferred callback.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// A service that runs a task once after a delay unless cancelled first.
pub trait Scheduler: Send + Sync {
    /// Schedules `task` to run once `delay` has elapsed.
    fn schedule(&self, delay: Duration, task: Task) -> TimerId;

    /// Discards a pending timer. Unknown or already-fired ids are ignored.
    fn cancel(&self, id: TimerId);
}

// Timers ordered by deadline, ties broken by scheduling order.
struct TimerQueue<T> {
    seq: u64,
    by_deadline: BTreeMap<(T, u64), (TimerId, Task)>,
    by_id: HashMap<TimerId, (T, u64)>,
}

impl<T: Ord + Copy> TimerQueue<T> {
    fn new() -> Self {
        Self {
            seq: 0,
            by_deadline: BTreeMap::new(),
            by_id: HashMap::new(),
        }
    }

    fn insert(&mut self, id: TimerId, deadline: T, task: Task) {
        let key = (deadline, self.seq);
        self.seq += 1;
        self.by_deadline.insert(key, (id, task));
        self.by_id.insert(id, key);
    }

    fn remove(&mut self, id: TimerId) -> bool {
        match self.by_id.remove(&id) {
            Some(key) => self.by_deadline.remove(&key).is_some(),
            None => false,
        }
    }

    fn next_deadline(&self) -> Option<T> {
        self.by_deadline.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pops the earliest timer if it is due at or before `now`.
    fn pop_due(&mut self, now: T) -> Option<(T, TimerId, Task)> {
        let entry = self.by_deadline.first_entry()?;
        if entry.key().0 > now {
            return None;
        }
        let ((deadline, _), (id, task)) = entry.remove_entry();
        self.by_id.remove(&id);
        Some((deadline, id, task))
    }

    fn len(&self) -> usize {
        self.by_deadline.len()
    }
}

struct ManualState {
    now: Duration,
    timers: TimerQueue<Duration>,
}

/// Scheduler driven by a virtual clock.
///
/// Nothing fires until [`ManualScheduler::advance`] moves the clock past a
/// timer's deadline, which makes debounce behavior fully deterministic.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use mediaset::{ManualScheduler, Scheduler};
///
/// let scheduler = ManualScheduler::new();
/// let fired = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&fired);
/// scheduler.schedule(Duration::from_millis(50), Box::new(move || flag.store(true, Ordering::SeqCst)));
///
/// scheduler.advance(Duration::from_millis(49));
/// assert!(!fired.load(Ordering::SeqCst));
/// scheduler.advance(Duration::from_millis(1));
/// assert!(fired.load(Ordering::SeqCst));
/// ```
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: Duration::ZERO,
                timers: TimerQueue::new(),
            }),
        }
    }

    /// Current virtual time since creation.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of timers waiting to fire.
    pub fn pending(&self) -> usize {
        self.lock().timers.len()
    }

    /// Moves the clock forward by `by`, running every timer that becomes due
    /// in deadline order. Tasks run without the internal lock held, so they
    /// may schedule or cancel further timers.
    pub fn advance(&self, by: Duration) {
        let target = self.lock().now + by;
        loop {
            let due = {
                let mut state = self.lock();
                let due = state.timers.pop_due(target);
                if let Some((deadline, _, _)) = &due {
                    state.now = *deadline;
                }
                due
            };
            let Some((_, id, task)) = due else { break };
            trace!(timer = %id, "manual timer fired");
            task();
        }
        self.lock().now = target;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &state.now)
            .field("pending", &state.timers.len())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let id = TimerId::new();
        let mut state = self.lock();
        let deadline = state.now + delay;
        state.timers.insert(id, deadline, task);
        id
    }

    fn cancel(&self, id: TimerId) {
        self.lock().timers.remove(id);
    }
}

#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct ThreadSchedulerConfig {
    /// Max queued control messages (schedule/cancel).
    pub control_queue_capacity: usize,
}

impl Default for ThreadSchedulerConfig {
    fn default() -> Self {
        Self {
            control_queue_capacity: 1024,
        }
    }
}

enum ControlMsg {
    Schedule {
        id: TimerId,
        deadline: Instant,
        task: Task,
    },
    Cancel {
        id: TimerId,
    },
}

/// Scheduler backed by a dedicated worker thread.
///
/// Tasks run on the worker thread. Dropping the scheduler closes the control
/// channel; the worker then exits without running timers still pending.
pub struct ThreadScheduler {
    control_tx: Sender<ControlMsg>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadScheduler {
    /// Spawns the worker thread with default settings.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the worker thread cannot be spawned.
    pub fn new() -> std::io::Result<Self> {
        Self::with_config(ThreadSchedulerConfig::default())
    }

    /// Spawns the worker thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the worker thread cannot be spawned.
    pub fn with_config(cfg: ThreadSchedulerConfig) -> std::io::Result<Self> {
        let (control_tx, control_rx) = bounded::<ControlMsg>(cfg.control_queue_capacity.max(1));
        let join = thread::Builder::new()
            .name("mediaset-timer".to_string())
            .spawn(move || worker_loop(&control_rx))?;

        Ok(Self {
            control_tx,
            join: Mutex::new(Some(join)),
        })
    }
}

impl fmt::Debug for ThreadScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadScheduler").finish_non_exhaustive()
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let id = TimerId::new();
        let msg = ControlMsg::Schedule {
            id,
            deadline: Instant::now() + delay,
            task,
        };
        if self.control_tx.send(msg).is_err() {
            warn!(timer = %id, "timer worker is gone; task dropped");
        }
        id
    }

    fn cancel(&self, id: TimerId) {
        if self.control_tx.send(ControlMsg::Cancel { id }).is_err() {
            warn!(timer = %id, "timer worker is gone; cancel dropped");
        }
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        // Close the channel first so the worker can terminate.
        let (dummy_tx, _) = bounded::<ControlMsg>(1);
        drop(std::mem::replace(&mut self.control_tx, dummy_tx));

        // Detach rather than join: a task running on the worker may be the one
        // dropping the last reference to this scheduler.
        if let Ok(mut guard) = self.join.lock() {
            drop(guard.take());
        }
    }
}

fn worker_loop(control_rx: &Receiver<ControlMsg>) {
    let mut timers: TimerQueue<Instant> = TimerQueue::new();

    loop {
        while let Some((_, id, task)) = timers.pop_due(Instant::now()) {
            trace!(timer = %id, "timer fired");
            task();
        }

        let msg = match timers.next_deadline() {
            Some(deadline) => control_rx.recv_deadline(deadline),
            None => control_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match msg {
            Ok(ControlMsg::Schedule { id, deadline, task }) => timers.insert(id, deadline, task),
            Ok(ControlMsg::Cancel { id }) => {
                timers.remove(id);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
