//! Trailing-edge debounce over a [`Scheduler`].
//!
//! Every `notify` restarts the window. When a window elapses with no further
//! `notify`, the action runs exactly once. `cancel` drops the pending window.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::trace;

use super::scheduler::{Scheduler, TimerId};

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 50;

type Action = dyn Fn() + Send + Sync;

#[derive(Debug, Default)]
struct Pending {
    /// Bumped by every notify and cancel; a timer only fires for its own generation.
    generation: u64,
    armed: bool,
    timer: Option<TimerId>,
}

struct Inner {
    scheduler: Arc<dyn Scheduler>,
    window: Duration,
    action: Box<Action>,
    pending: Mutex<Pending>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Coalesces bursts of change signals into one trailing call.
///
/// Cloning yields another handle to the same debouncer.
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<Inner>,
}

impl Debouncer {
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        window: Duration,
        action: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                scheduler,
                window,
                action: Box::new(action),
                pending: Mutex::new(Pending::default()),
            }),
        }
    }

    /// The configured window.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Restarts the debounce window.
    pub fn notify(&self) {
        let (generation, previous) = {
            let mut pending = self.inner.lock();
            pending.generation += 1;
            pending.armed = true;
            (pending.generation, pending.timer.take())
        };
        if let Some(id) = previous {
            self.inner.scheduler.cancel(id);
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let id = self.inner.scheduler.schedule(
            self.inner.window,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    fire(&inner, generation);
                }
            }),
        );
        trace!(timer = %id, generation, "debounce window restarted");

        let mut pending = self.inner.lock();
        if pending.generation == generation && pending.armed {
            pending.timer = Some(id);
        } else {
            // Superseded (or already fired) before the id was recorded.
            drop(pending);
            self.inner.scheduler.cancel(id);
        }
    }

    /// Discards any pending window without running the action.
    pub fn cancel(&self) {
        let previous = {
            let mut pending = self.inner.lock();
            pending.generation += 1;
            pending.armed = false;
            pending.timer.take()
        };
        if let Some(id) = previous {
            trace!(timer = %id, "debounce window cancelled");
            self.inner.scheduler.cancel(id);
        }
    }

    /// Whether a window is currently running.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.lock().armed
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("window", &self.inner.window)
            .field("pending", &self.is_pending())
            .finish()
    }
}

fn fire(inner: &Inner, generation: u64) {
    {
        let mut pending = inner.lock();
        if !pending.armed || pending.generation != generation {
            return;
        }
        pending.armed = false;
        pending.timer = None;
    }
    (inner.action)();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::scheduler::ManualScheduler;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (Arc<ManualScheduler>, Debouncer, Arc<AtomicUsize>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let debouncer = Debouncer::new(
            Arc::clone(&scheduler) as Arc<dyn Scheduler>,
            Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        (scheduler, debouncer, calls)
    }

    #[test]
    fn test_single_notify_fires_after_window() {
        let (scheduler, debouncer, calls) = setup();
        debouncer.notify();
        assert!(debouncer.is_pending());
        scheduler.advance(Duration::from_millis(49));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        scheduler.advance(Duration::from_millis(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_burst_coalesces() {
        let (scheduler, debouncer, calls) = setup();
        for _ in 0..5 {
            debouncer.notify();
            scheduler.advance(Duration::from_millis(10));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 1);
        scheduler.advance(Duration::from_millis(50));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_notify_restarts_window() {
        let (scheduler, debouncer, calls) = setup();
        debouncer.notify();
        scheduler.advance(Duration::from_millis(40));
        debouncer.notify();
        scheduler.advance(Duration::from_millis(40));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        scheduler.advance(Duration::from_millis(10));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_discards_pending() {
        let (scheduler, debouncer, calls) = setup();
        debouncer.notify();
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert_eq!(scheduler.pending(), 0);
        scheduler.advance(Duration::from_secs(1));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_separate_windows_fire_separately() {
        let (scheduler, debouncer, calls) = setup();
        debouncer.notify();
        scheduler.advance(Duration::from_millis(60));
        debouncer.notify();
        scheduler.advance(Duration::from_millis(60));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
