//! Match-state provider capability.
//!
//! The hosting environment supplies a [`MatchMediaProvider`] that hands out one
//! live [`MediaQueryHandle`] per compiled query. The observer never touches
//! ambient global state; everything goes through these traits.
//!
//! [`InMemoryProvider`] is an in-process implementation for tests and headless
//! hosts: match flags are set explicitly and listeners fire synchronously.
//! It keeps every handle it hands out so subscription accounting can be
//! checked after release; long-lived hosts call
//! [`InMemoryProvider::prune_released`] after a reconfigure or teardown.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Closure type for change listeners.
pub type ListenerFn = dyn Fn() + Send + Sync;

/// A change callback registered on a handle.
///
/// Two listeners are equal only when they are clones of the same callback,
/// so `unsubscribe` removes exactly the listener that was subscribed.
#[derive(Clone)]
pub struct ChangeListener(Arc<ListenerFn>);

impl ChangeListener {
    pub fn new(callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    /// Invokes the callback.
    pub fn notify(&self) {
        (self.0)();
    }
}

impl PartialEq for ChangeListener {
    fn eq(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.0).cast::<()>() == Arc::as_ptr(&other.0).cast::<()>()
    }
}

impl Eq for ChangeListener {}

impl fmt::Debug for ChangeListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChangeListener({:p})", Arc::as_ptr(&self.0).cast::<()>())
    }
}

/// Live match state for one query.
pub trait MediaQueryHandle: Send + Sync {
    /// The query this handle evaluates.
    fn query(&self) -> &str;

    /// Whether the query currently matches.
    fn matches(&self) -> bool;

    /// Registers a listener fired whenever `matches` changes.
    fn subscribe(&self, listener: ChangeListener);

    /// Removes a listener previously passed to `subscribe`.
    fn unsubscribe(&self, listener: &ChangeListener);
}

/// Environment capability producing match-state handles.
pub trait MatchMediaProvider: Send + Sync {
    /// Requests a fresh handle for `query`.
    fn request(&self, query: &str) -> Arc<dyn MediaQueryHandle>;
}

type MatchTable = Arc<RwLock<HashMap<String, bool>>>;

/// Handle produced by [`InMemoryProvider`].
///
/// Keeps per-handle subscription counters so callers can check that every
/// subscription was released exactly once.
pub struct InMemoryHandle {
    query: String,
    matches: MatchTable,
    listeners: Mutex<Vec<ChangeListener>>,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
}

impl InMemoryHandle {
    /// Number of listeners currently registered.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Total `subscribe` calls received.
    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::Relaxed)
    }

    /// Total `unsubscribe` calls received.
    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::Relaxed)
    }

    fn fire(&self) {
        // Snapshot so listeners may unsubscribe while being called.
        let snapshot: Vec<ChangeListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in snapshot {
            listener.notify();
        }
    }
}

impl fmt::Debug for InMemoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryHandle")
            .field("query", &self.query)
            .field("matches", &self.matches())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl MediaQueryHandle for InMemoryHandle {
    fn query(&self) -> &str {
        &self.query
    }

    fn matches(&self) -> bool {
        self.matches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.query)
            .copied()
            .unwrap_or(false)
    }

    fn subscribe(&self, listener: ChangeListener) {
        self.subscribe_calls.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn unsubscribe(&self, listener: &ChangeListener) {
        self.unsubscribe_calls.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|l| l != listener);
    }
}

/// In-process match-state provider.
///
/// # Examples
///
/// ```
/// use mediaset::{InMemoryProvider, MatchMediaProvider};
///
/// let provider = InMemoryProvider::new();
/// provider.set_matches("(min-width: 897px)", true);
///
/// let handle = provider.request("(min-width: 897px)");
/// assert!(handle.matches());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    matches: MatchTable,
    handles: Mutex<Vec<Arc<InMemoryHandle>>>,
}

impl InMemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the match flag for `query` and fires listeners of every handle on
    /// that query when the flag changed.
    pub fn set_matches(&self, query: &str, matches: bool) {
        let previous = self
            .matches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(query.to_string(), matches);
        if previous.unwrap_or(false) != matches {
            self.fire(query);
        }
    }

    /// Fires listeners of every handle on `query` without changing state.
    pub fn fire(&self, query: &str) {
        for handle in self.handles_for(query) {
            handle.fire();
        }
    }

    /// All handles ever requested, in request order.
    pub fn handles(&self) -> Vec<Arc<InMemoryHandle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Handles requested for `query`, in request order.
    pub fn handles_for(&self, query: &str) -> Vec<Arc<InMemoryHandle>> {
        self.handles()
            .into_iter()
            .filter(|h| h.query == query)
            .collect()
    }

    /// Queries requested so far, in request order.
    pub fn requested(&self) -> Vec<String> {
        self.handles().iter().map(|h| h.query.clone()).collect()
    }

    /// Listeners currently registered across all handles.
    pub fn live_listener_count(&self) -> usize {
        self.handles().iter().map(|h| h.listener_count()).sum()
    }

    /// Forgets handles that no longer have listeners and returns how many
    /// were removed. Match flags are kept.
    pub fn prune_released(&self) -> usize {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        let before = handles.len();
        handles.retain(|h| h.listener_count() > 0);
        before - handles.len()
    }
}

impl MatchMediaProvider for InMemoryProvider {
    fn request(&self, query: &str) -> Arc<dyn MediaQueryHandle> {
        let handle = Arc::new(InMemoryHandle {
            query: query.to_string(),
            matches: Arc::clone(&self.matches),
            listeners: Mutex::new(Vec::new()),
            subscribe_calls: AtomicUsize::new(0),
            unsubscribe_calls: AtomicUsize::new(0),
        });
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&handle));
        handle
    }
}
