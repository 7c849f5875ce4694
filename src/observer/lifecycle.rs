//! The breakpoint observer.
//!
//! `MediaSetObserver` owns one match-state handle per compiled breakpoint and
//! publishes the set of breakpoint names currently matching. Handle change
//! events are coalesced through a [`Debouncer`]; the recompute reads every
//! handle's live state when the window settles.
//!
//! Lifecycle: `Uninitialized -> Active -> (Reconfiguring -> Active)* -> TornDown`.
//! Reconfiguration and teardown cancel the pending recompute before touching
//! the handle table, so a recompute never sees a mix of old and new handles.
//!
//! Every publish happens under the publish lock, taken before the table lock.
//! A recompute running on a scheduler thread therefore either publishes before
//! a concurrent reconfigure or teardown starts, or runs after it and reads the
//! new table. Sinks must not call back into `initialize`, `reconfigure` or
//! `teardown`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crossbeam_channel::Sender;
use tracing::{debug, warn};

use crate::error::{ConfigurationError, LifecycleError, MediaSetResult};
use crate::query::compile;

use super::config::{BreakpointSet, Configuration, ObserverConfig};
use super::debounce::Debouncer;
use super::provider::{ChangeListener, MatchMediaProvider, MediaQueryHandle};
use super::scheduler::Scheduler;

/// Observer lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObserverState {
    Uninitialized,
    Active,
    Reconfiguring,
    TornDown,
}

/// Receives every published breakpoint set.
pub trait Publish: Send + Sync {
    fn publish(&self, set: &BreakpointSet);
}

impl<F> Publish for F
where
    F: Fn(&BreakpointSet) + Send + Sync,
{
    fn publish(&self, set: &BreakpointSet) {
        self(set);
    }
}

/// Publishes into a channel, for stream-style consumers.
///
/// Publishing never blocks: when the channel is full or disconnected the
/// update is dropped and the latest value stays readable via
/// [`MediaSetObserver::current`].
#[derive(Debug, Clone)]
pub struct ChannelSink(pub Sender<BreakpointSet>);

impl Publish for ChannelSink {
    fn publish(&self, set: &BreakpointSet) {
        if self.0.try_send(set.clone()).is_err() {
            debug!("breakpoint update dropped by channel sink");
        }
    }
}

struct Breakpoint {
    name: String,
    query: String,
    handle: Arc<dyn MediaQueryHandle>,
    listener: ChangeListener,
    matches: bool,
}

struct Table {
    state: ObserverState,
    configuration: Configuration,
    breakpoints: Vec<Breakpoint>,
    current: BreakpointSet,
}

struct Shared {
    provider: Option<Arc<dyn MatchMediaProvider>>,
    fallback: Option<BreakpointSet>,
    sink: Box<dyn Publish>,
    publish: Mutex<()>,
    table: Mutex<Table>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_publish(&self) -> MutexGuard<'_, ()> {
        self.publish.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Publishes the live set of matching breakpoint names.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use mediaset::{
///     BreakpointSet, Configuration, InMemoryProvider, ManualScheduler, MediaSetObserver,
///     ObserverConfig,
/// };
///
/// let provider = Arc::new(InMemoryProvider::new());
/// provider.set_matches("(max-width: 592px)", true);
/// let scheduler = Arc::new(ManualScheduler::new());
///
/// let observer = MediaSetObserver::new(
///     Configuration::default(),
///     Some(provider.clone()),
///     scheduler.clone(),
///     ObserverConfig::default(),
///     |_: &BreakpointSet| {},
/// )
/// .unwrap();
///
/// let initial = observer.initialize().unwrap();
/// assert!(initial.contains("small"));
///
/// provider.set_matches("(max-width: 592px)", false);
/// provider.set_matches("(min-width: 593px) and (max-width: 896px)", true);
/// scheduler.advance(Duration::from_millis(50));
/// assert!(observer.current().contains("medium"));
/// ```
pub struct MediaSetObserver {
    shared: Arc<Shared>,
    debouncer: Debouncer,
}

impl MediaSetObserver {
    /// Creates an observer in the `Uninitialized` state.
    ///
    /// `provider` is `None` when the environment has no match-state
    /// capability; the observer then publishes the configured fallback (or an
    /// empty set) and subscribes to nothing.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if the observer config or the breakpoint
    /// configuration is invalid.
    pub fn new<P>(
        configuration: Configuration,
        provider: Option<Arc<P>>,
        scheduler: Arc<dyn Scheduler>,
        config: ObserverConfig,
        sink: impl Publish + 'static,
    ) -> Result<Self, ConfigurationError>
    where
        P: MatchMediaProvider + 'static,
    {
        let provider = provider.map(|p| p as Arc<dyn MatchMediaProvider>);
        Self::with_provider(configuration, provider, scheduler, config, sink)
    }

    /// Like [`MediaSetObserver::new`], taking an already type-erased provider.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if the observer config or the breakpoint
    /// configuration is invalid.
    pub fn with_provider(
        configuration: Configuration,
        provider: Option<Arc<dyn MatchMediaProvider>>,
        scheduler: Arc<dyn Scheduler>,
        config: ObserverConfig,
        sink: impl Publish + 'static,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        configuration.validate()?;

        let shared = Arc::new(Shared {
            provider,
            fallback: config.fallback.clone(),
            sink: Box::new(sink),
            publish: Mutex::new(()),
            table: Mutex::new(Table {
                state: ObserverState::Uninitialized,
                configuration,
                breakpoints: Vec::new(),
                current: BreakpointSet::new(),
            }),
        });

        let weak: Weak<Shared> = Arc::downgrade(&shared);
        let debouncer = Debouncer::new(scheduler, config.debounce_window(), move || {
            if let Some(shared) = weak.upgrade() {
                recompute_and_publish(&shared);
            }
        });

        Ok(Self { shared, debouncer })
    }

    /// Subscribes to every breakpoint and publishes the initial set.
    ///
    /// Calling it again while active returns the current set.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::TornDown` after teardown.
    pub fn initialize(&self) -> MediaSetResult<BreakpointSet> {
        let _publishing = self.shared.lock_publish();
        let set = {
            let mut table = self.shared.lock();
            match table.state {
                ObserverState::TornDown => {
                    return Err(LifecycleError::TornDown { operation: "initialize" }.into());
                }
                ObserverState::Active | ObserverState::Reconfiguring => return Ok(table.current.clone()),
                ObserverState::Uninitialized => {}
            }
            self.activate(&mut table);
            table.current.clone()
        };
        self.shared.sink.publish(&set);
        Ok(set)
    }

    /// Replaces the configuration.
    ///
    /// A structurally equal configuration is a no-op. Otherwise every handle
    /// is unsubscribed, any pending recompute is cancelled, and the new
    /// breakpoints are installed and published before returning.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::TornDown` after teardown and
    /// `ConfigurationError` for an invalid configuration.
    pub fn reconfigure(&self, configuration: Configuration) -> MediaSetResult<BreakpointSet> {
        configuration.validate()?;

        let _publishing = self.shared.lock_publish();
        let set = {
            let mut table = self.shared.lock();
            match table.state {
                ObserverState::TornDown => {
                    return Err(LifecycleError::TornDown { operation: "reconfigure" }.into());
                }
                ObserverState::Active if table.configuration == configuration => {
                    return Ok(table.current.clone());
                }
                _ => {}
            }

            table.state = ObserverState::Reconfiguring;
            self.debouncer.cancel();
            release(&mut table);
            table.configuration = configuration;
            self.activate(&mut table);
            table.current.clone()
        };
        self.shared.sink.publish(&set);
        Ok(set)
    }

    /// Unsubscribes every handle and cancels any pending recompute.
    ///
    /// Terminal and idempotent.
    pub fn teardown(&self) {
        let _publishing = self.shared.lock_publish();
        let mut table = self.shared.lock();
        if table.state == ObserverState::TornDown {
            return;
        }
        self.debouncer.cancel();
        release(&mut table);
        table.state = ObserverState::TornDown;
        debug!("observer torn down");
    }

    /// The last published set.
    #[must_use]
    pub fn current(&self) -> BreakpointSet {
        self.shared.lock().current.clone()
    }

    #[must_use]
    pub fn state(&self) -> ObserverState {
        self.shared.lock().state
    }

    #[must_use]
    pub fn configuration(&self) -> Configuration {
        self.shared.lock().configuration.clone()
    }

    /// Names of the breakpoints that compiled and hold a live handle.
    #[must_use]
    pub fn breakpoint_names(&self) -> Vec<String> {
        self.shared
            .lock()
            .breakpoints
            .iter()
            .map(|bp| bp.name.clone())
            .collect()
    }

    /// The compiled query of an active breakpoint.
    #[must_use]
    pub fn compiled_query(&self, name: &str) -> Option<String> {
        self.shared
            .lock()
            .breakpoints
            .iter()
            .find(|bp| bp.name == name)
            .map(|bp| bp.query.clone())
    }

    /// Number of live handles.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.shared.lock().breakpoints.len()
    }

    /// Whether a debounced recompute is waiting to run.
    #[must_use]
    pub fn has_pending_update(&self) -> bool {
        self.debouncer.is_pending()
    }

    fn activate(&self, table: &mut Table) {
        let Some(provider) = &self.shared.provider else {
            table.current = self.shared.fallback.clone().unwrap_or_default();
            table.state = ObserverState::Active;
            debug!(size = table.current.len(), "no match-state provider; using fallback set");
            return;
        };

        let mut breakpoints = Vec::with_capacity(table.configuration.len());
        for (name, descriptor) in table.configuration.iter() {
            let query = match compile(descriptor) {
                Ok(query) => query,
                Err(err) => {
                    warn!(breakpoint = name, error = %err, "dropping breakpoint with invalid descriptor");
                    continue;
                }
            };

            let handle = provider.request(&query);
            let debouncer = self.debouncer.clone();
            let listener = ChangeListener::new(move || debouncer.notify());
            handle.subscribe(listener.clone());

            breakpoints.push(Breakpoint {
                name: name.to_string(),
                query,
                matches: handle.matches(),
                handle,
                listener,
            });
        }

        debug!(
            configured = table.configuration.len(),
            subscribed = breakpoints.len(),
            "breakpoints subscribed"
        );
        table.breakpoints = breakpoints;
        table.current = matching(&table.breakpoints);
        table.state = ObserverState::Active;
    }
}

impl Drop for MediaSetObserver {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for MediaSetObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.shared.lock();
        f.debug_struct("MediaSetObserver")
            .field("state", &table.state)
            .field("handles", &table.breakpoints.len())
            .field("current", &table.current)
            .finish_non_exhaustive()
    }
}

fn matching(breakpoints: &[Breakpoint]) -> BreakpointSet {
    breakpoints
        .iter()
        .filter(|bp| bp.matches)
        .map(|bp| bp.name.clone())
        .collect()
}

fn release(table: &mut Table) {
    let released = table.breakpoints.len();
    for bp in table.breakpoints.drain(..) {
        bp.handle.unsubscribe(&bp.listener);
    }
    if released > 0 {
        debug!(released, "breakpoints unsubscribed");
    }
}

fn recompute_and_publish(shared: &Shared) {
    let _publishing = shared.lock_publish();
    let set = {
        let mut table = shared.lock();
        if table.state != ObserverState::Active {
            return;
        }
        for bp in &mut table.breakpoints {
            bp.matches = bp.handle.matches();
        }
        table.current = matching(&table.breakpoints);
        table.current.clone()
    };
    debug!(matching = ?set, "publishing breakpoint set");
    shared.sink.publish(&set);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::provider::InMemoryProvider;
    use crate::observer::scheduler::ManualScheduler;
    use std::time::Duration;

    type Published = Arc<Mutex<Vec<BreakpointSet>>>;

    fn observer(
        configuration: Configuration,
        provider: &Arc<InMemoryProvider>,
    ) -> (MediaSetObserver, Arc<ManualScheduler>, Published) {
        let scheduler = Arc::new(ManualScheduler::new());
        let published: Published = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&published);
        let observer = MediaSetObserver::new(
            configuration,
            Some(Arc::clone(provider)),
            Arc::clone(&scheduler) as Arc<dyn Scheduler>,
            ObserverConfig::default(),
            move |set: &BreakpointSet| sink.lock().unwrap().push(set.clone()),
        )
        .unwrap();
        (observer, scheduler, published)
    }

    fn names(items: &[&str]) -> BreakpointSet {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_starts_uninitialized() {
        let provider = Arc::new(InMemoryProvider::new());
        let (observer, _, published) = observer(Configuration::default(), &provider);
        assert_eq!(observer.state(), ObserverState::Uninitialized);
        assert_eq!(observer.handle_count(), 0);
        assert!(published.lock().unwrap().is_empty());
    }

    #[test]
    fn test_initialize_publishes_synchronously() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.set_matches("2", true);
        let config = Configuration::new().with("one", "1").with("two", "2");
        let (observer, _, published) = observer(config, &provider);

        assert_eq!(observer.initialize().unwrap(), names(&["two"]));
        assert_eq!(observer.state(), ObserverState::Active);
        assert_eq!(*published.lock().unwrap(), vec![names(&["two"])]);
    }

    #[test]
    fn test_invalid_descriptor_is_dropped() {
        let provider = Arc::new(InMemoryProvider::new());
        let bad = crate::query::FeatureObject::new().with("nonsense", 1);
        let config = Configuration::new().with("ok", "(color)").with("bad", bad);
        let (observer, _, _) = observer(config, &provider);

        observer.initialize().unwrap();
        assert_eq!(observer.breakpoint_names(), vec!["ok".to_string()]);
        assert_eq!(provider.requested(), vec!["(color)".to_string()]);
    }

    #[test]
    fn test_equal_reconfigure_is_noop() {
        let provider = Arc::new(InMemoryProvider::new());
        let (observer, _, published) = observer(Configuration::default(), &provider);
        observer.initialize().unwrap();

        observer.reconfigure(Configuration::default()).unwrap();
        assert_eq!(provider.handles().len(), 3);
        assert_eq!(published.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_teardown_is_idempotent_and_terminal() {
        let provider = Arc::new(InMemoryProvider::new());
        let (observer, _, _) = observer(Configuration::default(), &provider);
        observer.initialize().unwrap();

        observer.teardown();
        observer.teardown();
        assert_eq!(observer.state(), ObserverState::TornDown);
        for handle in provider.handles() {
            assert_eq!(handle.unsubscribe_calls(), 1);
        }
        assert!(observer.reconfigure(Configuration::new()).unwrap_err().is_lifecycle());
        assert!(observer.initialize().unwrap_err().is_lifecycle());
    }

    #[test]
    fn test_drop_tears_down() {
        let provider = Arc::new(InMemoryProvider::new());
        let (observer, scheduler, _) = observer(Configuration::default(), &provider);
        observer.initialize().unwrap();
        provider.set_matches("(min-width: 897px)", true);
        assert_eq!(scheduler.pending(), 1);

        drop(observer);
        assert_eq!(provider.live_listener_count(), 0);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_recompute_reads_live_state() {
        let provider = Arc::new(InMemoryProvider::new());
        let config = Configuration::new().with("one", "1");
        let (observer, scheduler, _) = observer(config, &provider);
        observer.initialize().unwrap();

        provider.set_matches("1", true);
        provider.set_matches("1", false);
        provider.set_matches("1", true);
        assert!(observer.has_pending_update());
        scheduler.advance(Duration::from_millis(50));
        assert_eq!(observer.current(), names(&["one"]));
        assert!(!observer.has_pending_update());
    }
}
