//! OBSERVER subsystem: live, debounced set of matching breakpoints.
//!
//! The observer is embedded-first: the hosting environment injects a
//! [`MatchMediaProvider`] and a [`Scheduler`], and a UI binding layer drives
//! `initialize` / `reconfigure` / `teardown` from its own mount, update and
//! unmount events.

/// Breakpoint and observer configuration.
pub mod config;
/// Trailing-edge debounce.
pub mod debounce;
/// Observer lifecycle and publishing.
pub mod lifecycle;
/// Match-state provider capability.
pub mod provider;
/// Cancellable timers.
pub mod scheduler;

pub use config::{fallback_from_json, BreakpointSet, Configuration, ObserverConfig};
pub use debounce::{Debouncer, DEFAULT_DEBOUNCE_MS};
pub use lifecycle::{ChannelSink, MediaSetObserver, ObserverState, Publish};
pub use provider::{ChangeListener, InMemoryHandle, InMemoryProvider, MatchMediaProvider, MediaQueryHandle};
pub use scheduler::{ManualScheduler, Scheduler, Task, ThreadScheduler, ThreadSchedulerConfig, TimerId};
