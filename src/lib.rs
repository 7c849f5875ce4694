//! # MediaSet - declarative UI breakpoints
//!
//! MediaSet lets callers describe breakpoints declaratively and exposes a
//! live, debounced set of the breakpoint names currently matching the display
//! environment.
//!
//! ## Core Concepts
//!
//! - **Descriptor**: a media query string, a feature object, or a sequence of those (logical OR)
//! - **Compiler**: turns a descriptor into a canonical media query string
//! - **Provider**: the environment capability handing out live match-state handles
//! - **Observer**: subscribes per breakpoint and republishes the matching set after a debounce window
//!
//! ## Usage
//!
//! ```rust
//! use mediaset::{compile, Descriptor, FeatureObject};
//!
//! let tablet = Descriptor::features(
//!     FeatureObject::new()
//!         .with("type", "screen")
//!         .with("width", "593..896")
//!         .with("color", true),
//! );
//! assert_eq!(
//!     compile(&tablet).unwrap(),
//!     "screen and (color) and (min-width: 593px) and (max-width: 896px)"
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod observer;
pub mod query;

// Re-export primary types at crate root for convenience
pub use error::{ConfigurationError, LifecycleError, MediaQueryError, MediaSetError, MediaSetResult};
pub use observer::{
    fallback_from_json, BreakpointSet, ChangeListener, ChannelSink, Configuration, Debouncer,
    InMemoryHandle, InMemoryProvider, ManualScheduler, MatchMediaProvider, MediaQueryHandle,
    MediaSetObserver, ObserverConfig, ObserverState, Publish, Scheduler, ThreadScheduler,
    TimerId, DEFAULT_DEBOUNCE_MS,
};
pub use query::{compile, compile_json, Descriptor, FeatureObject, FeatureValue};
