//! QUERY subsystem: breakpoint descriptors and their compilation into media queries.

/// Descriptor to query compiler.
pub mod compile;
/// Descriptor, feature object and feature value types.
pub mod descriptor;
/// Media types and feature names.
pub mod vocabulary;

pub use compile::{compile, compile_json};
pub use descriptor::{Descriptor, FeatureObject, FeatureValue};
