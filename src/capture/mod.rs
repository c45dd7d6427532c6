//! State capture from opaque host objects
//!
//! - [`subject`] - the [`Subject`] capability a host adapter implements
//! - [`resolver`] - candidate-list attribute resolution and coercion
//! - [`canonical`] - location label canonicalization
//! - [`sampler`] - rate limiting and snapshot assembly

pub mod canonical;
pub mod resolver;
pub mod sampler;
pub mod subject;

pub use canonical::{canonicalize, is_transient};
pub use resolver::{coerce, lookup_path, resolve, AttributeSlot};
pub use sampler::{normalize_degrees, LocationTracker, SampleClock, Sampler};
pub use subject::{MapSubject, Subject, Value};
