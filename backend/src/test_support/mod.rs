//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`). Only
//! compiled for tests or with the `test-support` feature.

pub mod clock;
pub mod fixtures;
pub mod memory;
pub mod repository_behaviour;

pub use self::clock::MutableClock;
pub use self::memory::{InMemoryClinicStore, RecordingObjectStorage, SequentialIdGenerator};
