//! Shared test doubles and utilities for the Storyloom story-arc engine.

mod clock;
mod generator;
mod repository;
mod tracing;

pub use clock::FixedClock;
pub use generator::{FailingGenerator, ScriptedGenerator, SlowGenerator};
pub use repository::{EmptyRepository, FailingRepository, InMemoryRepository, RecordingRepository};
pub use tracing::init_tracing;
