//! Challenge lifecycle and result-resolution engine.

pub mod error;
pub mod ingestion;
pub mod lifecycle;
pub mod resolution;
pub mod scheduler;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ChallengeError;
pub use ingestion::{EffortIngestor, IngestOutcome, Ingestion};
pub use lifecycle::ChallengeService;
pub use resolution::{ChallengeResolver, Resolution, Verdict};
pub use scheduler::{ChallengeScheduler, SchedulerConfig, SweepReport};
pub use window::window_for;
