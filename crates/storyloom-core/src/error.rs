//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No story arc exists for the campaign.
    #[error("story arc not found for campaign: {0}")]
    StoryArcNotFound(Uuid),

    /// A story arc already exists for the campaign.
    #[error("story arc already exists for campaign: {0}")]
    AlreadyExists(Uuid),

    /// A beat id was not found in the story arc.
    #[error("story beat not found: {0}")]
    BeatNotFound(Uuid),

    /// A quest is not linked to the story arc.
    #[error("quest link not found: {0}")]
    QuestLinkNotFound(Uuid),

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
