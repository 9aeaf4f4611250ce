//! Command abstractions.

use uuid::Uuid;

/// Trait that all story-arc commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the events it produces.
    fn correlation_id(&self) -> Uuid;

    /// The campaign whose story arc the command targets.
    fn campaign_id(&self) -> Uuid;
}
