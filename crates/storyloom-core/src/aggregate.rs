//! Aggregate root abstraction.

use uuid::Uuid;

use crate::event::DomainEvent;

/// Trait for aggregate roots that record every mutation as a domain event.
///
/// Mutations apply their event immediately, so the in-memory state is always
/// current; the event is also kept as uncommitted until a repository has
/// persisted the aggregate.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version (number of events applied).
    fn version(&self) -> i64;

    /// Apply an event to mutate internal state.
    fn apply(&mut self, event: &Self::Event);

    /// Returns uncommitted events produced by command handling.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Clears uncommitted events after persistence.
    fn clear_uncommitted_events(&mut self);

    /// Returns the version last seen by the repository. This is the
    /// optimistic concurrency token expected on save.
    #[allow(clippy::cast_possible_wrap)]
    fn committed_version(&self) -> i64 {
        self.version() - self.uncommitted_events().len() as i64
    }
}

/// An aggregate that is owned by exactly one campaign.
pub trait CampaignAggregate: AggregateRoot {
    /// Returns the campaign this aggregate belongs to.
    fn campaign_id(&self) -> Uuid;
}
