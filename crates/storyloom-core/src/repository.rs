//! Aggregate repository abstraction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::aggregate::CampaignAggregate;
use crate::error::DomainError;

/// Repository trait for loading and saving campaign-scoped aggregates.
///
/// Implementations own two invariants the domain cannot enforce on its own:
/// at most one aggregate exists per campaign, and `save` rejects a stale
/// aggregate whose `committed_version` no longer matches the stored version.
#[async_trait]
pub trait AggregateRepository<A>: Send + Sync
where
    A: CampaignAggregate + 'static,
{
    /// Load the aggregate belonging to a campaign, if one exists.
    async fn find_by_campaign(&self, campaign_id: Uuid) -> Result<Option<A>, DomainError>;

    /// Persist the aggregate with optimistic concurrency.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` when the stored version
    /// differs from `aggregate.committed_version()`.
    async fn save(&self, aggregate: &A) -> Result<(), DomainError>;
}
