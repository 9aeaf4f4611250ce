//! Test repositories — mock `AggregateRepository` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use storyloom_core::aggregate::CampaignAggregate;
use storyloom_core::error::DomainError;
use storyloom_core::repository::AggregateRepository;
use uuid::Uuid;

/// A versioned in-memory repository keyed by campaign. Enforces one
/// aggregate per campaign and rejects saves whose `committed_version` does
/// not match the stored version.
#[derive(Debug)]
pub struct InMemoryRepository<A> {
    store: Mutex<HashMap<Uuid, A>>,
    saves: Mutex<usize>,
}

impl<A> Default for InMemoryRepository<A> {
    fn default() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            saves: Mutex::new(0),
        }
    }
}

impl<A> InMemoryRepository<A>
where
    A: CampaignAggregate + Clone + 'static,
{
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository already holding `aggregate`, as if it had been
    /// saved earlier.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with(aggregate: &A) -> Self {
        let repo = Self::new();
        let mut stored = aggregate.clone();
        stored.clear_uncommitted_events();
        repo.store
            .lock()
            .unwrap()
            .insert(stored.campaign_id(), stored);
        repo
    }

    /// Returns a copy of the stored aggregate for a campaign.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stored(&self, campaign_id: Uuid) -> Option<A> {
        self.store.lock().unwrap().get(&campaign_id).cloned()
    }

    /// Number of successful `save` calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl<A> AggregateRepository<A> for InMemoryRepository<A>
where
    A: CampaignAggregate + Clone + 'static,
{
    async fn find_by_campaign(&self, campaign_id: Uuid) -> Result<Option<A>, DomainError> {
        Ok(self.store.lock().unwrap().get(&campaign_id).cloned())
    }

    async fn save(&self, aggregate: &A) -> Result<(), DomainError> {
        let mut store = self.store.lock().unwrap();
        let campaign_id = aggregate.campaign_id();
        let expected = aggregate.committed_version();

        let actual = match store.get(&campaign_id) {
            Some(existing) if existing.aggregate_id() != aggregate.aggregate_id() => {
                return Err(DomainError::AlreadyExists(campaign_id));
            }
            Some(existing) => existing.version(),
            None => 0,
        };
        if actual != expected {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id: aggregate.aggregate_id(),
                expected,
                actual,
            });
        }

        let mut stored = aggregate.clone();
        stored.clear_uncommitted_events();
        store.insert(campaign_id, stored);
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

/// A repository that returns a configured aggregate from every
/// `find_by_campaign` call and records every `save` without version checks.
#[derive(Debug)]
pub struct RecordingRepository<A> {
    found: Option<A>,
    saved: Mutex<Vec<A>>,
}

impl<A> RecordingRepository<A>
where
    A: CampaignAggregate + Clone + 'static,
{
    /// Create a recording repository that will return `found` on every load.
    #[must_use]
    pub fn new(found: Option<A>) -> Self {
        Self {
            found,
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all aggregates that were saved, including their
    /// uncommitted events at the time of the save.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved(&self) -> Vec<A> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl<A> AggregateRepository<A> for RecordingRepository<A>
where
    A: CampaignAggregate + Clone + 'static,
{
    async fn find_by_campaign(&self, _campaign_id: Uuid) -> Result<Option<A>, DomainError> {
        Ok(self.found.clone())
    }

    async fn save(&self, aggregate: &A) -> Result<(), DomainError> {
        self.saved.lock().unwrap().push(aggregate.clone());
        Ok(())
    }
}

/// A repository that never finds anything and silently accepts saves.
/// Useful for "story arc not found" scenarios.
#[derive(Debug)]
pub struct EmptyRepository;

#[async_trait]
impl<A> AggregateRepository<A> for EmptyRepository
where
    A: CampaignAggregate + 'static,
{
    async fn find_by_campaign(&self, _campaign_id: Uuid) -> Result<Option<A>, DomainError> {
        Ok(None)
    }

    async fn save(&self, _aggregate: &A) -> Result<(), DomainError> {
        Ok(())
    }
}

/// A repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingRepository;

#[async_trait]
impl<A> AggregateRepository<A> for FailingRepository
where
    A: CampaignAggregate + 'static,
{
    async fn find_by_campaign(&self, _campaign_id: Uuid) -> Result<Option<A>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save(&self, _aggregate: &A) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
