use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{Retrospective, RetrospectiveId};
use crate::repository::{RepositoryError, RepositoryResult};

/// Storage contract for retrospectives, looked up by ID or by calendar date.
#[async_trait]
pub trait RetrospectiveRepository: Send + Sync {
    /// Stores a retrospective and makes it the one returned for its date.
    async fn add(&self, retrospective: Retrospective) -> RepositoryResult<Retrospective>;

    async fn get(&self, id: RetrospectiveId) -> RepositoryResult<Option<Retrospective>>;

    /// Returns the retrospective most recently written for `date`.
    async fn get_by_date(&self, date: NaiveDate) -> RepositoryResult<Option<Retrospective>>;

    /// Overwrites a stored retrospective and points its date at it.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the retrospective does not exist.
    async fn update(&self, retrospective: Retrospective) -> RepositoryResult<Retrospective>;
}

/// Thread-safe in-memory retrospective repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRetrospectiveRepository {
    state: Arc<RwLock<InMemoryRetrospectiveState>>,
}

#[derive(Debug, Default)]
struct InMemoryRetrospectiveState {
    retrospectives: HashMap<RetrospectiveId, Retrospective>,
    by_date: HashMap<NaiveDate, RetrospectiveId>,
}

impl InMemoryRetrospectiveRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RetrospectiveRepository for InMemoryRetrospectiveRepository {
    async fn add(&self, retrospective: Retrospective) -> RepositoryResult<Retrospective> {
        let mut state = self.state.write().map_err(RepositoryError::unavailable)?;

        if let Some(replaced) = state.by_date.insert(retrospective.date(), retrospective.id()) {
            if replaced != retrospective.id() {
                tracing::debug!(
                    date = %retrospective.date(),
                    %replaced,
                    "Date index now points at a newer retrospective"
                );
            }
        }
        state
            .retrospectives
            .insert(retrospective.id(), retrospective.clone());
        Ok(retrospective)
    }

    async fn get(&self, id: RetrospectiveId) -> RepositoryResult<Option<Retrospective>> {
        let state = self.state.read().map_err(RepositoryError::unavailable)?;
        Ok(state.retrospectives.get(&id).cloned())
    }

    async fn get_by_date(&self, date: NaiveDate) -> RepositoryResult<Option<Retrospective>> {
        let state = self.state.read().map_err(RepositoryError::unavailable)?;
        Ok(state
            .by_date
            .get(&date)
            .and_then(|id| state.retrospectives.get(id))
            .cloned())
    }

    async fn update(&self, retrospective: Retrospective) -> RepositoryResult<Retrospective> {
        let mut state = self.state.write().map_err(RepositoryError::unavailable)?;
        let id = retrospective.id();

        if !state.retrospectives.contains_key(&id) {
            return Err(RepositoryError::not_found("Retrospective", id));
        }

        state.by_date.insert(retrospective.date(), id);
        state.retrospectives.insert(id, retrospective.clone());
        Ok(retrospective)
    }
}
