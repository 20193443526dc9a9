use chrono::{DateTime, NaiveDate, Utc};
use mockable::Clock;
use std::sync::Arc;
use uuid::Uuid;

use crate::SharedClock;
use crate::repository::RepositoryError;
use crate::task::{TaskId, TaskRepository};

pub mod api;
pub mod repository;

pub use api::RetrospectiveState;
pub use repository::{InMemoryRetrospectiveRepository, RetrospectiveRepository};

pub type RetrospectiveId = Uuid;

/// A daily retrospective grouping the tasks worked on that day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrospective {
    id: RetrospectiveId,
    title: String,
    summary: Option<String>,
    date: NaiveDate,
    tasks: Vec<TaskId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Retrospective {
    pub fn new(title: String, summary: Option<String>, date: NaiveDate, clock: &dyn Clock) -> Self {
        let now = clock.utc();
        Self {
            id: Uuid::new_v4(),
            title,
            summary,
            date,
            tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> RetrospectiveId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Task IDs in the order they were attached.
    pub fn tasks(&self) -> &[TaskId] {
        &self.tasks
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Appends a task unless it is already listed. Returns whether the list changed.
    pub fn add_task(&mut self, task_id: TaskId, clock: &dyn Clock) -> bool {
        if self.tasks.contains(&task_id) {
            return false;
        }
        self.tasks.push(task_id);
        self.touch(clock);
        true
    }

    /// Removes a task if it is listed. Returns whether the list changed.
    pub fn remove_task(&mut self, task_id: TaskId, clock: &dyn Clock) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|id| *id != task_id);
        if self.tasks.len() == before {
            return false;
        }
        self.touch(clock);
        true
    }

    pub fn touch(&mut self, clock: &dyn Clock) {
        self.updated_at = crate::next_timestamp(self.updated_at, clock);
    }
}

/// Input for creating a retrospective. A missing date means today.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrospectiveCreateInput {
    pub title: String,
    pub summary: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Externally visible projection of a retrospective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrospectiveOutput {
    pub id: RetrospectiveId,
    pub title: String,
    pub summary: Option<String>,
    pub date: NaiveDate,
    pub tasks: Vec<TaskId>,
}

impl From<Retrospective> for RetrospectiveOutput {
    fn from(retrospective: Retrospective) -> Self {
        Self {
            id: retrospective.id,
            title: retrospective.title,
            summary: retrospective.summary,
            date: retrospective.date,
            tasks: retrospective.tasks,
        }
    }
}

/// Error type for RetrospectiveService operations.
#[derive(Debug, thiserror::Error)]
pub enum RetrospectiveServiceError {
    #[error("Retrospective not found")]
    RetrospectiveNotFound(RetrospectiveId),
    #[error("Task not found")]
    TaskNotFound(TaskId),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl RetrospectiveServiceError {
    fn from_task_repository(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { id, .. } => Self::TaskNotFound(id),
            other => Self::Repository(other),
        }
    }

    fn from_retrospective_repository(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { id, .. } => Self::RetrospectiveNotFound(id),
            other => Self::Repository(other),
        }
    }
}

#[derive(Clone)]
pub struct RetrospectiveService {
    retrospectives: Arc<dyn RetrospectiveRepository>,
    tasks: Arc<dyn TaskRepository>,
    clock: SharedClock,
}

impl RetrospectiveService {
    pub fn new(
        retrospectives: Arc<dyn RetrospectiveRepository>,
        tasks: Arc<dyn TaskRepository>,
        clock: SharedClock,
    ) -> Self {
        Self {
            retrospectives,
            tasks,
            clock,
        }
    }

    /// Creates a retrospective, dated today unless a date is given.
    #[tracing::instrument(skip(self))]
    pub async fn create_retrospective(
        &self,
        input: RetrospectiveCreateInput,
    ) -> Result<RetrospectiveOutput, RetrospectiveServiceError> {
        let date = input
            .date
            .unwrap_or_else(|| self.clock.local().date_naive());
        let retrospective =
            Retrospective::new(input.title, input.summary, date, self.clock.as_ref());

        let created = self
            .retrospectives
            .add(retrospective)
            .await
            .map_err(RetrospectiveServiceError::from_retrospective_repository)?;
        tracing::debug!(retrospective_id = %created.id(), %date, "Created retrospective");
        Ok(RetrospectiveOutput::from(created))
    }

    /// Retrieves a retrospective by its ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_retrospective(
        &self,
        id: RetrospectiveId,
    ) -> Result<RetrospectiveOutput, RetrospectiveServiceError> {
        self.retrospectives
            .get(id)
            .await
            .map_err(RetrospectiveServiceError::from_retrospective_repository)?
            .map(RetrospectiveOutput::from)
            .ok_or(RetrospectiveServiceError::RetrospectiveNotFound(id))
    }

    /// Attaches a task to a retrospective and records the back-reference on the task.
    ///
    /// Both IDs are resolved before anything is written, so an unknown ID leaves
    /// both entities untouched. The two writes that follow are independent:
    /// the task is saved first, then the retrospective.
    ///
    /// # Errors
    ///
    /// Returns [`RetrospectiveServiceError::RetrospectiveNotFound`] or
    /// [`RetrospectiveServiceError::TaskNotFound`] when either ID is unknown.
    #[tracing::instrument(skip(self))]
    pub async fn attach_task(
        &self,
        retrospective_id: RetrospectiveId,
        task_id: TaskId,
    ) -> Result<RetrospectiveOutput, RetrospectiveServiceError> {
        let mut retrospective = self
            .retrospectives
            .get(retrospective_id)
            .await
            .map_err(RetrospectiveServiceError::from_retrospective_repository)?
            .ok_or(RetrospectiveServiceError::RetrospectiveNotFound(retrospective_id))?;

        let mut task = self
            .tasks
            .get(task_id)
            .await
            .map_err(RetrospectiveServiceError::from_task_repository)?
            .ok_or(RetrospectiveServiceError::TaskNotFound(task_id))?;

        // The earlier retrospective keeps listing the task.
        if let Some(previous) = task.retrospective_id().filter(|id| *id != retrospective_id) {
            tracing::warn!(
                %task_id,
                %previous,
                "Task is already attached to another retrospective"
            );
        }

        retrospective.add_task(task.id(), self.clock.as_ref());
        task.attach_to_retrospective(retrospective.id(), self.clock.as_ref());

        self.tasks
            .update(task)
            .await
            .map_err(RetrospectiveServiceError::from_task_repository)?;
        let updated = self
            .retrospectives
            .update(retrospective)
            .await
            .map_err(RetrospectiveServiceError::from_retrospective_repository)?;

        Ok(RetrospectiveOutput::from(updated))
    }

    /// Returns the retrospective recorded for `date`, if any.
    #[tracing::instrument(skip(self))]
    pub async fn get_summary(
        &self,
        date: NaiveDate,
    ) -> Result<Option<RetrospectiveOutput>, RetrospectiveServiceError> {
        let retrospective = self
            .retrospectives
            .get_by_date(date)
            .await
            .map_err(RetrospectiveServiceError::from_retrospective_repository)?;
        Ok(retrospective.map(RetrospectiveOutput::from))
    }
}
