use chrono::{DateTime, NaiveDate, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::SharedClock;
use crate::repository::RepositoryError;

pub mod api;
pub mod repository;

pub use api::TaskState;
pub use repository::{InMemoryTaskRepository, TaskRepository};

pub type TaskId = Uuid;

/// Workflow state of a task. Any status may move to any other.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Blocked,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Done,
        TaskStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown task status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    due_date: Option<NaiveDate>,
    retrospective_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new task in the `todo` state with a fresh identifier.
    pub fn new(
        title: String,
        description: Option<String>,
        due_date: Option<NaiveDate>,
        clock: &dyn Clock,
    ) -> Self {
        let now = clock.utc();
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            status: TaskStatus::default(),
            due_date,
            retrospective_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn retrospective_id(&self) -> Option<Uuid> {
        self.retrospective_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    pub fn set_due_date(&mut self, due_date: Option<NaiveDate>) {
        self.due_date = due_date;
    }

    pub fn mark_in_progress(&mut self, clock: &dyn Clock) {
        self.status = TaskStatus::InProgress;
        self.touch(clock);
    }

    pub fn mark_done(&mut self, clock: &dyn Clock) {
        self.status = TaskStatus::Done;
        self.touch(clock);
    }

    pub fn mark_blocked(&mut self, clock: &dyn Clock) {
        self.status = TaskStatus::Blocked;
        self.touch(clock);
    }

    /// Points the task at its owning retrospective. A previous association is overwritten.
    pub fn attach_to_retrospective(&mut self, retrospective_id: Uuid, clock: &dyn Clock) {
        self.retrospective_id = Some(retrospective_id);
        self.touch(clock);
    }

    pub fn touch(&mut self, clock: &dyn Clock) {
        self.updated_at = crate::next_timestamp(self.updated_at, clock);
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskCreateInput {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// Partial update for a task. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdateInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<NaiveDate>,
}

impl TaskUpdateInput {
    fn apply_to(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.set_title(title);
        }
        if let Some(description) = self.description {
            task.set_description(Some(description));
        }
        if let Some(status) = self.status {
            task.set_status(status);
        }
        if let Some(due_date) = self.due_date {
            task.set_due_date(Some(due_date));
        }
    }
}

/// Externally visible projection of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub retrospective_id: Option<Uuid>,
}

impl From<Task> for TaskOutput {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            due_date: task.due_date,
            retrospective_id: task.retrospective_id,
        }
    }
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    #[error("Task not found")]
    NotFound(TaskId),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for TaskServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { id, .. } => TaskServiceError::NotFound(id),
            other => TaskServiceError::Repository(other),
        }
    }
}

#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    clock: SharedClock,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepository>, clock: SharedClock) -> Self {
        Self { tasks, clock }
    }

    /// Creates a new task with status `todo`.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(
        &self,
        input: TaskCreateInput,
    ) -> Result<TaskOutput, TaskServiceError> {
        let task = Task::new(
            input.title,
            input.description,
            input.due_date,
            self.clock.as_ref(),
        );
        let created = self.tasks.add(task).await?;
        tracing::debug!(task_id = %created.id(), "Created task");
        Ok(TaskOutput::from(created))
    }

    /// Retrieves a single task by its ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_task(&self, id: TaskId) -> Result<TaskOutput, TaskServiceError> {
        self.tasks
            .get(id)
            .await?
            .map(TaskOutput::from)
            .ok_or(TaskServiceError::NotFound(id))
    }

    /// Lists tasks, optionally restricted to one status.
    ///
    /// A filter that names no known status matches nothing rather than failing.
    #[tracing::instrument(skip(self))]
    pub async fn list_tasks(
        &self,
        status_filter: Option<&str>,
    ) -> Result<Vec<TaskOutput>, TaskServiceError> {
        let status = match status_filter.map(TaskStatus::from_str).transpose() {
            Ok(status) => status,
            Err(err) => {
                tracing::debug!("{}; returning no tasks", err);
                return Ok(Vec::new());
            }
        };

        let tasks = self.tasks.list_by_status(status).await?;
        Ok(tasks.into_iter().map(TaskOutput::from).collect())
    }

    /// Applies a partial update to a task and refreshes its `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] if no task has the given ID.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(
        &self,
        id: TaskId,
        input: TaskUpdateInput,
    ) -> Result<TaskOutput, TaskServiceError> {
        let mut task = self
            .tasks
            .get(id)
            .await?
            .ok_or(TaskServiceError::NotFound(id))?;

        input.apply_to(&mut task);
        task.touch(self.clock.as_ref());

        let updated = self.tasks.update(task).await?;
        Ok(TaskOutput::from(updated))
    }

    /// Deletes a task. Deleting a task that does not exist is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: TaskId) -> Result<(), TaskServiceError> {
        self.tasks.delete(id).await?;
        Ok(())
    }
}
