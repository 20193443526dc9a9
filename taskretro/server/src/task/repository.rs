use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{Task, TaskId, TaskStatus};
use crate::repository::{RepositoryError, RepositoryResult};

/// Storage contract for tasks.
///
/// Implementations keep a secondary index by status so that filtered
/// listings do not scan every task.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new task and returns it unchanged.
    async fn add(&self, task: Task) -> RepositoryResult<Task>;

    /// Finds a task by its ID. Absence is `Ok(None)`, not an error.
    async fn get(&self, id: TaskId) -> RepositoryResult<Option<Task>>;

    /// Lists every task when `status` is `None`, otherwise the tasks currently
    /// in that status in the order they entered it.
    async fn list_by_status(&self, status: Option<TaskStatus>) -> RepositoryResult<Vec<Task>>;

    /// Overwrites a stored task, moving it between status buckets if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the task does not exist.
    async fn update(&self, task: Task) -> RepositoryResult<Task>;

    /// Removes a task. Removing an unknown ID is a no-op.
    async fn delete(&self, id: TaskId) -> RepositoryResult<()>;
}

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, Task>,
    // creation order, used for unfiltered listings
    order: Vec<TaskId>,
    by_status: HashMap<TaskStatus, Vec<TaskId>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InMemoryTaskState {
    fn unindex(&mut self, id: TaskId, status: TaskStatus) {
        if let Some(ids) = self.by_status.get_mut(&status) {
            ids.retain(|existing| *existing != id);
            if ids.is_empty() {
                self.by_status.remove(&status);
            }
        }
    }

    fn index(&mut self, id: TaskId, status: TaskStatus) {
        self.by_status.entry(status).or_default().push(id);
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn add(&self, task: Task) -> RepositoryResult<Task> {
        let mut state = self.state.write().map_err(RepositoryError::unavailable)?;
        let id = task.id();

        if let Some(previous) = state.tasks.insert(id, task.clone()) {
            state.unindex(id, previous.status());
        } else {
            state.order.push(id);
        }
        state.index(id, task.status());
        Ok(task)
    }

    async fn get(&self, id: TaskId) -> RepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(RepositoryError::unavailable)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn list_by_status(&self, status: Option<TaskStatus>) -> RepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(RepositoryError::unavailable)?;
        let ids = match status {
            None => &state.order,
            Some(status) => match state.by_status.get(&status) {
                Some(ids) => ids,
                None => return Ok(Vec::new()),
            },
        };

        Ok(ids
            .iter()
            .filter_map(|id| state.tasks.get(id).cloned())
            .collect())
    }

    async fn update(&self, task: Task) -> RepositoryResult<Task> {
        let mut state = self.state.write().map_err(RepositoryError::unavailable)?;
        let id = task.id();

        let previous_status = state
            .tasks
            .get(&id)
            .map(Task::status)
            .ok_or_else(|| RepositoryError::not_found("Task", id))?;

        if previous_status != task.status() {
            state.unindex(id, previous_status);
            state.index(id, task.status());
        }
        state.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn delete(&self, id: TaskId) -> RepositoryResult<()> {
        let mut state = self.state.write().map_err(RepositoryError::unavailable)?;

        if let Some(removed) = state.tasks.remove(&id) {
            state.unindex(id, removed.status());
            state.order.retain(|existing| *existing != id);
        }
        Ok(())
    }
}
