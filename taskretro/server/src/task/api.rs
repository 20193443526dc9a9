use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{TaskCreateInput, TaskOutput, TaskService, TaskStatus, TaskUpdateInput};
use crate::web::api::{
    ApiError, ErrorResponse, ValidJson, ValidPath, ValidQuery, require_title,
};

#[derive(Clone)]
pub struct TaskState {
    pub service: TaskService,
}

/// JSON representation of a task for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaskJson {
    /// Unique identifier of the task
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    /// Retrospective the task was last attached to
    pub retrospective_id: Option<Uuid>,
}

impl From<TaskOutput> for TaskJson {
    fn from(task: TaskOutput) -> Self {
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

/// Payload for creating a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskCreateJson {
    /// Title of the task, must not be blank
    title: String,
    description: Option<String>,
    due_date: Option<NaiveDate>,
}

/// Payload for a partial task update. Fields that are omitted or `null`
/// are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TaskUpdateJson {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<TaskStatus>,
    #[serde(default)]
    due_date: Option<NaiveDate>,
}

impl TryFrom<TaskCreateJson> for TaskCreateInput {
    type Error = ApiError;

    fn try_from(payload: TaskCreateJson) -> Result<Self, Self::Error> {
        require_title(&payload.title)?;
        Ok(Self {
            title: payload.title,
            description: payload.description,
            due_date: payload.due_date,
        })
    }
}

impl TryFrom<TaskUpdateJson> for TaskUpdateInput {
    type Error = ApiError;

    fn try_from(payload: TaskUpdateJson) -> Result<Self, Self::Error> {
        if let Some(title) = &payload.title {
            require_title(title)?;
        }
        Ok(Self {
            title: payload.title,
            description: payload.description,
            status: payload.status,
            due_date: payload.due_date,
        })
    }
}

/// Query parameters for listing tasks.
#[derive(Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    /// Only return tasks in this status; an unknown status matches nothing
    status_filter: Option<String>,
}

impl From<Vec<(String, String)>> for TaskListQuery {
    /// Builds the query from raw pairs. A repeated key keeps its last value.
    fn from(pairs: Vec<(String, String)>) -> Self {
        let status_filter = pairs
            .into_iter()
            .rev()
            .find(|(key, _)| key == "status_filter")
            .map(|(_, value)| value);
        Self { status_filter }
    }
}

/// Handler for GET /tasks - Returns tasks, optionally filtered by status.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks",
    params(TaskListQuery),
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = Vec<TaskJson>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<TaskState>,
    ValidQuery(pairs): ValidQuery<Vec<(String, String)>>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let query = TaskListQuery::from(pairs);
    let tasks = state
        .service
        .list_tasks(query.status_filter.as_deref())
        .await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for POST /tasks - Creates a task in the `todo` state.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/tasks",
    request_body = TaskCreateJson,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 422, description = "Invalid payload", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<TaskState>,
    ValidJson(payload): ValidJson<TaskCreateJson>,
) -> Result<(StatusCode, Json<TaskJson>), ApiError> {
    let input = TaskCreateInput::try_from(payload)?;
    let created = state.service.create_task(input).await?;
    Ok((StatusCode::CREATED, Json(TaskJson::from(created))))
}

/// Handler for GET /tasks/{id} - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task found", body = TaskJson),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<TaskState>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<TaskJson>, ApiError> {
    let task = state.service.get_task(id).await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for PATCH /tasks/{id} - Applies a partial update.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task ID")),
    request_body = TaskUpdateJson,
    responses(
        (status = 200, description = "Task updated", body = TaskJson),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<TaskState>,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(payload): ValidJson<TaskUpdateJson>,
) -> Result<Json<TaskJson>, ApiError> {
    let input = TaskUpdateInput::try_from(payload)?;
    let updated = state.service.update_task(id, input).await?;
    Ok(Json(TaskJson::from(updated)))
}

/// Handler for DELETE /tasks/{id} - Deletes a task; unknown IDs succeed too.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task ID")),
    responses((status = 204, description = "Task deleted")),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<TaskState>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: TaskState) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .patch(update_task_handler)
                .delete(delete_task_handler),
        )
        .with_state(state)
}
