use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{RetrospectiveCreateInput, RetrospectiveOutput, RetrospectiveService};
use crate::web::api::{ApiError, ErrorResponse, ValidJson, ValidPath, require_title};

#[derive(Clone)]
pub struct RetrospectiveState {
    pub service: RetrospectiveService,
}

/// JSON representation of a retrospective for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RetrospectiveJson {
    pub id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    pub date: NaiveDate,
    /// IDs of the attached tasks, in attachment order
    pub tasks: Vec<Uuid>,
}

impl From<RetrospectiveOutput> for RetrospectiveJson {
    fn from(retrospective: RetrospectiveOutput) -> Self {
        Self {
            id: retrospective.id,
            title: retrospective.title,
            summary: retrospective.summary,
            date: retrospective.date,
            tasks: retrospective.tasks,
        }
    }
}

/// Payload for creating a retrospective.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RetrospectiveCreateJson {
    title: String,
    summary: Option<String>,
    /// Defaults to today
    date: Option<NaiveDate>,
}

impl TryFrom<RetrospectiveCreateJson> for RetrospectiveCreateInput {
    type Error = ApiError;

    fn try_from(payload: RetrospectiveCreateJson) -> Result<Self, Self::Error> {
        require_title(&payload.title)?;
        Ok(Self {
            title: payload.title,
            summary: payload.summary,
            date: payload.date,
        })
    }
}

/// Handler for POST /retrospectives - Creates a retrospective.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/retrospectives",
    request_body = RetrospectiveCreateJson,
    responses(
        (status = 201, description = "Retrospective created", body = RetrospectiveJson),
        (status = 422, description = "Invalid payload", body = ErrorResponse)
    ),
    tag = "Retrospectives"
)]
pub async fn create_retrospective_handler(
    State(state): State<RetrospectiveState>,
    ValidJson(payload): ValidJson<RetrospectiveCreateJson>,
) -> Result<(StatusCode, Json<RetrospectiveJson>), ApiError> {
    let input = RetrospectiveCreateInput::try_from(payload)?;
    let created = state.service.create_retrospective(input).await?;
    Ok((StatusCode::CREATED, Json(RetrospectiveJson::from(created))))
}

/// Handler for GET /retrospectives/{rid} - Returns a single retrospective.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/retrospectives/{rid}",
    params(("rid" = Uuid, Path, description = "Retrospective ID")),
    responses(
        (status = 200, description = "Retrospective found", body = RetrospectiveJson),
        (status = 404, description = "Retrospective not found", body = ErrorResponse)
    ),
    tag = "Retrospectives"
)]
pub async fn get_retrospective_handler(
    State(state): State<RetrospectiveState>,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<RetrospectiveJson>, ApiError> {
    let retrospective = state.service.get_retrospective(id).await?;
    Ok(Json(RetrospectiveJson::from(retrospective)))
}

/// Handler for POST /retrospectives/{rid}/tasks/{tid} - Attaches a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/retrospectives/{rid}/tasks/{tid}",
    params(
        ("rid" = Uuid, Path, description = "Retrospective ID"),
        ("tid" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task attached", body = RetrospectiveJson),
        (status = 404, description = "Retrospective or task not found", body = ErrorResponse)
    ),
    tag = "Retrospectives"
)]
pub async fn attach_task_handler(
    State(state): State<RetrospectiveState>,
    ValidPath((rid, tid)): ValidPath<(Uuid, Uuid)>,
) -> Result<Json<RetrospectiveJson>, ApiError> {
    let attached = state.service.attach_task(rid, tid).await?;
    Ok(Json(RetrospectiveJson::from(attached)))
}

/// Handler for GET /retrospectives/date/{date} - Returns the retrospective for
/// a day, or `null` when there is none.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/retrospectives/date/{date}",
    params(("date" = NaiveDate, Path, description = "Calendar date, YYYY-MM-DD")),
    responses(
        (
            status = 200,
            description = "Retrospective for the date, or null",
            body = Option<RetrospectiveJson>
        ),
        (status = 422, description = "Malformed date", body = ErrorResponse)
    ),
    tag = "Retrospectives"
)]
pub async fn get_retrospective_by_date_handler(
    State(state): State<RetrospectiveState>,
    ValidPath(date): ValidPath<NaiveDate>,
) -> Result<Json<Option<RetrospectiveJson>>, ApiError> {
    let summary = state.service.get_summary(date).await?;
    Ok(Json(summary.map(RetrospectiveJson::from)))
}

/// Creates and returns the retrospectives API router.
pub fn create_api_router(state: RetrospectiveState) -> Router {
    Router::new()
        .route("/retrospectives", post(create_retrospective_handler))
        .route("/retrospectives/{rid}", get(get_retrospective_handler))
        .route(
            "/retrospectives/{rid}/tasks/{tid}",
            post(attach_task_handler),
        )
        .route(
            "/retrospectives/date/{date}",
            get(get_retrospective_by_date_handler),
        )
        .with_state(state)
}
