use axum::{
    Json, Router,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::config::Config;
use crate::retrospective::{self, RetrospectiveServiceError, RetrospectiveState};
use crate::task::{self, TaskServiceError, TaskState};

/// JSON body returned for every API error.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human readable description of what went wrong
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

const INTERNAL_ERROR_DETAIL: &str =
    "An unexpected error occurred while processing your request. Please try again later.";

/// Errors surfaced by the JSON API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A referenced task or retrospective does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The request body or path could not be parsed or failed validation.
    #[error("{0}")]
    Validation(String),
    /// Anything else; the message is logged, never returned.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Validation(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::Internal(message) => {
                tracing::error!("Request failed: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_DETAIL.to_string())
            }
        };

        (status, Json(ErrorResponse::new(detail))).into_response()
    }
}

impl From<TaskServiceError> for ApiError {
    fn from(err: TaskServiceError) -> Self {
        match err {
            TaskServiceError::NotFound(_) => ApiError::NotFound(err.to_string()),
            TaskServiceError::Repository(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<RetrospectiveServiceError> for ApiError {
    fn from(err: RetrospectiveServiceError) -> Self {
        match err {
            RetrospectiveServiceError::RetrospectiveNotFound(_)
            | RetrospectiveServiceError::TaskNotFound(_) => ApiError::NotFound(err.to_string()),
            RetrospectiveServiceError::Repository(_) => ApiError::Internal(err.to_string()),
        }
    }
}

/// JSON body extractor that reports every rejection as a 422.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Path extractor that reports malformed IDs and dates as a 422.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string extractor that reports undecodable parameters as a 422.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Rejects titles that are empty or only whitespace.
pub fn require_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }
    Ok(())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::health_check_handler,
        task::api::list_tasks_handler,
        task::api::create_task_handler,
        task::api::get_task_handler,
        task::api::update_task_handler,
        task::api::delete_task_handler,
        retrospective::api::create_retrospective_handler,
        retrospective::api::get_retrospective_handler,
        retrospective::api::attach_task_handler,
        retrospective::api::get_retrospective_by_date_handler,
    ),
    components(schemas(ErrorResponse)),
    tags(
        (name = "Health", description = "Liveness probe"),
        (name = "Tasks", description = "Task management"),
        (name = "Retrospectives", description = "Daily retrospectives"),
    )
)]
pub struct ApiDoc;

/// Builds the OpenAPI document, titled and versioned from the config.
pub fn openapi(config: &Config) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = config.app_name.clone();
    doc.info.version = config.version.clone();
    doc
}

/// Creates the JSON API router for tasks and retrospectives.
pub fn create_api_router(task_state: TaskState, retrospective_state: RetrospectiveState) -> Router {
    let task_router = task::api::create_api_router(task_state);
    let retrospective_router = retrospective::api::create_api_router(retrospective_state);
    Router::new().merge(task_router).merge(retrospective_router)
}
