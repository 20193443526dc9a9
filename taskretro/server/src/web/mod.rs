use axum::{Json, Router, routing::get};
use mockable::DefaultClock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::ToSchema;

use crate::SharedClock;
use crate::config::Config;
use crate::retrospective::{
    InMemoryRetrospectiveRepository, RetrospectiveRepository, RetrospectiveService,
    RetrospectiveState,
};
use crate::task::{InMemoryTaskRepository, TaskRepository, TaskService, TaskState};

pub mod api;

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub task_service: TaskService,
    pub retrospective_service: RetrospectiveService,
}

impl AppState {
    /// Wires services to the given repositories. Both services share the task repository.
    pub fn new(
        config: Config,
        tasks: Arc<dyn TaskRepository>,
        retrospectives: Arc<dyn RetrospectiveRepository>,
        clock: SharedClock,
    ) -> Self {
        Self {
            config: Arc::new(config),
            task_service: TaskService::new(tasks.clone(), clock.clone()),
            retrospective_service: RetrospectiveService::new(retrospectives, tasks, clock),
        }
    }

    /// Builds the application on empty in-memory repositories and the system clock.
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryTaskRepository::new()),
            Arc::new(InMemoryRetrospectiveRepository::new()),
            Arc::new(DefaultClock),
        )
    }
}

/// Response body of the health check.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

/// Creates the full application router: health check, JSON API and OpenAPI document.
pub fn create_app(state: AppState) -> Router {
    let openapi = api::openapi(&state.config);

    let api_router = api::create_api_router(
        TaskState {
            service: state.task_service,
        },
        RetrospectiveState {
            service: state.retrospective_service,
        },
    );

    Router::new()
        .route("/", get(health_check_handler))
        .route("/openapi.json", get(move || async move { Json(openapi) }))
        .merge(api_router)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    if config.reload {
        tracing::warn!(
            "Auto reload was requested but is not supported; \
             restart the server to pick up changes"
        );
    }

    let server_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!(
        "{} {} running on http://{}",
        config.app_name,
        config.version,
        server_address
    );

    let app = create_app(AppState::in_memory(config));

    axum::serve(listener, app).await?;
    Ok(())
}

/// Handler for GET / - Reports that the service is up.
#[tracing::instrument]
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is healthy", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health_check_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
