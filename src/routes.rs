use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        GenerationRequest, GenerationResult, LegacyGenerationResponse, ListProjectTasks, Project, ProjectRequest,
        TaskRequest, TaskResponse, TaskStatus,
    },
    orchestrator::TaskGenerationService,
    store::Store,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub generator: Arc<TaskGenerationService>,
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/projects/generate-ai-tasks", post(generate_ai_tasks))
        .route("/api/v1/projects/generate-ai-tasks/:project_id", post(generate_ai_tasks_for_project))
        .route("/api/v1/projects/create", post(create_project))
        .route("/api/v1/projects/list", get(list_projects))
        .route("/api/v1/projects/get/:id", get(get_project))
        .route("/api/v1/projects/delete/:id", delete(delete_project))
        .route("/api/v1/tasks/create", post(create_task))
        .route("/api/v1/tasks/project/list", post(list_project_tasks))
        .route("/api/v1/tasks/get/:id", get(get_task))
        .route("/api/v1/tasks/update", post(update_task))
        .route("/api/v1/tasks/update-status/:task_id/:status", post(update_task_status))
        .route("/api/v1/tasks/delete/:id", delete(delete_task))
        .with_state(state)
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// --- AI generation ---

pub async fn generate_ai_tasks(State(state): State<AppState>, Json(body): Json<GenerationRequest>) -> Json<GenerationResult> {
    tracing::info!("🚀 AI task generation requested for project {} ({} tasks)", body.project_id, body.task_count);
    Json(state.generator.generate(&body).await)
}

pub async fn generate_ai_tasks_for_project(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<LegacyGenerationResponse>> {
    tracing::info!("🚀 Legacy AI task generation for project {}", project_id);
    Ok(Json(state.generator.generate_for_project(&project_id).await?))
}

// --- Projects ---

pub async fn create_project(State(state): State<AppState>, Json(body): Json<ProjectRequest>) -> AppResult<Json<Project>> {
    let project = state.store.create_project(body, now_millis()).await?;
    tracing::info!("✅ Created project {} ({})", project.name, project.id);
    Ok(Json(project))
}

pub async fn list_projects(State(state): State<AppState>) -> AppResult<Json<Vec<Project>>> {
    Ok(Json(state.store.list_projects().await?))
}

pub async fn get_project(Path(id): Path<String>, State(state): State<AppState>) -> AppResult<Json<Project>> {
    state
        .store
        .find_project(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Project not found: {id}")))
}

pub async fn delete_project(Path(id): Path<String>, State(state): State<AppState>) -> AppResult<StatusCode> {
    state.store.delete_project(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Tasks ---

pub async fn create_task(State(state): State<AppState>, Json(body): Json<TaskRequest>) -> AppResult<Json<TaskResponse>> {
    Ok(Json(state.store.create_task_with_timestamp(body, now_millis()).await?))
}

pub async fn list_project_tasks(
    State(state): State<AppState>,
    Json(body): Json<ListProjectTasks>,
) -> AppResult<Json<Vec<TaskResponse>>> {
    Ok(Json(state.store.list_tasks_by_project(&body).await?))
}

pub async fn get_task(Path(id): Path<String>, State(state): State<AppState>) -> AppResult<Json<TaskResponse>> {
    state
        .store
        .find_task(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Task not found: {id}")))
}

pub async fn update_task(State(state): State<AppState>, Json(body): Json<TaskResponse>) -> AppResult<Json<TaskResponse>> {
    Ok(Json(state.store.update_task(body, now_millis()).await?))
}

pub async fn update_task_status(
    Path((task_id, status)): Path<(String, String)>,
    State(state): State<AppState>,
) -> AppResult<Json<TaskResponse>> {
    let status: TaskStatus = status.parse().map_err(AppError::InvalidInput)?;
    Ok(Json(state.store.update_task_status(&task_id, status, now_millis()).await?))
}

pub async fn delete_task(Path(id): Path<String>, State(state): State<AppState>) -> AppResult<StatusCode> {
    state.store.delete_task(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
