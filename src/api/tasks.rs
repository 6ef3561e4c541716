//! Task and subtask endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use super::routes::AppState;
use super::types::{DeleteResponse, GenerateSubtasksRequest};
use crate::auth::AuthUser;
use crate::service::ServiceError;
use crate::task::{NewSubtask, NewTask, Subtask, SubtaskId, SubtaskPatch, TaskDetail, TaskFilter, TaskId, TaskPatch};

fn service_error(e: ServiceError) -> (StatusCode, String) {
    let status = match &e {
        ServiceError::TaskNotFound | ServiceError::SubtaskNotFound => StatusCode::NOT_FOUND,
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::Store(inner) => {
            tracing::error!("Storage failure: {}", inner);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Vec<TaskDetail>>, (StatusCode, String)> {
    state
        .service
        .list_tasks(&user, &filter)
        .await
        .map(Json)
        .map_err(service_error)
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<NewTask>,
) -> Result<Json<TaskDetail>, (StatusCode, String)> {
    state
        .service
        .create_task(&user, input)
        .await
        .map(Json)
        .map_err(service_error)
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TaskId>,
) -> Result<Json<TaskDetail>, (StatusCode, String)> {
    state
        .service
        .get_task(&user, id)
        .await
        .map(Json)
        .map_err(service_error)
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TaskId>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<TaskDetail>, (StatusCode, String)> {
    state
        .service
        .update_task(&user, id, patch)
        .await
        .map(Json)
        .map_err(service_error)
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TaskId>,
) -> Result<Json<DeleteResponse>, (StatusCode, String)> {
    state
        .service
        .delete_task(&user, id)
        .await
        .map_err(service_error)?;
    Ok(Json(DeleteResponse {
        id: id.to_string(),
        message: "Task deleted successfully".to_string(),
    }))
}

pub async fn create_subtask(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<TaskId>,
    Json(input): Json<NewSubtask>,
) -> Result<Json<Subtask>, (StatusCode, String)> {
    state
        .service
        .create_subtask(&user, task_id, input)
        .await
        .map(Json)
        .map_err(service_error)
}

pub async fn update_subtask(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<SubtaskId>,
    Json(patch): Json<SubtaskPatch>,
) -> Result<Json<Subtask>, (StatusCode, String)> {
    state
        .service
        .update_subtask(&user, id, patch)
        .await
        .map(Json)
        .map_err(service_error)
}

pub async fn delete_subtask(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<SubtaskId>,
) -> Result<Json<DeleteResponse>, (StatusCode, String)> {
    state
        .service
        .delete_subtask(&user, id)
        .await
        .map_err(service_error)?;
    Ok(Json(DeleteResponse {
        id: id.to_string(),
        message: "Subtask deleted successfully".to_string(),
    }))
}

/// Generate subtasks with the model (or fallback lists) and store them.
///
/// The body is optional; an empty body requests the default count.
pub async fn generate_subtasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<TaskId>,
    body: Bytes,
) -> Result<Json<Vec<Subtask>>, (StatusCode, String)> {
    let request: GenerateSubtasksRequest = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateSubtasksRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    };
    state
        .service
        .generate_and_persist_subtasks(&user, task_id, request.num_subtasks)
        .await
        .map(Json)
        .map_err(service_error)
}
