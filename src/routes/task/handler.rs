use axum::{
    Extension,
    extract::{
        Json, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{AppState, error::AppError, middleware::AuthUser};

use super::model::{
    CreateTaskRequest, DeleteTaskParams, Task, TaskDetail, TaskFilter, TaskSummary,
    UpdateTaskRequest,
};

/// Fetches a task and checks the caller owns it.
async fn owned_task(pool: &PgPool, task_id: i64, user: &AuthUser) -> Result<Task, AppError> {
    let found = Task::find_by_id(pool, task_id).await?;
    Task::ensure_owned(found, task_id, user.id)
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    filter: Result<Query<TaskFilter>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(filter) = filter?;
    tracing::info!(
        user_id = %user.id,
        is_active = filter.is_active,
        status = ?filter.status,
        "listing tasks"
    );

    let tasks = Task::list_for_owner(&state.pool, user.id, &filter).await?;
    let tasks: Vec<TaskSummary> = tasks.into_iter().map(Into::into).collect();

    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let task = Task::create(&state.pool, user.id, req).await?;
    tracing::info!(task_id = task.id, user_id = %user.id, "created task");

    Ok((StatusCode::CREATED, Json(TaskSummary::from(task))))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let task = owned_task(&state.pool, task_id, &user).await?;

    Ok(Json(TaskDetail::from(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i64>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let mut task = owned_task(&state.pool, task_id, &user).await?;
    req.apply(&mut task);
    let task = task.save(&state.pool).await?;
    tracing::info!(task_id, user_id = %user.id, "updated task");

    Ok(Json(TaskDetail::from(task)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<i64>,
    Query(params): Query<DeleteTaskParams>,
) -> Result<impl IntoResponse, AppError> {
    owned_task(&state.pool, task_id, &user).await?;

    if params.is_hard() {
        tracing::info!(task_id, user_id = %user.id, "hard deleting task");
        Task::hard_delete(&state.pool, task_id).await?;
    } else {
        tracing::info!(task_id, user_id = %user.id, "soft deleting task");
        Task::soft_delete(&state.pool, task_id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
