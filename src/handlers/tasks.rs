//! # Task Handlers

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    response::Json,
};
use chrono::Utc;
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{CurrentUser, UserHeader};
use crate::error::ApiError;
use crate::forms::TaskForm;
use crate::handlers::types::{FormOutcome, Notice, TaskView};
use crate::models::task::Model as TaskModel;
use crate::policy;
use crate::server::AppState;
use crate::services::meetings::TaskBoard;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskEditResponse {
    pub task: TaskView,
    /// Current values in the shape accepted by the update endpoint
    pub current: TaskForm,
    /// Whether `owner` in the submitted form is honoured
    pub can_reassign: bool,
}

/// The caller's tasks grouped by status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MyTasksResponse {
    pub pending: Vec<TaskView>,
    pub in_progress: Vec<TaskView>,
    pub blocked: Vec<TaskView>,
    pub completed: Vec<TaskView>,
}

impl From<TaskBoard> for MyTasksResponse {
    fn from(board: TaskBoard) -> Self {
        let views = |tasks: Vec<TaskModel>| tasks.iter().map(TaskView::from).collect();
        Self {
            pending: views(board.pending),
            in_progress: views(board.in_progress),
            blocked: views(board.blocked),
            completed: views(board.completed),
        }
    }
}

fn current_values(task: &TaskModel) -> TaskForm {
    TaskForm {
        title: Some(task.title.clone()),
        description: task.description.clone(),
        owner: task.owner_id,
        due_date: task.due_date.map(|due| due.format("%Y-%m-%d").to_string()),
        priority: Some(task.priority.to_value()),
        status: Some(task.status.to_value()),
    }
}

/// Current values of a task for editing
#[utoipa::path(
    get,
    path = "/task/{id}/edit/",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Task identifier"), UserHeader),
    responses(
        (status = 200, description = "Current values", body = TaskEditResponse),
        (status = 403, description = "Caller neither privileged nor the owner", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError)
    ),
    tag = "tasks"
)]
pub async fn edit_task_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskEditResponse>, ApiError> {
    let task = state.meetings().task_for_edit(&user, id).await?;
    Ok(Json(TaskEditResponse {
        task: TaskView::from(&task),
        current: current_values(&task),
        can_reassign: policy::is_privileged(&user),
    }))
}

/// Update a task
///
/// Owners without privileges cannot reassign the task; their `owner` field is
/// ignored.
#[utoipa::path(
    post,
    path = "/task/{id}/edit/",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Task identifier"), UserHeader),
    request_body = TaskForm,
    responses(
        (status = 302, description = "Task updated; redirects to its meeting", body = Notice),
        (status = 200, description = "Form errors", body = crate::handlers::types::InvalidFormResponse),
        (status = 403, description = "Caller neither privileged nor the owner", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError)
    ),
    tag = "tasks"
)]
pub async fn update_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<TaskForm>, JsonRejection>,
) -> Result<FormOutcome, ApiError> {
    let Json(form) = payload?;
    let now = Utc::now();
    match state.meetings().update_task(&user, id, form, now).await {
        Ok(task) => Ok(FormOutcome::redirect(
            format!("/meeting/{}/", task.meeting_id),
            Notice::success("Task updated.", Some(task.id)),
        )),
        Err(err) => FormOutcome::recover(err),
    }
}

/// Delete a task
#[utoipa::path(
    post,
    path = "/task/{id}/delete/",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Task identifier"), UserHeader),
    responses(
        (status = 302, description = "Task deleted; redirects to its meeting", body = Notice),
        (status = 403, description = "Caller neither privileged nor the owner", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError)
    ),
    tag = "tasks"
)]
pub async fn delete_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<FormOutcome, ApiError> {
    let meeting_id = state.meetings().delete_task(&user, id).await?;
    Ok(FormOutcome::redirect(
        format!("/meeting/{meeting_id}/"),
        Notice::success("Task deleted.", Some(id)),
    ))
}

/// Tasks owned by the caller
#[utoipa::path(
    get,
    path = "/my-tasks/",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 200, description = "Tasks grouped by status", body = MyTasksResponse)
    ),
    tag = "tasks"
)]
pub async fn my_tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MyTasksResponse>, ApiError> {
    let board = state.meetings().list_my_tasks(&user).await?;
    Ok(Json(board.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskStatus};
    use crate::policy::fixtures::task_owned_by;
    use chrono::NaiveDate;

    #[test]
    fn current_values_use_form_spelling() {
        let mut task = task_owned_by(Some(Uuid::nil()));
        task.status = TaskStatus::InProgress;
        task.priority = TaskPriority::High;
        task.due_date = NaiveDate::from_ymd_opt(2025, 4, 1);

        let form = current_values(&task);
        assert_eq!(form.status.as_deref(), Some("IN_PROGRESS"));
        assert_eq!(form.priority.as_deref(), Some("HIGH"));
        assert_eq!(form.due_date.as_deref(), Some("2025-04-01"));
        assert_eq!(form.owner, Some(Uuid::nil()));
    }
}
