//! # Management Handlers
//!
//! Task rollups over MANAGER users, for privileged callers only.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    response::Json,
};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{CurrentUser, UserHeader};
use crate::error::ApiError;
use crate::handlers::types::{MeetingView, TaskView, UserView};
use crate::repositories::dashboard::ManagerTaskSummary;
use crate::server::AppState;
use crate::services::meetings::ManagementReport;

/// Task counters for one manager
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ManagerRow {
    pub user_id: Uuid,
    #[schema(example = "jdoe")]
    pub username: String,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub incomplete_tasks: i64,
}

impl From<ManagerTaskSummary> for ManagerRow {
    fn from(row: ManagerTaskSummary) -> Self {
        Self {
            incomplete_tasks: row.incomplete_tasks(),
            user_id: row.user_id,
            username: row.username,
            total_tasks: row.total_tasks,
            completed_tasks: row.completed_tasks,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    pub managers: Vec<ManagerRow>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportMeeting {
    pub meeting: MeetingView,
    /// The selected manager's tasks; empty in the overview
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportResponse {
    pub manager: Option<UserView>,
    /// Task counts per status for the selected manager
    pub status_counts: BTreeMap<String, i64>,
    pub meetings: Vec<ReportMeeting>,
}

impl From<ManagementReport> for ReportResponse {
    fn from(report: ManagementReport) -> Self {
        Self {
            manager: report.manager.as_ref().map(UserView::from),
            status_counts: report
                .status_counts
                .into_iter()
                .map(|(status, count)| (status.to_value(), count))
                .collect(),
            meetings: report
                .entries
                .iter()
                .map(|entry| ReportMeeting {
                    meeting: MeetingView::from(&entry.meeting),
                    tasks: entry.tasks.iter().map(TaskView::from).collect(),
                })
                .collect(),
        }
    }
}

/// Per-manager task counts
#[utoipa::path(
    get,
    path = "/management-dashboard/",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 200, description = "Managers ordered by username", body = DashboardResponse),
        (status = 403, description = "Caller is not privileged", body = ApiError)
    ),
    tag = "management"
)]
pub async fn management_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    let rows = state.meetings().management_dashboard(&user).await?;
    Ok(Json(DashboardResponse {
        managers: rows.into_iter().map(ManagerRow::from).collect(),
    }))
}

/// Meetings that have tasks owned by managers
#[utoipa::path(
    get,
    path = "/management-report/",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 200, description = "Report overview", body = ReportResponse),
        (status = 403, description = "Caller is not privileged", body = ApiError)
    ),
    tag = "management"
)]
pub async fn management_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = state.meetings().management_report(&user, None).await?;
    Ok(Json(report.into()))
}

/// Report for one manager
#[utoipa::path(
    get,
    path = "/management-report/{manager_id}/",
    security(("bearer_auth" = [])),
    params(("manager_id" = Uuid, Path, description = "Manager user identifier"), UserHeader),
    responses(
        (status = 200, description = "Manager report", body = ReportResponse),
        (status = 403, description = "Caller is not privileged", body = ApiError),
        (status = 404, description = "No MANAGER user with that id", body = ApiError)
    ),
    tag = "management"
)]
pub async fn manager_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(manager_id): Path<Uuid>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = state
        .meetings()
        .management_report(&user, Some(manager_id))
        .await?;
    Ok(Json(report.into()))
}
