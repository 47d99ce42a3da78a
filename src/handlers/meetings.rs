//! # Meeting Handlers
//!
//! Meeting list, create/edit/delete, meeting detail and task creation on a
//! meeting.

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    response::Json,
};
use chrono::Utc;
use sea_orm::{ActiveEnum, Iterable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{CurrentUser, UserHeader};
use crate::error::ApiError;
use crate::forms::{MeetingForm, TaskForm};
use crate::handlers::types::{FormOutcome, MeetingView, Notice, PageQuery, TaskView, UserView};
use crate::models::meeting::{MeetingStatus, MeetingType};
use crate::policy;
use crate::server::AppState;
use crate::services::meetings::{MeetingDetail, MeetingListing};

/// One page of past meetings
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PastMeetingsPage {
    pub items: Vec<MeetingView>,
    #[schema(example = 1)]
    pub page: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Aggregates over the meetings visible to the caller
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeetingStatsView {
    pub total_meetings: u64,
    /// Meetings whose start lies in the past
    pub completed_meetings: u64,
    pub total_tasks: u64,
    /// Mean duration in minutes, null when there are no meetings
    pub average_duration: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeetingListResponse {
    pub upcoming: Vec<MeetingView>,
    pub past: PastMeetingsPage,
    pub stats: MeetingStatsView,
}

impl From<MeetingListing> for MeetingListResponse {
    fn from(listing: MeetingListing) -> Self {
        let past = listing.past;
        Self {
            upcoming: listing.upcoming.iter().map(MeetingView::from).collect(),
            past: PastMeetingsPage {
                items: past.items.iter().map(MeetingView::from).collect(),
                page: past.page,
                total_items: past.total_items,
                total_pages: past.total_pages,
                has_previous: past.page > 1,
                has_next: past.page < past.total_pages,
            },
            stats: MeetingStatsView {
                total_meetings: listing.stats.total_meetings,
                completed_meetings: listing.stats.completed_meetings,
                total_tasks: listing.stats.total_tasks,
                average_duration: listing.stats.average_duration,
            },
        }
    }
}

/// Choices offered by the meeting form
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeetingFormOptions {
    pub users: Vec<UserView>,
    pub meeting_types: Vec<MeetingType>,
    pub statuses: Vec<MeetingStatus>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeetingDetailResponse {
    pub meeting: MeetingView,
    pub participants: Vec<UserView>,
    pub tasks: Vec<TaskView>,
    /// Whether the caller may edit or delete the meeting
    pub can_edit: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeetingEditResponse {
    pub meeting: MeetingView,
    /// Current values in the shape accepted by the update endpoint
    pub current: MeetingForm,
    pub options: MeetingFormOptions,
}

fn current_values(detail: &MeetingDetail) -> MeetingForm {
    let start = detail.meeting.meeting_time.with_timezone(&Utc);
    MeetingForm {
        title: Some(detail.meeting.title.clone()),
        meeting_date: Some(start.format("%Y-%m-%d").to_string()),
        meeting_time: Some(start.format("%H:%M").to_string()),
        duration: Some(detail.meeting.duration),
        meeting_type: Some(detail.meeting.meeting_type.to_value()),
        status: detail.meeting.status.map(|status| status.to_value()),
        participants: detail.participants.iter().map(|user| user.id).collect(),
    }
}

async fn form_options(state: &AppState, user: &CurrentUser) -> Result<MeetingFormOptions, ApiError> {
    let users = state.users().list_users(&user.0).await?;
    Ok(MeetingFormOptions {
        users: users.iter().map(UserView::from).collect(),
        meeting_types: MeetingType::iter().collect(),
        statuses: MeetingStatus::iter().collect(),
    })
}

/// List upcoming and past meetings with statistics
#[utoipa::path(
    get,
    path = "/",
    security(("bearer_auth" = [])),
    params(UserHeader, PageQuery),
    responses(
        (status = 200, description = "Meetings visible to the caller", body = MeetingListResponse),
        (status = 401, description = "Missing credentials or unknown user", body = ApiError)
    ),
    tag = "meetings"
)]
pub async fn list_meetings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<MeetingListResponse>, ApiError> {
    let now = Utc::now();
    let listing = state
        .meetings()
        .list_meetings(&user, now, query.page.unwrap_or(1))
        .await?;
    Ok(Json(listing.into()))
}

/// Choices for a new meeting
#[utoipa::path(
    get,
    path = "/meeting/new/",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 200, description = "Form options", body = MeetingFormOptions),
        (status = 403, description = "Caller is not privileged", body = ApiError)
    ),
    tag = "meetings"
)]
pub async fn new_meeting_form(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<MeetingFormOptions>, ApiError> {
    Ok(Json(form_options(&state, &user).await?))
}

/// Create a meeting
#[utoipa::path(
    post,
    path = "/meeting/new/",
    security(("bearer_auth" = [])),
    params(UserHeader),
    request_body = MeetingForm,
    responses(
        (status = 302, description = "Meeting created; redirects to the meeting list", body = Notice),
        (status = 200, description = "Form errors", body = crate::handlers::types::InvalidFormResponse),
        (status = 403, description = "Caller is not privileged", body = ApiError)
    ),
    tag = "meetings"
)]
pub async fn create_meeting(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<MeetingForm>, JsonRejection>,
) -> Result<FormOutcome, ApiError> {
    let Json(form) = payload?;
    let now = Utc::now();
    match state.meetings().create_meeting(&user, form, now).await {
        Ok(meeting) => Ok(FormOutcome::redirect(
            "/",
            Notice::success("Meeting created.", Some(meeting.id)),
        )),
        Err(err) => FormOutcome::recover(err),
    }
}

/// Meeting detail with participants and tasks
#[utoipa::path(
    get,
    path = "/meeting/{id}/",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Meeting identifier"), UserHeader),
    responses(
        (status = 200, description = "Meeting detail", body = MeetingDetailResponse),
        (status = 403, description = "Caller neither privileged nor a participant", body = ApiError),
        (status = 404, description = "Meeting not found", body = ApiError)
    ),
    tag = "meetings"
)]
pub async fn meeting_detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MeetingDetailResponse>, ApiError> {
    let detail = state.meetings().meeting_detail(&user, id).await?;
    Ok(Json(MeetingDetailResponse {
        meeting: MeetingView::from(&detail.meeting),
        participants: detail.participants.iter().map(UserView::from).collect(),
        tasks: detail
            .tasks
            .iter()
            .map(|(task, owner)| TaskView::with_owner(task, owner.as_ref()))
            .collect(),
        can_edit: policy::is_privileged(&user),
    }))
}

/// Add a task to a meeting
///
/// Unprivileged callers always own the task they create; any `owner` they
/// send is ignored.
#[utoipa::path(
    post,
    path = "/meeting/{id}/",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Meeting identifier"), UserHeader),
    request_body = TaskForm,
    responses(
        (status = 302, description = "Task created; redirects to the meeting", body = Notice),
        (status = 200, description = "Form errors", body = crate::handlers::types::InvalidFormResponse),
        (status = 404, description = "Meeting not found", body = ApiError)
    ),
    tag = "tasks"
)]
pub async fn create_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<TaskForm>, JsonRejection>,
) -> Result<FormOutcome, ApiError> {
    let Json(form) = payload?;
    let now = Utc::now();
    match state.meetings().create_task(id, &user, form, now).await {
        Ok(task) => Ok(FormOutcome::redirect(
            format!("/meeting/{id}/"),
            Notice::success("Task added.", Some(task.id)),
        )),
        Err(err) => FormOutcome::recover(err),
    }
}

/// Current values of a meeting for editing
#[utoipa::path(
    get,
    path = "/meeting/{id}/edit/",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Meeting identifier"), UserHeader),
    responses(
        (status = 200, description = "Current values and form options", body = MeetingEditResponse),
        (status = 403, description = "Caller is not privileged", body = ApiError),
        (status = 404, description = "Meeting not found", body = ApiError)
    ),
    tag = "meetings"
)]
pub async fn edit_meeting_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MeetingEditResponse>, ApiError> {
    let detail = state.meetings().meeting_for_edit(&user.0, id).await?;
    let options = form_options(&state, &user).await?;
    Ok(Json(MeetingEditResponse {
        meeting: MeetingView::from(&detail.meeting),
        current: current_values(&detail),
        options,
    }))
}

/// Update a meeting and replace its participants
#[utoipa::path(
    post,
    path = "/meeting/{id}/edit/",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Meeting identifier"), UserHeader),
    request_body = MeetingForm,
    responses(
        (status = 302, description = "Meeting updated; redirects to the meeting list", body = Notice),
        (status = 200, description = "Form errors", body = crate::handlers::types::InvalidFormResponse),
        (status = 403, description = "Caller is not privileged", body = ApiError),
        (status = 404, description = "Meeting not found", body = ApiError)
    ),
    tag = "meetings"
)]
pub async fn update_meeting(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<MeetingForm>, JsonRejection>,
) -> Result<FormOutcome, ApiError> {
    let Json(form) = payload?;
    let now = Utc::now();
    match state.meetings().update_meeting(&user, id, form, now).await {
        Ok(meeting) => Ok(FormOutcome::redirect(
            "/",
            Notice::success("Meeting updated.", Some(meeting.id)),
        )),
        Err(err) => FormOutcome::recover(err),
    }
}

/// Delete a meeting with its tasks and participants
#[utoipa::path(
    post,
    path = "/meeting/{id}/delete/",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Meeting identifier"), UserHeader),
    responses(
        (status = 302, description = "Meeting deleted; redirects to the meeting list", body = Notice),
        (status = 403, description = "Caller is not privileged", body = ApiError),
        (status = 404, description = "Meeting not found", body = ApiError)
    ),
    tag = "meetings"
)]
pub async fn delete_meeting(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<FormOutcome, ApiError> {
    state.meetings().delete_meeting(&user, id).await?;
    Ok(FormOutcome::redirect(
        "/",
        Notice::success("Meeting deleted.", Some(id)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::meeting::Model as MeetingModel;
    use crate::models::user::Role;
    use crate::policy::fixtures::user;
    use chrono::TimeZone;

    #[test]
    fn current_values_round_trip_through_validation() {
        let start = Utc.with_ymd_and_hms(2025, 3, 14, 10, 30, 0).unwrap();
        let participant = user(Role::Manager, false);
        let detail = MeetingDetail {
            meeting: MeetingModel {
                id: Uuid::new_v4(),
                title: "Sprint review".to_string(),
                meeting_time: start.fixed_offset(),
                duration: 45,
                meeting_type: MeetingType::Review,
                status: Some(MeetingStatus::Scheduled),
                created_at: start.fixed_offset(),
                updated_at: start.fixed_offset(),
            },
            participants: vec![participant.clone()],
            tasks: Vec::new(),
        };

        let input = current_values(&detail).validate().unwrap();
        assert_eq!(input.meeting_time, start);
        assert_eq!(input.duration, 45);
        assert_eq!(input.meeting_type, MeetingType::Review);
        assert_eq!(input.status, Some(MeetingStatus::Scheduled));
        assert_eq!(input.participants, vec![participant.id]);
    }
}
