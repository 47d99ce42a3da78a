//! # Common API Types
//!
//! Response bodies shared across handlers and the form outcome mapping used
//! by every mutating endpoint.

use axum::{
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ServiceError};
use crate::forms::FieldErrors;
use crate::models::event::Model as EventModel;
use crate::models::invitation::{InvitationStatus, Model as InvitationModel};
use crate::models::meeting::{MeetingStatus, MeetingType, Model as MeetingModel};
use crate::models::task::{Model as TaskModel, TaskPriority, TaskStatus};
use crate::models::user::{Model as UserModel, Role};
use crate::repositories::invitation::ParticipantConflict;

/// Notice level shown to the user after a redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
}

/// Body of a redirect after a successful mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Notice {
    pub level: NoticeLevel,
    #[schema(example = "Meeting created.")]
    pub message: String,
    /// Identifier of the affected resource
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<Uuid>,
}

impl Notice {
    pub fn success(message: impl Into<String>, resource_id: Option<Uuid>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            resource_id,
        }
    }
}

/// Returned with status 200 when a form submission does not validate
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvalidFormResponse {
    /// Always `invalid`
    #[schema(example = "invalid")]
    pub status: String,
    pub errors: FieldErrors,
}

/// Returned with status 200 when participants are busy; resubmit with
/// `force: true` to proceed
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConflictResponse {
    /// Always `conflict`
    #[schema(example = "conflict")]
    pub status: String,
    pub conflicts: Vec<ParticipantConflict>,
}

/// Result of a form submission.
#[derive(Debug)]
pub enum FormOutcome {
    Redirect { location: String, notice: Notice },
    Invalid(FieldErrors),
    Conflicts(Vec<ParticipantConflict>),
}

impl FormOutcome {
    pub fn redirect(location: impl Into<String>, notice: Notice) -> Self {
        Self::Redirect {
            location: location.into(),
            notice,
        }
    }

    /// Keeps validation failures and soft conflicts on the form; everything
    /// else becomes an error response.
    pub fn recover(error: ServiceError) -> Result<Self, ApiError> {
        match error {
            ServiceError::Validation(errors) => Ok(Self::Invalid(errors)),
            ServiceError::Conflict(conflicts) => Ok(Self::Conflicts(conflicts)),
            other => Err(other.into()),
        }
    }
}

impl IntoResponse for FormOutcome {
    fn into_response(self) -> Response {
        match self {
            FormOutcome::Redirect { location, notice } => {
                (StatusCode::FOUND, [(LOCATION, location)], Json(notice)).into_response()
            }
            FormOutcome::Invalid(errors) => Json(InvalidFormResponse {
                status: "invalid".to_string(),
                errors,
            })
            .into_response(),
            FormOutcome::Conflicts(conflicts) => Json(ConflictResponse {
                status: "conflict".to_string(),
                conflicts,
            })
            .into_response(),
        }
    }
}

/// Page selector for paginated listings
#[derive(Debug, Clone, Copy, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number; out-of-range values are clamped
    pub page: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub department: Option<String>,
    pub role: Role,
    pub is_superuser: bool,
}

impl From<&UserModel> for UserView {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_number: user.phone_number.clone(),
            department: user.department.clone(),
            role: user.role,
            is_superuser: user.is_superuser,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeetingView {
    pub id: Uuid,
    pub title: String,
    pub meeting_time: DateTime<Utc>,
    /// Minutes
    pub duration: i32,
    pub meeting_type: MeetingType,
    pub status: Option<MeetingStatus>,
}

impl From<&MeetingModel> for MeetingView {
    fn from(meeting: &MeetingModel) -> Self {
        Self {
            id: meeting.id,
            title: meeting.title.clone(),
            meeting_time: meeting.meeting_time.with_timezone(&Utc),
            duration: meeting.duration,
            meeting_type: meeting.meeting_type,
            status: meeting.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub meeting_id: Uuid,
    pub owner_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_username: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    pub fn with_owner(task: &TaskModel, owner: Option<&UserModel>) -> Self {
        Self {
            owner_username: owner.map(|user| user.username.clone()),
            ..Self::from(task)
        }
    }
}

impl From<&TaskModel> for TaskView {
    fn from(task: &TaskModel) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            meeting_id: task.meeting_id,
            owner_id: task.owner_id,
            owner_username: None,
            due_date: task.due_date,
            status: task.status,
            priority: task.priority,
            updated_at: task.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub created_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_username: Option<String>,
}

impl EventView {
    pub fn with_creator(event: &EventModel, creator: Option<&UserModel>) -> Self {
        Self {
            creator_username: creator.map(|user| user.username.clone()),
            ..Self::from(event)
        }
    }
}

impl From<&EventModel> for EventView {
    fn from(event: &EventModel) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            description: event.description.clone(),
            start: event.start_datetime.with_timezone(&Utc),
            end: event.end_datetime.map(|end| end.with_timezone(&Utc)),
            location: event.location.clone(),
            created_by: event.created_by,
            creator_username: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvitationView {
    pub id: Uuid,
    pub event_id: Uuid,
    pub invitee_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitee_username: Option<String>,
    pub status: InvitationStatus,
    pub responded_at: Option<DateTime<Utc>>,
}

impl InvitationView {
    pub fn new(invitation: &InvitationModel, invitee: Option<&UserModel>) -> Self {
        Self {
            id: invitation.id,
            event_id: invitation.event_id,
            invitee_id: invitation.invitee_id,
            invitee_username: invitee.map(|user| user.username.clone()),
            status: invitation.status,
            responded_at: invitation.responded_at.map(|at| at.with_timezone(&Utc)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_sets_location_and_notice() {
        let response = FormOutcome::redirect("/", Notice::success("Meeting created.", None))
            .into_response();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/");
    }

    #[test]
    fn validation_and_conflicts_are_recovered() {
        let invalid = FormOutcome::recover(ServiceError::Validation(FieldErrors::single(
            "title",
            "This field is required.",
        )))
        .unwrap();
        assert!(matches!(invalid, FormOutcome::Invalid(_)));
        assert_eq!(invalid.into_response().status(), StatusCode::OK);

        let conflicts = FormOutcome::recover(ServiceError::Conflict(Vec::new())).unwrap();
        assert!(matches!(conflicts, FormOutcome::Conflicts(_)));
    }

    #[test]
    fn forbidden_is_not_recovered() {
        let error = FormOutcome::recover(ServiceError::Forbidden).unwrap_err();
        assert_eq!(error.status, StatusCode::FORBIDDEN);
    }
}
