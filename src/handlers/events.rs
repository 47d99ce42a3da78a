//! # Event Handlers
//!
//! Event CRUD with participant conflict detection, the caller's invitations
//! and the accepted-events feed.

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{CurrentUser, UserHeader};
use crate::error::ApiError;
use crate::forms::EventForm;
use crate::handlers::types::{EventView, FormOutcome, InvitationView, Notice, UserView};
use crate::models::event::Model as EventModel;
use crate::models::invitation::InvitationStatus;
use crate::policy;
use crate::server::AppState;
use crate::services::events::{EventDetail, InvitationResponse};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventListResponse {
    pub events: Vec<EventView>,
    pub can_create: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventDetailResponse {
    pub event: EventView,
    pub invitations: Vec<InvitationView>,
    pub can_edit: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventFormOptions {
    pub users: Vec<UserView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventEditResponse {
    pub event: EventView,
    /// Current values in the shape accepted by the update endpoint
    pub current: EventForm,
    pub options: EventFormOptions,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MyInvitation {
    pub invitation_id: Uuid,
    pub status: InvitationStatus,
    pub responded_at: Option<DateTime<Utc>>,
    pub event: EventView,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MyEventsResponse {
    pub invitations: Vec<MyInvitation>,
    pub pending_count: usize,
    pub accepted_count: usize,
}

/// Calendar feed entry; `end` is omitted for events without an end
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FeedEntry {
    #[schema(example = "Quarterly planning")]
    pub title: String,
    pub start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl From<&EventModel> for FeedEntry {
    fn from(event: &EventModel) -> Self {
        Self {
            title: event.title.clone(),
            start: event.start_datetime.with_timezone(&Utc),
            end: event.end_datetime.map(|end| end.with_timezone(&Utc)),
        }
    }
}

fn current_values(detail: &EventDetail) -> EventForm {
    let start = detail.event.start_datetime.with_timezone(&Utc);
    let end = detail.event.end_datetime.map(|end| end.with_timezone(&Utc));
    EventForm {
        title: Some(detail.event.title.clone()),
        description: detail.event.description.clone(),
        location: detail.event.location.clone(),
        start_date: Some(start.format("%Y-%m-%d").to_string()),
        start_time: Some(start.format("%H:%M:%S").to_string()),
        end_date: end.map(|end| end.format("%Y-%m-%d").to_string()),
        end_time: end.map(|end| end.format("%H:%M:%S").to_string()),
        participants: detail
            .invitations
            .iter()
            .map(|(invitation, _)| invitation.invitee_id)
            .collect(),
        force: false,
    }
}

async fn form_options(state: &AppState, user: &CurrentUser) -> Result<EventFormOptions, ApiError> {
    let users = state.users().list_users(&user.0).await?;
    Ok(EventFormOptions {
        users: users.iter().map(UserView::from).collect(),
    })
}

/// All events ordered by start
#[utoipa::path(
    get,
    path = "/events/",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 200, description = "Events", body = EventListResponse)
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<EventListResponse>, ApiError> {
    let events = state.events().list_events(&user).await?;
    Ok(Json(EventListResponse {
        events: events
            .iter()
            .map(|(event, creator)| EventView::with_creator(event, creator.as_ref()))
            .collect(),
        can_create: policy::is_privileged(&user),
    }))
}

/// Choices for a new event
#[utoipa::path(
    get,
    path = "/events/new/",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 200, description = "Form options", body = EventFormOptions),
        (status = 403, description = "Caller is not privileged", body = ApiError)
    ),
    tag = "events"
)]
pub async fn new_event_form(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<EventFormOptions>, ApiError> {
    Ok(Json(form_options(&state, &user).await?))
}

/// Create an event and invite its participants
///
/// When a participant already has an overlapping event the submission is
/// answered with the conflicts and nothing is stored, unless `force` is set.
#[utoipa::path(
    post,
    path = "/events/new/",
    security(("bearer_auth" = [])),
    params(UserHeader),
    request_body = EventForm,
    responses(
        (status = 302, description = "Event created; redirects to the event list", body = Notice),
        (status = 200, description = "Form errors or participant conflicts", body = crate::handlers::types::ConflictResponse),
        (status = 403, description = "Caller is not privileged", body = ApiError)
    ),
    tag = "events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<EventForm>, JsonRejection>,
) -> Result<FormOutcome, ApiError> {
    let Json(form) = payload?;
    let now = Utc::now();
    match state.events().create_event(&user, form, now).await {
        Ok(event) => Ok(FormOutcome::redirect(
            "/events/",
            Notice::success("Event created.", Some(event.id)),
        )),
        Err(err) => FormOutcome::recover(err),
    }
}

/// Event detail with invitations
#[utoipa::path(
    get,
    path = "/events/{id}/",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Event identifier"), UserHeader),
    responses(
        (status = 200, description = "Event detail", body = EventDetailResponse),
        (status = 404, description = "Event not found", body = ApiError)
    ),
    tag = "events"
)]
pub async fn event_detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<EventDetailResponse>, ApiError> {
    let detail = state.events().event_detail(&user, id).await?;
    Ok(Json(EventDetailResponse {
        event: EventView::from(&detail.event),
        invitations: detail
            .invitations
            .iter()
            .map(|(invitation, invitee)| InvitationView::new(invitation, invitee.as_ref()))
            .collect(),
        can_edit: policy::is_privileged(&user),
    }))
}

/// Current values of an event for editing
#[utoipa::path(
    get,
    path = "/events/{id}/edit/",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Event identifier"), UserHeader),
    responses(
        (status = 200, description = "Current values and form options", body = EventEditResponse),
        (status = 403, description = "Caller is not privileged", body = ApiError),
        (status = 404, description = "Event not found", body = ApiError)
    ),
    tag = "events"
)]
pub async fn edit_event_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<EventEditResponse>, ApiError> {
    let detail = state.events().event_for_edit(&user.0, id).await?;
    let options = form_options(&state, &user).await?;
    Ok(Json(EventEditResponse {
        event: EventView::from(&detail.event),
        current: current_values(&detail),
        options,
    }))
}

/// Update an event and reconcile its invitations
#[utoipa::path(
    post,
    path = "/events/{id}/edit/",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Event identifier"), UserHeader),
    request_body = EventForm,
    responses(
        (status = 302, description = "Event updated; redirects to the event list", body = Notice),
        (status = 200, description = "Form errors or participant conflicts", body = crate::handlers::types::ConflictResponse),
        (status = 403, description = "Caller is not privileged", body = ApiError),
        (status = 404, description = "Event not found", body = ApiError)
    ),
    tag = "events"
)]
pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<EventForm>, JsonRejection>,
) -> Result<FormOutcome, ApiError> {
    let Json(form) = payload?;
    let now = Utc::now();
    match state.events().update_event(&user, id, form, now).await {
        Ok(event) => Ok(FormOutcome::redirect(
            "/events/",
            Notice::success("Event updated.", Some(event.id)),
        )),
        Err(err) => FormOutcome::recover(err),
    }
}

/// Delete an event and its invitations
#[utoipa::path(
    post,
    path = "/events/{id}/delete/",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Event identifier"), UserHeader),
    responses(
        (status = 302, description = "Event deleted; redirects to the event list", body = Notice),
        (status = 403, description = "Caller is not privileged", body = ApiError),
        (status = 404, description = "Event not found", body = ApiError)
    ),
    tag = "events"
)]
pub async fn delete_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<FormOutcome, ApiError> {
    state.events().delete_event(&user, id).await?;
    Ok(FormOutcome::redirect(
        "/events/",
        Notice::success("Event deleted.", Some(id)),
    ))
}

/// The caller's invitations ordered by event start
#[utoipa::path(
    get,
    path = "/events/my-events/",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 200, description = "Invitations with counts", body = MyEventsResponse)
    ),
    tag = "events"
)]
pub async fn my_events(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MyEventsResponse>, ApiError> {
    let mine = state.events().list_my_events(&user).await?;
    Ok(Json(MyEventsResponse {
        invitations: mine
            .invitations
            .iter()
            .map(|(invitation, event)| MyInvitation {
                invitation_id: invitation.id,
                status: invitation.status,
                responded_at: invitation.responded_at.map(|at| at.with_timezone(&Utc)),
                event: EventView::from(event),
            })
            .collect(),
        pending_count: mine.pending,
        accepted_count: mine.accepted,
    }))
}

/// Accept or decline an invitation
#[utoipa::path(
    post,
    path = "/events/invitation/{id}/respond/{response}/",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Invitation identifier"),
        ("response" = InvitationResponse, Path, description = "accept or decline"),
        UserHeader
    ),
    responses(
        (status = 302, description = "Response recorded; redirects to the caller's events", body = Notice),
        (status = 404, description = "No such invitation for the caller", body = ApiError)
    ),
    tag = "events"
)]
pub async fn respond_to_invitation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, response)): Path<(Uuid, InvitationResponse)>,
) -> Result<FormOutcome, ApiError> {
    let now = Utc::now();
    let invitation = state
        .events()
        .respond_to_invitation(&user, id, response, now)
        .await?;
    let message = match response {
        InvitationResponse::Accept => "Invitation accepted.",
        InvitationResponse::Decline => "Invitation declined.",
    };
    Ok(FormOutcome::redirect(
        "/events/my-events/",
        Notice::success(message, Some(invitation.id)),
    ))
}

/// Accepted events as a calendar feed
#[utoipa::path(
    get,
    path = "/events/my-events/json/",
    security(("bearer_auth" = [])),
    params(UserHeader),
    responses(
        (status = 200, description = "Accepted events", body = [FeedEntry])
    ),
    tag = "events"
)]
pub async fn my_events_feed(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<FeedEntry>>, ApiError> {
    let events = state.events().export_my_events_as_feed(&user).await?;
    Ok(Json(events.iter().map(FeedEntry::from).collect()))
}
