//! # Server Configuration
//!
//! This module contains the router, middleware stack and OpenAPI document for
//! the Meetings API.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    http::{
        HeaderName, Method,
        header::{AUTHORIZATION, CONTENT_TYPE, LOCATION},
    },
    middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{USER_ID_HEADER, auth_middleware};
use crate::config::AppConfig;
use crate::handlers::{self, dashboard, events, meetings, tasks, users};
use crate::services::{EventService, MeetingService, UserService};
use crate::telemetry::{TRACE_ID_HEADER, trace_context_middleware};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        Self {
            config: Arc::new(config),
            db,
        }
    }

    pub fn meetings(&self) -> MeetingService {
        MeetingService::new(self.db.clone(), self.config.past_meetings_page_size)
    }

    pub fn events(&self) -> EventService {
        EventService::new(self.db.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.db.clone())
    }
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(meetings::list_meetings))
        .route(
            "/meeting/new/",
            get(meetings::new_meeting_form).post(meetings::create_meeting),
        )
        .route(
            "/meeting/{id}/",
            get(meetings::meeting_detail).post(meetings::create_task),
        )
        .route(
            "/meeting/{id}/edit/",
            get(meetings::edit_meeting_form).post(meetings::update_meeting),
        )
        .route("/meeting/{id}/delete/", post(meetings::delete_meeting))
        .route(
            "/task/{id}/edit/",
            get(tasks::edit_task_form).post(tasks::update_task),
        )
        .route("/task/{id}/delete/", post(tasks::delete_task))
        .route("/my-tasks/", get(tasks::my_tasks))
        .route(
            "/management-dashboard/",
            get(dashboard::management_dashboard),
        )
        .route("/management-report/", get(dashboard::management_report))
        .route(
            "/management-report/{manager_id}/",
            get(dashboard::manager_report),
        )
        .route("/events/", get(events::list_events))
        .route(
            "/events/new/",
            get(events::new_event_form).post(events::create_event),
        )
        .route("/events/my-events/", get(events::my_events))
        .route("/events/my-events/json/", get(events::my_events_feed))
        .route(
            "/events/invitation/{id}/respond/{response}/",
            post(events::respond_to_invitation),
        )
        .route("/events/{id}/", get(events::event_detail))
        .route(
            "/events/{id}/edit/",
            get(events::edit_event_form).post(events::update_event),
        )
        .route("/events/{id}/delete/", post(events::delete_event))
        .route("/profile/", get(users::profile).post(users::update_profile))
        .route("/users/", get(users::list_users).post(users::create_user))
        .route("/users/{id}/delete/", post(users::delete_user))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-user-id"),
            TRACE_ID_HEADER,
        ])
        .expose_headers([LOCATION, TRACE_ID_HEADER])
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(protected_routes(state.clone()))
        .route("/health", get(handlers::health))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(middleware::from_fn(trace_context_middleware))
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .with_context(|| format!("invalid server address '{}'", config.api_bind_addr))?;
    let profile = config.profile.clone();

    let app = create_app(AppState::new(config, db));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, %profile, user_header = USER_ID_HEADER, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health,
        crate::handlers::meetings::list_meetings,
        crate::handlers::meetings::new_meeting_form,
        crate::handlers::meetings::create_meeting,
        crate::handlers::meetings::meeting_detail,
        crate::handlers::meetings::create_task,
        crate::handlers::meetings::edit_meeting_form,
        crate::handlers::meetings::update_meeting,
        crate::handlers::meetings::delete_meeting,
        crate::handlers::tasks::edit_task_form,
        crate::handlers::tasks::update_task,
        crate::handlers::tasks::delete_task,
        crate::handlers::tasks::my_tasks,
        crate::handlers::dashboard::management_dashboard,
        crate::handlers::dashboard::management_report,
        crate::handlers::dashboard::manager_report,
        crate::handlers::events::list_events,
        crate::handlers::events::new_event_form,
        crate::handlers::events::create_event,
        crate::handlers::events::event_detail,
        crate::handlers::events::edit_event_form,
        crate::handlers::events::update_event,
        crate::handlers::events::delete_event,
        crate::handlers::events::my_events,
        crate::handlers::events::respond_to_invitation,
        crate::handlers::events::my_events_feed,
        crate::handlers::users::profile,
        crate::handlers::users::update_profile,
        crate::handlers::users::list_users,
        crate::handlers::users::create_user,
        crate::handlers::users::delete_user,
    ),
    components(
        schemas(
            crate::error::ApiError,
            crate::forms::FieldErrors,
            crate::forms::MeetingForm,
            crate::forms::TaskForm,
            crate::forms::EventForm,
            crate::forms::ProfileForm,
            crate::forms::NewUserForm,
            crate::handlers::HealthResponse,
            crate::handlers::types::Notice,
            crate::handlers::types::NoticeLevel,
            crate::handlers::types::InvalidFormResponse,
            crate::handlers::types::ConflictResponse,
            crate::handlers::types::UserView,
            crate::handlers::types::MeetingView,
            crate::handlers::types::TaskView,
            crate::handlers::types::EventView,
            crate::handlers::types::InvitationView,
            crate::models::ServiceInfo,
            crate::repositories::invitation::ParticipantConflict,
            crate::services::events::InvitationResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "meetings", description = "Meetings and their participants"),
        (name = "tasks", description = "Action items attached to meetings"),
        (name = "events", description = "Events, invitations and conflict detection"),
        (name = "management", description = "Rollups over MANAGER users"),
        (name = "users", description = "Profile and user administration"),
    ),
    info(
        title = "Meetings API",
        description = "Meetings, tasks, events and invitations for a small organisation",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
