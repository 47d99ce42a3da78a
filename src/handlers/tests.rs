//! # Tests for Handlers
//!
//! Router-level tests driving the full middleware stack against an in-memory
//! database.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::LOCATION},
    response::Response,
};
use chrono::{Duration, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::forms::{NewUserInput, ProfileInput};
use crate::models::user::{Model as UserModel, Role};
use crate::repositories::UserRepository;
use crate::server::{AppState, create_app};
use crate::telemetry::TRACE_ID_HEADER;

const TOKEN: &str = "router-test-token";

struct TestApp {
    state: AppState,
    admin: UserModel,
    manager: UserModel,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let config = AppConfig {
            operator_tokens: vec![TOKEN.to_string()],
            past_meetings_page_size: 2,
            ..AppConfig::default()
        };
        let state = AppState::new(config, db);

        let admin = Self::user(&state, "admin", Role::Management).await;
        let manager = Self::user(&state, "mallory", Role::Manager).await;

        Self {
            state,
            admin,
            manager,
        }
    }

    async fn user(state: &AppState, username: &str, role: Role) -> UserModel {
        UserRepository::new(&state.db)
            .create(
                NewUserInput {
                    username: username.to_string(),
                    role,
                    is_superuser: false,
                    profile: ProfileInput {
                        first_name: String::new(),
                        last_name: String::new(),
                        email: format!("{username}@example.com"),
                        phone_number: None,
                        department: None,
                    },
                },
                Utc::now(),
            )
            .await
            .unwrap()
    }

    fn router(&self) -> Router {
        create_app(self.state.clone())
    }

    async fn get(&self, user: &UserModel, uri: &str) -> Response {
        self.router()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header("Authorization", format!("Bearer {TOKEN}"))
                    .header("X-User-Id", user.id.to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn post(&self, user: &UserModel, uri: &str, body: Value) -> Response {
        self.router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Authorization", format!("Bearer {TOKEN}"))
                    .header("X-User-Id", user.id.to_string())
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers().get(LOCATION).unwrap().to_str().unwrap()
}

fn event_body(title: &str, start_hour: u32, end_hour: u32, participants: &[Uuid]) -> Value {
    json!({
        "title": title,
        "start_date": "2030-06-01",
        "start_time": format!("{start_hour:02}:00"),
        "end_date": "2030-06-01",
        "end_time": format!("{end_hour:02}:00"),
        "participants": participants,
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let response = app
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["database"], "ok");
    assert_eq!(body["service"], "meetings");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["paths"]["/meeting/{id}/"].is_object());
    assert!(body["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn unauthenticated_request_gets_problem_with_trace_id() {
    let app = TestApp::new().await;
    let response = app
        .router()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/problem+json"
    );
    let trace_id = response
        .headers()
        .get(TRACE_ID_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let body = json_body(response).await;
    assert_eq!(body["trace_id"], trace_id.as_str());
}

#[tokio::test]
async fn unprivileged_user_cannot_manage_meetings() {
    let app = TestApp::new().await;

    let response = app.get(&app.manager, "/meeting/new/").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post(
            &app.manager,
            "/meeting/new/",
            json!({"title": "Nope", "meeting_date": "2030-01-01", "meeting_time": "10:00"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get(&app.manager, "/management-dashboard/").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn meeting_lifecycle_redirects_to_list() {
    let app = TestApp::new().await;

    let response = app
        .post(
            &app.admin,
            "/meeting/new/",
            json!({
                "title": "Planning",
                "meeting_date": "2030-01-01",
                "meeting_time": "10:00",
                "duration": 30,
                "participants": [app.manager.id],
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    let meeting_id = json_body(response).await["resource_id"]
        .as_str()
        .unwrap()
        .to_string();

    let listing = json_body(app.get(&app.manager, "/").await).await;
    assert_eq!(listing["upcoming"].as_array().unwrap().len(), 1);
    assert_eq!(listing["stats"]["total_meetings"], 1);
    assert_eq!(listing["stats"]["average_duration"], 30.0);

    let detail = json_body(app.get(&app.manager, &format!("/meeting/{meeting_id}/")).await).await;
    let participants: Vec<&str> = detail["participants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["username"].as_str().unwrap())
        .collect();
    assert_eq!(participants, vec!["admin", "mallory"]);
    assert_eq!(detail["can_edit"], false);

    let response = app
        .post(&app.admin, &format!("/meeting/{meeting_id}/delete/"), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let response = app.get(&app.admin, &format!("/meeting/{meeting_id}/")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_meeting_form_is_answered_with_field_errors() {
    let app = TestApp::new().await;

    let response = app
        .post(
            &app.admin,
            "/meeting/new/",
            json!({"meeting_date": "not-a-date", "meeting_time": "10:00"}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "invalid");
    assert!(body["errors"]["title"].is_array());
    assert!(body["errors"]["meeting_date"].is_array());
}

#[tokio::test]
async fn non_participant_cannot_view_meeting() {
    let app = TestApp::new().await;
    let outsider = TestApp::user(&app.state, "oscar", Role::Manager).await;

    let response = app
        .post(
            &app.admin,
            "/meeting/new/",
            json!({"title": "Board", "meeting_date": "2030-01-01", "meeting_time": "09:00"}),
        )
        .await;
    let meeting_id = json_body(response).await["resource_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app.get(&outsider, &format!("/meeting/{meeting_id}/")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn task_created_by_unprivileged_user_is_self_owned() {
    let app = TestApp::new().await;

    let response = app
        .post(
            &app.admin,
            "/meeting/new/",
            json!({
                "title": "Retro",
                "meeting_date": "2030-01-01",
                "meeting_time": "09:00",
                "participants": [app.manager.id],
            }),
        )
        .await;
    let meeting_id = json_body(response).await["resource_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .post(
            &app.manager,
            &format!("/meeting/{meeting_id}/"),
            json!({"title": "Write notes", "owner": app.admin.id}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/meeting/{meeting_id}/"));

    let tasks = json_body(app.get(&app.manager, "/my-tasks/").await).await;
    let pending = tasks["pending"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["owner_id"], app.manager.id.to_string());
}

#[tokio::test]
async fn overlapping_event_needs_force() {
    let app = TestApp::new().await;
    let participants = [app.manager.id];

    let response = app
        .post(&app.admin, "/events/new/", event_body("Offsite", 9, 11, &participants))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/events/");

    let clash = event_body("Workshop", 10, 12, &participants);
    let response = app.post(&app.admin, "/events/new/", clash.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "conflict");
    let conflicted: Vec<&str> = body["conflicts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["participant"].as_str().unwrap())
        .collect();
    assert!(conflicted.contains(&"mallory"));

    let events = json_body(app.get(&app.admin, "/events/").await).await;
    assert_eq!(events["events"].as_array().unwrap().len(), 1);

    let mut forced = clash;
    forced["force"] = json!(true);
    let response = app.post(&app.admin, "/events/new/", forced).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let events = json_body(app.get(&app.admin, "/events/").await).await;
    assert_eq!(events["events"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn invitation_response_and_feed() {
    let app = TestApp::new().await;
    let stranger = TestApp::user(&app.state, "sam", Role::Manager).await;

    app.post(
        &app.admin,
        "/events/new/",
        event_body("Offsite", 9, 11, &[app.manager.id]),
    )
    .await;

    let mine = json_body(app.get(&app.manager, "/events/my-events/").await).await;
    assert_eq!(mine["pending_count"], 1);
    let invitation_id = mine["invitations"][0]["invitation_id"]
        .as_str()
        .unwrap()
        .to_string();

    let feed = json_body(app.get(&app.manager, "/events/my-events/json/").await).await;
    assert!(feed.as_array().unwrap().is_empty());

    let uri = format!("/events/invitation/{invitation_id}/respond/accept/");
    let response = app.post(&stranger, &uri, json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.post(&app.manager, &uri, json!({})).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/events/my-events/");

    let feed = json_body(app.get(&app.manager, "/events/my-events/json/").await).await;
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["title"], "Offsite");
    assert_eq!(feed[0]["start"], "2030-06-01T09:00:00Z");
}

#[tokio::test]
async fn past_meetings_are_paginated() {
    let app = TestApp::new().await;
    let base = Utc::now() - Duration::days(10);

    for day in 0..3 {
        let when = base + Duration::days(day);
        let response = app
            .post(
                &app.admin,
                "/meeting/new/",
                json!({
                    "title": format!("Past {day}"),
                    "meeting_date": when.format("%Y-%m-%d").to_string(),
                    "meeting_time": "08:00",
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    let first = json_body(app.get(&app.admin, "/").await).await;
    assert_eq!(first["past"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(first["past"]["total_pages"], 2);
    assert_eq!(first["past"]["items"][0]["title"], "Past 2");
    assert_eq!(first["past"]["has_next"], true);

    let second = json_body(app.get(&app.admin, "/?page=2").await).await;
    assert_eq!(second["past"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(second["past"]["items"][0]["title"], "Past 0");

    let clamped = json_body(app.get(&app.admin, "/?page=99").await).await;
    assert_eq!(clamped["past"]["page"], 2);
}

#[tokio::test]
async fn users_cannot_delete_themselves() {
    let app = TestApp::new().await;

    let response = app
        .post(&app.admin, &format!("/users/{}/delete/", app.admin.id), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post(&app.admin, &format!("/users/{}/delete/", app.manager.id), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/users/");
}
