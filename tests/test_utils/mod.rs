//! Test utilities for database testing.
//!
//! In-memory SQLite databases with all migrations applied plus fixture
//! builders going through the crate's own repositories.

#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use meetings::forms::{MeetingForm, NewUserInput, ProfileInput, TaskForm};
use meetings::models::meeting::Model as MeetingModel;
use meetings::models::task::Model as TaskModel;
use meetings::models::user::{Model as UserModel, Role};
use meetings::repositories::UserRepository;
use meetings::services::{EventService, MeetingService, UserService};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

pub const PAST_PAGE_SIZE: u64 = 10;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// A fixed instant on 2030-06-01 used as "now" and as the day events are
/// scheduled on.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, 1, hour, minute, 0).unwrap()
}

pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    role: Role,
    is_superuser: bool,
) -> Result<UserModel> {
    let user = UserRepository::new(db)
        .create(
            NewUserInput {
                username: username.to_string(),
                role,
                is_superuser,
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
        .await?;
    Ok(user)
}

pub async fn management_user(db: &DatabaseConnection, username: &str) -> Result<UserModel> {
    create_user(db, username, Role::Management, false).await
}

pub async fn manager_user(db: &DatabaseConnection, username: &str) -> Result<UserModel> {
    create_user(db, username, Role::Manager, false).await
}

pub fn meeting_service(db: &DatabaseConnection) -> MeetingService {
    MeetingService::new(db.clone(), PAST_PAGE_SIZE)
}

pub fn event_service(db: &DatabaseConnection) -> EventService {
    EventService::new(db.clone())
}

pub fn user_service(db: &DatabaseConnection) -> UserService {
    UserService::new(db.clone())
}

pub fn meeting_form(title: &str, start: DateTime<Utc>, participants: &[Uuid]) -> MeetingForm {
    MeetingForm {
        title: Some(title.to_string()),
        meeting_date: Some(start.format("%Y-%m-%d").to_string()),
        meeting_time: Some(start.format("%H:%M").to_string()),
        duration: None,
        meeting_type: None,
        status: None,
        participants: participants.to_vec(),
    }
}

/// Creates a meeting as `creator`, who must be privileged.
pub async fn create_meeting(
    db: &DatabaseConnection,
    creator: &UserModel,
    title: &str,
    start: DateTime<Utc>,
    participants: &[Uuid],
) -> Result<MeetingModel> {
    let meeting = meeting_service(db)
        .create_meeting(creator, meeting_form(title, start, participants), Utc::now())
        .await?;
    Ok(meeting)
}

pub fn task_form(title: &str, owner: Option<Uuid>) -> TaskForm {
    TaskForm {
        title: Some(title.to_string()),
        owner,
        ..TaskForm::default()
    }
}

pub async fn create_task(
    db: &DatabaseConnection,
    meeting: &MeetingModel,
    as_user: &UserModel,
    form: TaskForm,
) -> Result<TaskModel> {
    let task = meeting_service(db)
        .create_task(meeting.id, as_user, form, Utc::now())
        .await?;
    Ok(task)
}

pub fn date(y: i32, m: u32, d: u32) -> String {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .format("%Y-%m-%d")
        .to_string()
}
