//! # Form Inputs
//!
//! Request bodies accepted by the form endpoints and their validation into
//! typed inputs. Validation collects every field problem instead of stopping at
//! the first one, so a client can redisplay all messages at once.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::meeting::{MeetingStatus, MeetingType};
use crate::models::task::{TaskPriority, TaskStatus};
use crate::models::user::Role;
use crate::schedule::Interval;

const INVALID_CHOICE: &str = "Select a valid choice.";
const REQUIRED: &str = "This field is required.";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+\-() ]{3,20}$").expect("valid phone pattern"));
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]{1,150}$").expect("valid username pattern"));

/// Field-level validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Turns the accumulated messages into a result for `value`.
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }

    fn required_text(&mut self, field: &str, value: Option<&str>, max_len: usize) -> String {
        let trimmed = value.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            self.add(field, REQUIRED);
        } else if trimmed.chars().count() > max_len {
            self.add(
                field,
                format!("Ensure this value has at most {max_len} characters."),
            );
        }
        trimmed.to_string()
    }

    fn optional_text(&mut self, field: &str, value: Option<&str>, max_len: usize) -> Option<String> {
        let trimmed = value.map(str::trim).filter(|v| !v.is_empty())?;
        if trimmed.chars().count() > max_len {
            self.add(
                field,
                format!("Ensure this value has at most {max_len} characters."),
            );
        }
        Some(trimmed.to_string())
    }

    fn date(&mut self, field: &str, value: &str) -> Option<NaiveDate> {
        match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.add(field, "Enter a valid date.");
                None
            }
        }
    }

    fn time(&mut self, field: &str, value: &str) -> Option<NaiveTime> {
        let value = value.trim();
        match NaiveTime::parse_from_str(value, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        {
            Ok(time) => Some(time),
            Err(_) => {
                self.add(field, "Enter a valid time.");
                None
            }
        }
    }

    fn choice<E>(&mut self, field: &str, value: Option<&str>) -> Option<E>
    where
        E: ActiveEnum<Value = String>,
    {
        let raw = value.map(str::trim).filter(|v| !v.is_empty())?;
        match E::try_from_value(&raw.to_ascii_uppercase()) {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                self.add(field, INVALID_CHOICE);
                None
            }
        }
    }
}

fn combine(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    date.and_time(time).and_utc()
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = BTreeSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Meeting create/update form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MeetingForm {
    #[schema(example = "Sprint review")]
    pub title: Option<String>,
    /// Date part of the meeting start (`YYYY-MM-DD`)
    #[schema(example = "2025-03-14")]
    pub meeting_date: Option<String>,
    /// Time part of the meeting start (`HH:MM`, UTC)
    #[schema(example = "10:00")]
    pub meeting_time: Option<String>,
    /// Length in minutes (default 60)
    pub duration: Option<i32>,
    /// One of TEAM, PROJECT, BRAINSTORM, REVIEW (default TEAM)
    pub meeting_type: Option<String>,
    /// One of SCHEDULED, COMPLETED, CANCELLED
    pub status: Option<String>,
    #[serde(default)]
    pub participants: Vec<Uuid>,
}

/// Validated meeting input.
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingInput {
    pub title: String,
    pub meeting_time: DateTime<Utc>,
    pub duration: i32,
    pub meeting_type: MeetingType,
    pub status: Option<MeetingStatus>,
    pub participants: Vec<Uuid>,
}

impl MeetingForm {
    pub fn validate(self) -> Result<MeetingInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = errors.required_text("title", self.title.as_deref(), 200);

        let date = match self.meeting_date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => errors.date("meeting_date", raw),
            _ => {
                errors.add("meeting_date", REQUIRED);
                None
            }
        };
        let time = match self.meeting_time.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => errors.time("meeting_time", raw),
            _ => {
                errors.add("meeting_time", REQUIRED);
                None
            }
        };

        let duration = self.duration.unwrap_or(60);
        if duration <= 0 {
            errors.add("duration", "Ensure this value is greater than 0.");
        }

        let meeting_type = errors
            .choice::<MeetingType>("meeting_type", self.meeting_type.as_deref())
            .unwrap_or_default();
        let status = errors.choice::<MeetingStatus>("status", self.status.as_deref());

        let participants = dedup(self.participants);

        match (date, time) {
            (Some(date), Some(time)) => errors.finish(|| MeetingInput {
                title,
                meeting_time: combine(date, time),
                duration,
                meeting_type,
                status,
                participants,
            }),
            _ => Err(errors),
        }
    }
}

/// Task create/update form. `owner` is only honoured for privileged callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TaskForm {
    #[schema(example = "Circulate minutes")]
    pub title: Option<String>,
    pub description: Option<String>,
    /// Assignee user id
    pub owner: Option<Uuid>,
    /// Due date (`YYYY-MM-DD`)
    pub due_date: Option<String>,
    /// One of HIGH, MEDIUM, LOW (default MEDIUM)
    pub priority: Option<String>,
    /// One of PENDING, IN_PROGRESS, COMPLETED, BLOCKED (default PENDING)
    pub status: Option<String>,
}

/// Validated task fields, excluding ownership.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFields {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
}

/// A task submission after the access layer decided which shape applies.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskSubmission {
    /// Privileged callers may name any owner, or leave the task unassigned.
    Assigned {
        fields: TaskFields,
        owner: Option<Uuid>,
    },
    /// Everyone else works on tasks that belong to themselves; there is no
    /// owner to submit.
    SelfAssigned { fields: TaskFields },
}

impl TaskSubmission {
    pub fn fields(&self) -> &TaskFields {
        match self {
            TaskSubmission::Assigned { fields, .. } | TaskSubmission::SelfAssigned { fields } => {
                fields
            }
        }
    }
}

impl TaskForm {
    fn validate_fields(&self) -> Result<TaskFields, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = errors.required_text("title", self.title.as_deref(), 255);
        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let due_date = match self.due_date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => errors.date("due_date", raw),
            _ => None,
        };
        let priority = errors
            .choice::<TaskPriority>("priority", self.priority.as_deref())
            .unwrap_or_default();
        let status = errors
            .choice::<TaskStatus>("status", self.status.as_deref())
            .unwrap_or_default();

        errors.finish(|| TaskFields {
            title,
            description,
            due_date,
            priority,
            status,
        })
    }

    /// Validates the form as submitted by a privileged caller.
    pub fn into_assigned(self) -> Result<TaskSubmission, FieldErrors> {
        let fields = self.validate_fields()?;
        Ok(TaskSubmission::Assigned {
            fields,
            owner: self.owner,
        })
    }

    /// Validates the form for a caller without privilege; any owner value is
    /// dropped.
    pub fn into_self_assigned(self) -> Result<TaskSubmission, FieldErrors> {
        let fields = self.validate_fields()?;
        Ok(TaskSubmission::SelfAssigned { fields })
    }
}

/// Event create/update form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct EventForm {
    #[schema(example = "Quarterly planning")]
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Start date (`YYYY-MM-DD`); start defaults to now when date and time are omitted
    pub start_date: Option<String>,
    /// Start time (`HH:MM`, UTC)
    pub start_time: Option<String>,
    /// End date; supply together with `end_time` or not at all
    pub end_date: Option<String>,
    /// End time; supply together with `end_date` or not at all
    pub end_time: Option<String>,
    #[serde(default)]
    pub participants: Vec<Uuid>,
    /// Proceed even if participants have overlapping events
    #[serde(default)]
    pub force: bool,
}

/// Validated event input.
#[derive(Debug, Clone, PartialEq)]
pub struct EventInput {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub window: Interval,
    pub participants: Vec<Uuid>,
    pub force: bool,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl EventForm {
    /// Validates the form. `now` is the request timestamp used when no start
    /// is supplied.
    pub fn validate(self, now: DateTime<Utc>) -> Result<EventInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = errors.required_text("title", self.title.as_deref(), 200);
        let description = present(&self.description).map(str::to_string);
        let location = errors.optional_text("location", self.location.as_deref(), 255);

        let start = match (present(&self.start_date), present(&self.start_time)) {
            (None, None) => Some(now),
            (Some(date), Some(time)) => {
                let date = errors.date("start_date", date);
                let time = errors.time("start_time", time);
                date.zip(time).map(|(d, t)| combine(d, t))
            }
            (Some(_), None) => {
                errors.add("start_time", REQUIRED);
                None
            }
            (None, Some(_)) => {
                errors.add("start_date", REQUIRED);
                None
            }
        };

        let end = match (present(&self.end_date), present(&self.end_time)) {
            (None, None) => None,
            (Some(date), Some(time)) => {
                let date = errors.date("end_date", date);
                let time = errors.time("end_time", time);
                date.zip(time).map(|(d, t)| combine(d, t))
            }
            _ => {
                errors.add(
                    "end_date",
                    "Provide both an end date and an end time, or neither.",
                );
                None
            }
        };

        if let (Some(start), Some(end)) = (start, end)
            && end < start
        {
            errors.add("end_date", "The end must not be before the start.");
        }

        let participants = dedup(self.participants);

        match start {
            Some(start) => errors.finish(|| EventInput {
                title,
                description,
                location,
                window: Interval::new(start, end),
                participants,
                force: self.force,
            }),
            None => Err(errors),
        }
    }
}

/// Profile form for the acting user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub department: Option<String>,
}

fn validate_contact(
    errors: &mut FieldErrors,
    email: Option<&str>,
    phone_number: Option<&str>,
) -> (String, Option<String>) {
    let email = email.map(str::trim).unwrap_or_default().to_string();
    if !email.is_empty() && !EMAIL_RE.is_match(&email) {
        errors.add("email", "Enter a valid email address.");
    }

    let phone = errors.optional_text("phone_number", phone_number, 20);
    if let Some(phone) = phone.as_deref()
        && !PHONE_RE.is_match(phone)
    {
        errors.add("phone_number", "Enter a valid phone number.");
    }

    (email, phone)
}

impl ProfileForm {
    pub fn validate(self) -> Result<ProfileInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let first_name = errors
            .optional_text("first_name", self.first_name.as_deref(), 150)
            .unwrap_or_default();
        let last_name = errors
            .optional_text("last_name", self.last_name.as_deref(), 150)
            .unwrap_or_default();
        let (email, phone_number) =
            validate_contact(&mut errors, self.email.as_deref(), self.phone_number.as_deref());
        let department = errors.optional_text("department", self.department.as_deref(), 100);

        errors.finish(|| ProfileInput {
            first_name,
            last_name,
            email,
            phone_number,
            department,
        })
    }
}

/// Form used by privileged users to register a new user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NewUserForm {
    #[schema(example = "jdoe")]
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub department: Option<String>,
    /// MANAGEMENT or MANAGER (default MANAGER)
    pub role: Option<String>,
    #[serde(default)]
    pub is_superuser: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUserInput {
    pub username: String,
    pub role: Role,
    pub is_superuser: bool,
    pub profile: ProfileInput,
}

impl NewUserForm {
    pub fn validate(self) -> Result<NewUserInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let username = errors.required_text("username", self.username.as_deref(), 150);
        if !username.is_empty() && !errors.has("username") && !USERNAME_RE.is_match(&username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        let role = errors
            .choice::<Role>("role", self.role.as_deref())
            .unwrap_or_default();

        let profile = ProfileForm {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone_number: self.phone_number,
            department: self.department,
        }
        .validate();

        match profile {
            Ok(profile) => errors.finish(|| NewUserInput {
                username,
                role,
                is_superuser: self.is_superuser,
                profile,
            }),
            Err(profile_errors) => {
                for (field, messages) in profile_errors.0 {
                    for message in messages {
                        errors.add(&field, message);
                    }
                }
                Err(errors)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap()
    }

    fn event_form() -> EventForm {
        EventForm {
            title: Some("Planning".to_string()),
            start_date: Some("2025-03-20".to_string()),
            start_time: Some("10:00".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn meeting_form_combines_date_and_time() {
        let input = MeetingForm {
            title: Some("  Standup ".to_string()),
            meeting_date: Some("2025-03-14".to_string()),
            meeting_time: Some("09:30".to_string()),
            participants: vec![Uuid::nil(), Uuid::nil()],
            ..Default::default()
        }
        .validate()
        .expect("valid meeting");

        assert_eq!(input.title, "Standup");
        assert_eq!(
            input.meeting_time,
            Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap()
        );
        assert_eq!(input.duration, 60);
        assert_eq!(input.meeting_type, MeetingType::Team);
        assert_eq!(input.participants, vec![Uuid::nil()]);
    }

    #[test]
    fn meeting_form_reports_every_problem() {
        let errors = MeetingForm {
            title: None,
            meeting_date: Some("14/03/2025".to_string()),
            meeting_time: Some("25:00".to_string()),
            duration: Some(0),
            meeting_type: Some("STANDUP".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();

        for field in ["title", "meeting_date", "meeting_time", "duration", "meeting_type"] {
            assert!(errors.has(field), "expected error for {field}");
        }
    }

    #[test]
    fn choices_are_case_insensitive() {
        let input = MeetingForm {
            title: Some("Review".to_string()),
            meeting_date: Some("2025-03-14".to_string()),
            meeting_time: Some("09:30:00".to_string()),
            meeting_type: Some("review".to_string()),
            status: Some("scheduled".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert_eq!(input.meeting_type, MeetingType::Review);
        assert_eq!(input.status, Some(MeetingStatus::Scheduled));
    }

    #[test]
    fn event_without_start_defaults_to_now() {
        let input = EventForm {
            title: Some("Drop-in".to_string()),
            ..Default::default()
        }
        .validate(now())
        .unwrap();

        assert_eq!(input.window.start, now());
        assert_eq!(input.window.end, None);
    }

    #[test]
    fn event_end_requires_both_parts() {
        let errors = EventForm {
            end_date: Some("2025-03-20".to_string()),
            ..event_form()
        }
        .validate(now())
        .unwrap_err();
        assert!(errors.has("end_date"));

        let errors = EventForm {
            end_time: Some("11:00".to_string()),
            ..event_form()
        }
        .validate(now())
        .unwrap_err();
        assert!(errors.has("end_date"));
    }

    #[test]
    fn event_end_before_start_is_attached_to_end_date() {
        let errors = EventForm {
            end_date: Some("2025-03-20".to_string()),
            end_time: Some("09:59".to_string()),
            ..event_form()
        }
        .validate(now())
        .unwrap_err();

        assert_eq!(
            errors.0.get("end_date").unwrap(),
            &vec!["The end must not be before the start.".to_string()]
        );
    }

    #[test]
    fn event_end_equal_to_start_is_accepted() {
        let input = EventForm {
            end_date: Some("2025-03-20".to_string()),
            end_time: Some("10:00".to_string()),
            ..event_form()
        }
        .validate(now())
        .unwrap();

        assert_eq!(input.window.end, Some(input.window.start));
    }

    #[test]
    fn self_assigned_submission_drops_owner() {
        let form = TaskForm {
            title: Some("Book room".to_string()),
            owner: Some(Uuid::new_v4()),
            ..Default::default()
        };

        let submission = form.into_self_assigned().unwrap();
        assert!(matches!(submission, TaskSubmission::SelfAssigned { .. }));
        assert_eq!(submission.fields().status, TaskStatus::Pending);
        assert_eq!(submission.fields().priority, TaskPriority::Medium);
    }

    #[test]
    fn profile_rejects_malformed_contact_details() {
        let errors = ProfileForm {
            email: Some("not-an-email".to_string()),
            phone_number: Some("call me".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();

        assert!(errors.has("email"));
        assert!(errors.has("phone_number"));
    }

    #[test]
    fn new_user_form_validates_username_and_role() {
        let errors = NewUserForm {
            username: Some("bad name!".to_string()),
            role: Some("TEAM_MEMBER".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();

        assert!(errors.has("username"));
        assert!(errors.has("role"));

        let input = NewUserForm {
            username: Some("m.jones".to_string()),
            email: Some("m.jones@example.com".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(input.role, Role::Manager);
        assert_eq!(input.profile.email, "m.jones@example.com");
    }
}
