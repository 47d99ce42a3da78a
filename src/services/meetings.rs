//! # Meeting Service
//!
//! Meeting and task operations behind the access policy, the personal task
//! board and the management rollups.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::forms::{FieldErrors, MeetingForm, TaskForm, TaskSubmission};
use crate::models::meeting::Model as MeetingModel;
use crate::models::task::{Model as TaskModel, TaskStatus};
use crate::models::user::{Model as UserModel, Role};
use crate::policy;
use crate::repositories::dashboard::ManagerTaskSummary;
use crate::repositories::meeting::{MeetingPage, MeetingScope};
use crate::repositories::task::OwnerChange;
use crate::repositories::{DashboardRepository, MeetingRepository, TaskRepository, UserRepository};

/// Aggregates shown next to the meeting list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeetingStats {
    pub total_meetings: u64,
    /// Meetings whose time has passed
    pub completed_meetings: u64,
    pub total_tasks: u64,
    /// Mean duration in minutes; absent when there are no meetings
    pub average_duration: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MeetingListing {
    pub upcoming: Vec<MeetingModel>,
    pub past: MeetingPage,
    pub stats: MeetingStats,
}

#[derive(Debug, Clone)]
pub struct MeetingDetail {
    pub meeting: MeetingModel,
    pub participants: Vec<UserModel>,
    pub tasks: Vec<(TaskModel, Option<UserModel>)>,
}

/// A user's tasks split by status. Every owned task lands in exactly one
/// bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskBoard {
    pub pending: Vec<TaskModel>,
    pub in_progress: Vec<TaskModel>,
    pub blocked: Vec<TaskModel>,
    pub completed: Vec<TaskModel>,
}

#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub meeting: MeetingModel,
    /// Tasks of the selected manager; empty in the overview
    pub tasks: Vec<TaskModel>,
}

#[derive(Debug, Clone)]
pub struct ManagementReport {
    pub manager: Option<UserModel>,
    pub status_counts: Vec<(TaskStatus, i64)>,
    pub entries: Vec<ReportEntry>,
}

pub fn average_duration(sum: i64, count: u64) -> Option<f64> {
    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}

fn by_due_date(a: &TaskModel, b: &TaskModel) -> Ordering {
    match (a.due_date, b.due_date) {
        (Some(a_due), Some(b_due)) => a_due.cmp(&b_due),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.created_at.cmp(&b.created_at))
}

/// Splits tasks into status buckets. Open buckets sort by due date with
/// undated tasks last; completed tasks sort by most recent update.
pub fn partition_tasks(tasks: Vec<TaskModel>) -> TaskBoard {
    let mut board = TaskBoard::default();
    for task in tasks {
        match task.status {
            TaskStatus::Pending => board.pending.push(task),
            TaskStatus::InProgress => board.in_progress.push(task),
            TaskStatus::Blocked => board.blocked.push(task),
            TaskStatus::Completed => board.completed.push(task),
        }
    }

    board.pending.sort_by(by_due_date);
    board.in_progress.sort_by(by_due_date);
    board.blocked.sort_by(by_due_date);
    board
        .completed
        .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    board
}

/// Participants to store for a new meeting: the submitted ones in order, then
/// the creator unless already listed.
fn with_creator(mut participants: Vec<Uuid>, creator: Uuid) -> Vec<Uuid> {
    if !participants.contains(&creator) {
        participants.push(creator);
    }
    participants
}

#[derive(Clone)]
pub struct MeetingService {
    db: DatabaseConnection,
    past_page_size: u64,
}

impl MeetingService {
    pub fn new(db: DatabaseConnection, past_page_size: u64) -> Self {
        Self { db, past_page_size }
    }

    fn scope_for(user: &UserModel) -> MeetingScope {
        if policy::is_privileged(user) {
            MeetingScope::All
        } else {
            MeetingScope::ParticipantOf(user.id)
        }
    }

    async fn check_participants(&self, ids: &[Uuid]) -> Result<(), ServiceError> {
        let existing = UserRepository::new(&self.db).existing_ids(ids).await?;
        if let Some(missing) = ids.iter().find(|id| !existing.contains(id)) {
            return Err(FieldErrors::single(
                "participants",
                format!("Select a valid choice. {missing} is not one of the available choices."),
            )
            .into());
        }
        Ok(())
    }

    async fn load_meeting(&self, id: Uuid) -> Result<MeetingModel, ServiceError> {
        MeetingRepository::new(&self.db)
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Meeting"))
    }

    async fn load_task(&self, id: Uuid) -> Result<TaskModel, ServiceError> {
        TaskRepository::new(&self.db)
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Task"))
    }

    pub async fn list_meetings(
        &self,
        user: &UserModel,
        now: DateTime<Utc>,
        page: u64,
    ) -> Result<MeetingListing, ServiceError> {
        let scope = Self::scope_for(user);
        let repo = MeetingRepository::new(&self.db);

        let upcoming = repo.upcoming(scope, now).await?;
        let past = repo.past_page(scope, now, page, self.past_page_size).await?;
        let totals = repo.totals(scope, now).await?;

        debug!(
            user_id = %user.id,
            upcoming = upcoming.len(),
            past_page = past.page,
            "Listed meetings"
        );

        Ok(MeetingListing {
            upcoming,
            past,
            stats: MeetingStats {
                total_meetings: totals.total_meetings,
                completed_meetings: totals.completed_meetings,
                total_tasks: totals.total_tasks,
                average_duration: average_duration(totals.duration_sum, totals.total_meetings),
            },
        })
    }

    pub async fn meeting_detail(
        &self,
        user: &UserModel,
        id: Uuid,
    ) -> Result<MeetingDetail, ServiceError> {
        let meeting = self.load_meeting(id).await?;
        let repo = MeetingRepository::new(&self.db);

        if !policy::is_privileged(user) && !repo.is_participant(meeting.id, user.id).await? {
            return Err(ServiceError::Forbidden);
        }

        let participants = repo.participants(&meeting).await?;
        let tasks = TaskRepository::new(&self.db).for_meeting(meeting.id).await?;

        Ok(MeetingDetail {
            meeting,
            participants,
            tasks,
        })
    }

    /// Loads a meeting for its edit form.
    pub async fn meeting_for_edit(
        &self,
        user: &UserModel,
        id: Uuid,
    ) -> Result<MeetingDetail, ServiceError> {
        policy::ensure_privileged(user)?;
        let meeting = self.load_meeting(id).await?;
        let participants = MeetingRepository::new(&self.db)
            .participants(&meeting)
            .await?;

        Ok(MeetingDetail {
            meeting,
            participants,
            tasks: Vec::new(),
        })
    }

    pub async fn create_meeting(
        &self,
        user: &UserModel,
        form: MeetingForm,
        now: DateTime<Utc>,
    ) -> Result<MeetingModel, ServiceError> {
        policy::ensure_privileged(user)?;
        let input = form.validate()?;
        self.check_participants(&input.participants).await?;

        let txn = self.db.begin().await?;
        let repo = MeetingRepository::new(&txn);
        let meeting = repo.create(&input, now).await?;
        let participants = with_creator(input.participants.clone(), user.id);
        repo.replace_participants(meeting.id, &participants).await?;
        txn.commit().await?;

        metrics::counter!("meetings_created_total").increment(1);
        info!(
            meeting_id = %meeting.id,
            created_by = %user.id,
            participants = participants.len(),
            "Meeting created"
        );
        Ok(meeting)
    }

    pub async fn update_meeting(
        &self,
        user: &UserModel,
        id: Uuid,
        form: MeetingForm,
        now: DateTime<Utc>,
    ) -> Result<MeetingModel, ServiceError> {
        policy::ensure_privileged(user)?;
        let meeting = self.load_meeting(id).await?;
        let input = form.validate()?;
        self.check_participants(&input.participants).await?;

        let txn = self.db.begin().await?;
        let repo = MeetingRepository::new(&txn);
        let meeting = repo.update(meeting, &input, now).await?;
        repo.replace_participants(meeting.id, &input.participants)
            .await?;
        txn.commit().await?;

        info!(meeting_id = %meeting.id, updated_by = %user.id, "Meeting updated");
        Ok(meeting)
    }

    pub async fn delete_meeting(&self, user: &UserModel, id: Uuid) -> Result<(), ServiceError> {
        policy::ensure_privileged(user)?;
        self.load_meeting(id).await?;

        let txn = self.db.begin().await?;
        let tasks = MeetingRepository::new(&txn).delete_cascading(id).await?;
        txn.commit().await?;

        info!(meeting_id = %id, deleted_by = %user.id, tasks, "Meeting deleted");
        Ok(())
    }

    /// Chooses the task request shape for `user`.
    fn submission_for(user: &UserModel, form: TaskForm) -> Result<TaskSubmission, FieldErrors> {
        if policy::is_privileged(user) {
            form.into_assigned()
        } else {
            form.into_self_assigned()
        }
    }

    async fn check_owner(&self, owner: Option<Uuid>) -> Result<(), ServiceError> {
        if let Some(owner_id) = owner
            && UserRepository::new(&self.db)
                .find_by_id(owner_id)
                .await?
                .is_none()
        {
            return Err(FieldErrors::single("owner", "Select a valid choice.").into());
        }
        Ok(())
    }

    pub async fn create_task(
        &self,
        meeting_id: Uuid,
        user: &UserModel,
        form: TaskForm,
        now: DateTime<Utc>,
    ) -> Result<TaskModel, ServiceError> {
        let meeting = self.load_meeting(meeting_id).await?;
        let submission = Self::submission_for(user, form)?;

        let (fields, owner_id) = match submission {
            TaskSubmission::Assigned { fields, owner } => {
                self.check_owner(owner).await?;
                (fields, owner)
            }
            TaskSubmission::SelfAssigned { fields } => (fields, Some(user.id)),
        };

        let task = TaskRepository::new(&self.db)
            .create(meeting.id, owner_id, fields, now)
            .await?;

        info!(
            task_id = %task.id,
            meeting_id = %meeting.id,
            owner_id = ?task.owner_id,
            "Task created"
        );
        Ok(task)
    }

    /// Loads a task for its edit form.
    pub async fn task_for_edit(&self, user: &UserModel, id: Uuid) -> Result<TaskModel, ServiceError> {
        let task = self.load_task(id).await?;
        policy::ensure_can_modify_task(user, &task)?;
        Ok(task)
    }

    pub async fn update_task(
        &self,
        user: &UserModel,
        id: Uuid,
        form: TaskForm,
        now: DateTime<Utc>,
    ) -> Result<TaskModel, ServiceError> {
        let task = self.task_for_edit(user, id).await?;

        let (fields, owner) = match Self::submission_for(user, form)? {
            TaskSubmission::Assigned { fields, owner } => {
                self.check_owner(owner).await?;
                (fields, OwnerChange::Set(owner))
            }
            TaskSubmission::SelfAssigned { fields } => (fields, OwnerChange::Keep),
        };

        let task = TaskRepository::new(&self.db)
            .update(task, fields, owner, now)
            .await?;

        info!(task_id = %task.id, updated_by = %user.id, "Task updated");
        Ok(task)
    }

    /// Deletes a task and returns the meeting it belonged to.
    pub async fn delete_task(&self, user: &UserModel, id: Uuid) -> Result<Uuid, ServiceError> {
        let task = self.task_for_edit(user, id).await?;
        TaskRepository::new(&self.db).delete(task.id).await?;

        info!(task_id = %task.id, deleted_by = %user.id, "Task deleted");
        Ok(task.meeting_id)
    }

    pub async fn list_my_tasks(&self, user: &UserModel) -> Result<TaskBoard, ServiceError> {
        let tasks = TaskRepository::new(&self.db).owned_by(user.id).await?;
        Ok(partition_tasks(tasks))
    }

    pub async fn management_dashboard(
        &self,
        user: &UserModel,
    ) -> Result<Vec<ManagerTaskSummary>, ServiceError> {
        policy::ensure_privileged(user)?;
        let rows = DashboardRepository::new(&self.db)
            .task_summary_by_role(Role::Manager)
            .await?;
        Ok(rows)
    }

    pub async fn management_report(
        &self,
        user: &UserModel,
        manager_id: Option<Uuid>,
    ) -> Result<ManagementReport, ServiceError> {
        policy::ensure_privileged(user)?;

        let manager = match manager_id {
            Some(id) => Some(
                UserRepository::new(&self.db)
                    .find_with_role(id, Role::Manager)
                    .await?
                    .ok_or(ServiceError::NotFound("Manager"))?,
            ),
            None => None,
        };

        let meetings = MeetingRepository::new(&self.db)
            .with_tasks_owned_by(Role::Manager, manager_id)
            .await?;

        let tasks = TaskRepository::new(&self.db);
        let mut entries = Vec::with_capacity(meetings.len());
        for meeting in meetings {
            let meeting_tasks = match &manager {
                Some(manager) => tasks.for_meeting_and_owner(meeting.id, manager.id).await?,
                None => Vec::new(),
            };
            entries.push(ReportEntry {
                meeting,
                tasks: meeting_tasks,
            });
        }

        let status_counts = match &manager {
            Some(manager) => {
                DashboardRepository::new(&self.db)
                    .status_counts_for_owner(manager.id)
                    .await?
            }
            None => Vec::new(),
        };

        Ok(ManagementReport {
            manager,
            status_counts,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::fixtures::task_owned_by;
    use chrono::{Duration, NaiveDate};

    fn task(status: TaskStatus, due: Option<(i32, u32, u32)>) -> TaskModel {
        let mut task = task_owned_by(Some(Uuid::nil()));
        task.status = status;
        task.due_date = due.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        task
    }

    #[test]
    fn average_duration_is_absent_without_meetings() {
        assert_eq!(average_duration(0, 0), None);
        assert_eq!(average_duration(90, 2), Some(45.0));
    }

    #[test]
    fn partition_is_exhaustive_and_disjoint() {
        let tasks = vec![
            task(TaskStatus::Pending, None),
            task(TaskStatus::InProgress, Some((2025, 1, 2))),
            task(TaskStatus::Blocked, None),
            task(TaskStatus::Completed, None),
            task(TaskStatus::Pending, Some((2025, 1, 1))),
        ];

        let board = partition_tasks(tasks);
        assert_eq!(board.pending.len(), 2);
        assert_eq!(board.in_progress.len(), 1);
        assert_eq!(board.blocked.len(), 1);
        assert_eq!(board.completed.len(), 1);
        assert!(board.pending.iter().all(|t| t.status == TaskStatus::Pending));
    }

    #[test]
    fn open_tasks_sort_by_due_date_with_undated_last() {
        let board = partition_tasks(vec![
            task(TaskStatus::Pending, None),
            task(TaskStatus::Pending, Some((2025, 3, 1))),
            task(TaskStatus::Pending, Some((2025, 1, 1))),
        ]);

        let due: Vec<_> = board.pending.iter().map(|t| t.due_date).collect();
        assert_eq!(
            due,
            vec![
                NaiveDate::from_ymd_opt(2025, 1, 1),
                NaiveDate::from_ymd_opt(2025, 3, 1),
                None
            ]
        );
    }

    #[test]
    fn completed_tasks_sort_by_latest_update() {
        let mut older = task(TaskStatus::Completed, None);
        let mut newer = task(TaskStatus::Completed, None);
        older.updated_at = older.updated_at - Duration::hours(2);
        newer.updated_at = newer.updated_at + Duration::hours(2);
        let newer_id = newer.id;

        let board = partition_tasks(vec![older, newer]);
        assert_eq!(board.completed[0].id, newer_id);
    }

    #[test]
    fn creator_is_appended_once() {
        let creator = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert_eq!(with_creator(vec![other], creator), vec![other, creator]);
        assert_eq!(with_creator(vec![creator, other], creator), vec![creator, other]);
    }
}
