//! # Task Repository

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::forms::TaskFields;
use crate::models::task::{self, Entity as Task, Model as TaskModel};
use crate::models::user::{Entity as User, Model as UserModel};

/// Ownership change applied by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerChange {
    Keep,
    Set(Option<Uuid>),
}

pub struct TaskRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> TaskRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TaskModel>, RepositoryError> {
        Task::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Tasks of a meeting with their owners, oldest first.
    pub async fn for_meeting(
        &self,
        meeting_id: Uuid,
    ) -> Result<Vec<(TaskModel, Option<UserModel>)>, RepositoryError> {
        Task::find()
            .filter(task::Column::MeetingId.eq(meeting_id))
            .find_also_related(User)
            .order_by_asc(task::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Tasks of a meeting owned by one user.
    pub async fn for_meeting_and_owner(
        &self,
        meeting_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Vec<TaskModel>, RepositoryError> {
        Task::find()
            .filter(task::Column::MeetingId.eq(meeting_id))
            .filter(task::Column::OwnerId.eq(owner_id))
            .order_by_asc(task::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn owned_by(&self, owner_id: Uuid) -> Result<Vec<TaskModel>, RepositoryError> {
        Task::find()
            .filter(task::Column::OwnerId.eq(owner_id))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(
        &self,
        meeting_id: Uuid,
        owner_id: Option<Uuid>,
        fields: TaskFields,
        now: DateTime<Utc>,
    ) -> Result<TaskModel, RepositoryError> {
        let stamp = now.fixed_offset();
        let task = task::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(fields.title),
            description: Set(fields.description),
            meeting_id: Set(meeting_id),
            owner_id: Set(owner_id),
            due_date: Set(fields.due_date),
            status: Set(fields.status),
            priority: Set(fields.priority),
            created_at: Set(stamp),
            updated_at: Set(stamp),
        };

        task.insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        task: TaskModel,
        fields: TaskFields,
        owner: OwnerChange,
        now: DateTime<Utc>,
    ) -> Result<TaskModel, RepositoryError> {
        let mut active = task.into_active_model();
        active.title = Set(fields.title);
        active.description = Set(fields.description);
        active.due_date = Set(fields.due_date);
        active.status = Set(fields.status);
        active.priority = Set(fields.priority);
        if let OwnerChange::Set(owner_id) = owner {
            active.owner_id = Set(owner_id);
        }
        active.updated_at = Set(now.fixed_offset());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let deleted = Task::delete_by_id(id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if deleted.rows_affected == 0 {
            return Err(RepositoryError::not_found("Task"));
        }

        Ok(())
    }
}
