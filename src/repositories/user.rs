//! # User Repository
//!
//! Lookups and profile writes for users, plus the cascading delete that keeps
//! tasks and events alive when their owner or creator leaves.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::error::{RepositoryError, is_unique_violation};
use crate::forms::{NewUserInput, ProfileInput};
use crate::models::user::{self, Entity as User, Model as UserModel, Role};
use crate::models::{Event, Invitation, MeetingParticipant, Task};
use crate::models::{event, invitation, meeting_participant, task};

/// Rows touched by a user deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserDeletion {
    pub orphaned_tasks: u64,
    pub orphaned_events: u64,
    pub removed_invitations: u64,
    pub removed_participations: u64,
}

pub struct UserRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserModel>, RepositoryError> {
        User::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Returns the user only when the account is active.
    pub async fn find_active(&self, id: Uuid) -> Result<Option<UserModel>, RepositoryError> {
        User::find_by_id(id)
            .filter(user::Column::IsActive.eq(true))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserModel>, RepositoryError> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// All users ordered by username.
    pub async fn list(&self) -> Result<Vec<UserModel>, RepositoryError> {
        User::find()
            .order_by_asc(user::Column::Username)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Looks up a user holding `role`.
    pub async fn find_with_role(
        &self,
        id: Uuid,
        role: Role,
    ) -> Result<Option<UserModel>, RepositoryError> {
        User::find_by_id(id)
            .filter(user::Column::Role.eq(role))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Returns which of `ids` exist.
    pub async fn existing_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        User::find()
            .select_only()
            .column(user::Column::Id)
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .into_tuple::<Uuid>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(
        &self,
        input: NewUserInput,
        now: DateTime<Utc>,
    ) -> Result<UserModel, RepositoryError> {
        let stamp = now.fixed_offset();
        let profile = input.profile;

        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(input.username),
            email: Set(profile.email),
            first_name: Set(profile.first_name),
            last_name: Set(profile.last_name),
            phone_number: Set(profile.phone_number),
            department: Set(profile.department),
            role: Set(input.role),
            is_superuser: Set(input.is_superuser),
            is_active: Set(true),
            created_at: Set(stamp),
            updated_at: Set(stamp),
        };

        user.insert(self.db).await.map_err(|error| {
            if is_unique_violation(&error) {
                RepositoryError::validation_error("A user with that username already exists.")
            } else {
                RepositoryError::database_error(error)
            }
        })
    }

    pub async fn update_profile(
        &self,
        user: UserModel,
        profile: ProfileInput,
        now: DateTime<Utc>,
    ) -> Result<UserModel, RepositoryError> {
        let mut active = user.into_active_model();
        active.first_name = Set(profile.first_name);
        active.last_name = Set(profile.last_name);
        active.email = Set(profile.email);
        active.phone_number = Set(profile.phone_number);
        active.department = Set(profile.department);
        active.updated_at = Set(now.fixed_offset());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Removes a user. Owned tasks and created events survive with their
    /// reference cleared; invitations and meeting participations go with the
    /// user. Run inside a transaction.
    pub async fn delete_cascading(&self, id: Uuid) -> Result<UserDeletion, RepositoryError> {
        let orphaned_tasks = Task::update_many()
            .col_expr(task::Column::OwnerId, Expr::value(Option::<Uuid>::None))
            .filter(task::Column::OwnerId.eq(id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .rows_affected;

        let orphaned_events = Event::update_many()
            .col_expr(event::Column::CreatedBy, Expr::value(Option::<Uuid>::None))
            .filter(event::Column::CreatedBy.eq(id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .rows_affected;

        let removed_invitations = Invitation::delete_many()
            .filter(invitation::Column::InviteeId.eq(id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .rows_affected;

        let removed_participations = MeetingParticipant::delete_many()
            .filter(meeting_participant::Column::UserId.eq(id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .rows_affected;

        let deleted = User::delete_by_id(id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if deleted.rows_affected == 0 {
            return Err(RepositoryError::not_found("User"));
        }

        Ok(UserDeletion {
            orphaned_tasks,
            orphaned_events,
            removed_invitations,
            removed_participations,
        })
    }
}
