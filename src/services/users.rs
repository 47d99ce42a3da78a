//! # User Service
//!
//! Profile maintenance for the acting user and user administration for
//! privileged users.

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::info;
use uuid::Uuid;

use crate::error::{RepositoryError, ServiceError};
use crate::forms::{FieldErrors, NewUserForm, ProfileForm};
use crate::models::user::Model as UserModel;
use crate::policy;
use crate::repositories::UserRepository;
use crate::repositories::user::UserDeletion;

#[derive(Clone)]
pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn update_profile(
        &self,
        user: &UserModel,
        form: ProfileForm,
        now: DateTime<Utc>,
    ) -> Result<UserModel, ServiceError> {
        let profile = form.validate()?;
        let updated = UserRepository::new(&self.db)
            .update_profile(user.clone(), profile, now)
            .await?;

        info!(user_id = %updated.id, "Profile updated");
        Ok(updated)
    }

    pub async fn list_users(&self, user: &UserModel) -> Result<Vec<UserModel>, ServiceError> {
        policy::ensure_privileged(user)?;
        Ok(UserRepository::new(&self.db).list().await?)
    }

    pub async fn create_user(
        &self,
        user: &UserModel,
        form: NewUserForm,
        now: DateTime<Utc>,
    ) -> Result<UserModel, ServiceError> {
        policy::ensure_privileged(user)?;
        let input = form.validate()?;

        let repo = UserRepository::new(&self.db);
        if repo.find_by_username(&input.username).await?.is_some() {
            return Err(
                FieldErrors::single("username", "A user with that username already exists.")
                    .into(),
            );
        }

        let created = repo.create(input, now).await.map_err(|error| match error {
            RepositoryError::Validation(message) => {
                ServiceError::Validation(FieldErrors::single("username", message))
            }
            other => other.into(),
        })?;

        info!(
            user_id = %created.id,
            created_by = %user.id,
            role = ?created.role,
            "User created"
        );
        Ok(created)
    }

    pub async fn delete_user(
        &self,
        user: &UserModel,
        id: Uuid,
    ) -> Result<UserDeletion, ServiceError> {
        policy::ensure_privileged(user)?;
        if user.id == id {
            return Err(ServiceError::Forbidden);
        }

        let txn = self.db.begin().await?;
        let deletion = UserRepository::new(&txn)
            .delete_cascading(id)
            .await
            .map_err(|error| match error {
                RepositoryError::NotFound(_) => ServiceError::NotFound("User"),
                other => other.into(),
            })?;
        txn.commit().await?;

        info!(
            user_id = %id,
            deleted_by = %user.id,
            orphaned_tasks = deletion.orphaned_tasks,
            orphaned_events = deletion.orphaned_events,
            "User deleted"
        );
        Ok(deletion)
    }
}
