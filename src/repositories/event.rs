//! # Event Repository

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::forms::EventInput;
use crate::models::event::{self, Entity as Event, Model as EventModel};
use crate::models::invitation::{self, Entity as Invitation};
use crate::models::user::{Entity as User, Model as UserModel};

pub struct EventRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> EventRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<EventModel>, RepositoryError> {
        Event::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// All events with their creator, ordered by start.
    pub async fn list(&self) -> Result<Vec<(EventModel, Option<UserModel>)>, RepositoryError> {
        Event::find()
            .find_also_related(User)
            .order_by_asc(event::Column::StartDatetime)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(
        &self,
        input: &EventInput,
        created_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<EventModel, RepositoryError> {
        let event = event::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title.clone()),
            description: Set(input.description.clone()),
            start_datetime: Set(input.window.start.fixed_offset()),
            end_datetime: Set(input.window.end.map(|end| end.fixed_offset())),
            location: Set(input.location.clone()),
            created_by: Set(Some(created_by)),
            created_at: Set(now.fixed_offset()),
        };

        event
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        event: EventModel,
        input: &EventInput,
    ) -> Result<EventModel, RepositoryError> {
        let mut active = event.into_active_model();
        active.title = Set(input.title.clone());
        active.description = Set(input.description.clone());
        active.start_datetime = Set(input.window.start.fixed_offset());
        active.end_datetime = Set(input.window.end.map(|end| end.fixed_offset()));
        active.location = Set(input.location.clone());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Deletes an event and its invitations. Run inside a transaction.
    pub async fn delete_cascading(&self, id: Uuid) -> Result<(), RepositoryError> {
        Invitation::delete_many()
            .filter(invitation::Column::EventId.eq(id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let deleted = Event::delete_by_id(id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if deleted.rows_affected == 0 {
            return Err(RepositoryError::not_found("Event"));
        }

        Ok(())
    }
}
