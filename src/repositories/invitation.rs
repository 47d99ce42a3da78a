//! # Invitation Repository
//!
//! Invitation rows, the invitee-facing event queries and the overlap search
//! used to detect scheduling conflicts.

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    IntoActiveModel, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::event::{self, Entity as Event, Model as EventModel};
use crate::models::invitation::{
    self, Entity as Invitation, InvitationStatus, Model as InvitationModel,
};
use crate::models::user::{self, Entity as User, Model as UserModel};
use crate::schedule::Interval;

/// A participant who is already invited to an overlapping event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ParticipantConflict {
    pub participant_id: Uuid,
    pub participant: String,
    pub event_id: Uuid,
    pub event_title: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, FromQueryResult)]
struct ConflictRow {
    participant_id: Uuid,
    participant: String,
    event_id: Uuid,
    event_title: String,
    start: DateTimeWithTimeZone,
    end: Option<DateTimeWithTimeZone>,
}

impl From<ConflictRow> for ParticipantConflict {
    fn from(row: ConflictRow) -> Self {
        Self {
            participant_id: row.participant_id,
            participant: row.participant,
            event_id: row.event_id,
            event_title: row.event_title,
            start: row.start.with_timezone(&Utc),
            end: row.end.map(|end| end.with_timezone(&Utc)),
        }
    }
}

pub struct InvitationRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> InvitationRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Invitations of an event with their invitees, ordered by username.
    pub async fn for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<(InvitationModel, Option<UserModel>)>, RepositoryError> {
        Invitation::find()
            .filter(invitation::Column::EventId.eq(event_id))
            .find_also_related(User)
            .order_by_asc(user::Column::Username)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn invitee_ids(&self, event_id: Uuid) -> Result<Vec<Uuid>, RepositoryError> {
        Invitation::find()
            .select_only()
            .column(invitation::Column::InviteeId)
            .filter(invitation::Column::EventId.eq(event_id))
            .into_tuple::<Uuid>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Adds PENDING invitations for `invitee_ids`.
    pub async fn invite(&self, event_id: Uuid, invitee_ids: &[Uuid]) -> Result<(), RepositoryError> {
        if invitee_ids.is_empty() {
            return Ok(());
        }

        let rows = invitee_ids.iter().map(|invitee_id| invitation::ActiveModel {
            id: Set(Uuid::new_v4()),
            event_id: Set(event_id),
            invitee_id: Set(*invitee_id),
            status: Set(InvitationStatus::Pending),
            responded_at: Set(None),
        });

        Invitation::insert_many(rows)
            .exec_without_returning(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }

    pub async fn revoke(&self, event_id: Uuid, invitee_ids: &[Uuid]) -> Result<u64, RepositoryError> {
        if invitee_ids.is_empty() {
            return Ok(0);
        }

        let result = Invitation::delete_many()
            .filter(invitation::Column::EventId.eq(event_id))
            .filter(invitation::Column::InviteeId.is_in(invitee_ids.iter().copied()))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }

    /// Finds an invitation only if it is addressed to `invitee_id`.
    pub async fn find_for_invitee(
        &self,
        invitation_id: Uuid,
        invitee_id: Uuid,
    ) -> Result<Option<InvitationModel>, RepositoryError> {
        Invitation::find_by_id(invitation_id)
            .filter(invitation::Column::InviteeId.eq(invitee_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn set_status(
        &self,
        invitation: InvitationModel,
        status: InvitationStatus,
        now: DateTime<Utc>,
    ) -> Result<InvitationModel, RepositoryError> {
        let mut active = invitation.into_active_model();
        active.status = Set(status);
        active.responded_at = Set(Some(now.fixed_offset()));

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Invitations addressed to a user with their events, soonest event first.
    pub async fn for_invitee(
        &self,
        invitee_id: Uuid,
    ) -> Result<Vec<(InvitationModel, EventModel)>, RepositoryError> {
        let rows = Invitation::find()
            .filter(invitation::Column::InviteeId.eq(invitee_id))
            .find_also_related(Event)
            .order_by_asc(event::Column::StartDatetime)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|(invitation, event)| event.map(|event| (invitation, event)))
            .collect())
    }

    /// Events the user has accepted, ordered by start.
    pub async fn accepted_events(&self, invitee_id: Uuid) -> Result<Vec<EventModel>, RepositoryError> {
        Event::find()
            .join(JoinType::InnerJoin, event::Relation::Invitations.def())
            .filter(invitation::Column::InviteeId.eq(invitee_id))
            .filter(invitation::Column::Status.eq(InvitationStatus::Accepted))
            .order_by_asc(event::Column::StartDatetime)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Lists invitations of `participant_ids` to events overlapping `window`.
    ///
    /// Uses the half-open rule of [`Interval::overlaps`]: an existing event
    /// conflicts iff `existing.start < window.end` and
    /// `existing.effective_end > window.start`, with a missing end standing in
    /// for the start. `exclude_event` leaves one event out of the search.
    pub async fn find_conflicts(
        &self,
        participant_ids: &[Uuid],
        window: Interval,
        exclude_event: Option<Uuid>,
    ) -> Result<Vec<ParticipantConflict>, RepositoryError> {
        if participant_ids.is_empty() {
            return Ok(Vec::new());
        }

        let proposed_start = window.start.fixed_offset();
        let proposed_end = window.effective_end().fixed_offset();

        let existing_ends_after_start = Condition::any()
            .add(
                Condition::all()
                    .add(event::Column::EndDatetime.is_not_null())
                    .add(event::Column::EndDatetime.gt(proposed_start)),
            )
            .add(
                Condition::all()
                    .add(event::Column::EndDatetime.is_null())
                    .add(event::Column::StartDatetime.gt(proposed_start)),
            );

        let condition = Condition::all()
            .add(invitation::Column::InviteeId.is_in(participant_ids.iter().copied()))
            .add(event::Column::StartDatetime.lt(proposed_end))
            .add(existing_ends_after_start)
            .add_option(exclude_event.map(|id| event::Column::Id.ne(id)));

        let rows = Invitation::find()
            .select_only()
            .column_as(invitation::Column::InviteeId, "participant_id")
            .column_as(user::Column::Username, "participant")
            .column_as(event::Column::Id, "event_id")
            .column_as(event::Column::Title, "event_title")
            .column_as(event::Column::StartDatetime, "start")
            .column_as(event::Column::EndDatetime, "end")
            .join(JoinType::InnerJoin, invitation::Relation::Event.def())
            .join(JoinType::InnerJoin, invitation::Relation::Invitee.def())
            .filter(condition)
            .order_by_asc(user::Column::Username)
            .order_by_asc(event::Column::StartDatetime)
            .into_model::<ConflictRow>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(rows.into_iter().map(ParticipantConflict::from).collect())
    }
}
