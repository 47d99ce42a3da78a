//! # Event Service
//!
//! Event scheduling with invitation bookkeeping and the participant conflict
//! check.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::forms::{EventForm, EventInput, FieldErrors};
use crate::models::event::Model as EventModel;
use crate::models::invitation::{InvitationStatus, Model as InvitationModel};
use crate::models::user::Model as UserModel;
use crate::policy;
use crate::repositories::{EventRepository, InvitationRepository, UserRepository};

/// Invitee answer to an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InvitationResponse {
    Accept,
    Decline,
}

impl InvitationResponse {
    pub fn status(self) -> InvitationStatus {
        match self {
            InvitationResponse::Accept => InvitationStatus::Accepted,
            InvitationResponse::Decline => InvitationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventDetail {
    pub event: EventModel,
    pub invitations: Vec<(InvitationModel, Option<UserModel>)>,
}

#[derive(Debug, Clone)]
pub struct MyEvents {
    pub invitations: Vec<(InvitationModel, EventModel)>,
    pub pending: usize,
    pub accepted: usize,
}

/// Changes needed to move an invitation set from `current` to `desired`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvitationDiff {
    pub to_invite: Vec<Uuid>,
    pub to_revoke: Vec<Uuid>,
}

pub fn diff_invitations(current: &[Uuid], desired: &[Uuid]) -> InvitationDiff {
    let current_set: BTreeSet<_> = current.iter().copied().collect();
    let desired_set: BTreeSet<_> = desired.iter().copied().collect();

    InvitationDiff {
        to_invite: desired
            .iter()
            .copied()
            .filter(|id| !current_set.contains(id))
            .collect(),
        to_revoke: current
            .iter()
            .copied()
            .filter(|id| !desired_set.contains(id))
            .collect(),
    }
}

fn with_creator(mut invitees: Vec<Uuid>, creator: Option<Uuid>) -> Vec<Uuid> {
    if let Some(creator) = creator
        && !invitees.contains(&creator)
    {
        invitees.push(creator);
    }
    invitees
}

#[derive(Clone)]
pub struct EventService {
    db: DatabaseConnection,
}

impl EventService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn load_event(&self, id: Uuid) -> Result<EventModel, ServiceError> {
        EventRepository::new(&self.db)
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Event"))
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

    /// Refuses the submission when participants are busy, unless forced.
    async fn check_conflicts(
        &self,
        user: &UserModel,
        input: &EventInput,
        exclude_event: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let conflicts = InvitationRepository::new(&self.db)
            .find_conflicts(&input.participants, input.window, exclude_event)
            .await?;

        if conflicts.is_empty() {
            return Ok(());
        }

        metrics::counter!("event_conflicts_detected_total").increment(conflicts.len() as u64);

        if !input.force {
            debug!(
                user_id = %user.id,
                conflicts = conflicts.len(),
                "Event submission refused because of conflicts"
            );
            return Err(ServiceError::Conflict(conflicts));
        }

        metrics::counter!("event_conflict_overrides_total").increment(1);
        for conflict in &conflicts {
            warn!(
                user_id = %user.id,
                participant_id = %conflict.participant_id,
                conflicting_event_id = %conflict.event_id,
                "Scheduling conflict overridden"
            );
        }
        Ok(())
    }

    pub async fn list_events(
        &self,
        _user: &UserModel,
    ) -> Result<Vec<(EventModel, Option<UserModel>)>, ServiceError> {
        Ok(EventRepository::new(&self.db).list().await?)
    }

    pub async fn event_detail(&self, _user: &UserModel, id: Uuid) -> Result<EventDetail, ServiceError> {
        let event = self.load_event(id).await?;
        let invitations = InvitationRepository::new(&self.db)
            .for_event(event.id)
            .await?;
        Ok(EventDetail { event, invitations })
    }

    /// Loads an event for its edit form.
    pub async fn event_for_edit(&self, user: &UserModel, id: Uuid) -> Result<EventDetail, ServiceError> {
        policy::ensure_privileged(user)?;
        self.event_detail(user, id).await
    }

    pub async fn create_event(
        &self,
        user: &UserModel,
        form: EventForm,
        now: DateTime<Utc>,
    ) -> Result<EventModel, ServiceError> {
        policy::ensure_privileged(user)?;
        let input = form.validate(now)?;
        self.check_participants(&input.participants).await?;
        self.check_conflicts(user, &input, None).await?;

        let invitees = with_creator(input.participants.clone(), Some(user.id));

        let txn = self.db.begin().await?;
        let event = EventRepository::new(&txn).create(&input, user.id, now).await?;
        InvitationRepository::new(&txn)
            .invite(event.id, &invitees)
            .await?;
        txn.commit().await?;

        metrics::counter!("events_created_total").increment(1);
        info!(
            event_id = %event.id,
            created_by = %user.id,
            invitees = invitees.len(),
            "Event created"
        );
        Ok(event)
    }

    pub async fn update_event(
        &self,
        user: &UserModel,
        id: Uuid,
        form: EventForm,
        now: DateTime<Utc>,
    ) -> Result<EventModel, ServiceError> {
        policy::ensure_privileged(user)?;
        let event = self.load_event(id).await?;
        let input = form.validate(now)?;
        self.check_participants(&input.participants).await?;
        self.check_conflicts(user, &input, Some(event.id)).await?;

        let desired = with_creator(input.participants.clone(), event.created_by);

        let txn = self.db.begin().await?;
        let invitations = InvitationRepository::new(&txn);
        let current = invitations.invitee_ids(event.id).await?;
        let diff = diff_invitations(&current, &desired);
        invitations.revoke(event.id, &diff.to_revoke).await?;
        invitations.invite(event.id, &diff.to_invite).await?;
        let event = EventRepository::new(&txn).update(event, &input).await?;
        txn.commit().await?;

        info!(
            event_id = %event.id,
            updated_by = %user.id,
            invited = diff.to_invite.len(),
            revoked = diff.to_revoke.len(),
            "Event updated"
        );
        Ok(event)
    }

    pub async fn delete_event(&self, user: &UserModel, id: Uuid) -> Result<(), ServiceError> {
        policy::ensure_privileged(user)?;
        self.load_event(id).await?;

        let txn = self.db.begin().await?;
        EventRepository::new(&txn).delete_cascading(id).await?;
        txn.commit().await?;

        info!(event_id = %id, deleted_by = %user.id, "Event deleted");
        Ok(())
    }

    pub async fn list_my_events(&self, user: &UserModel) -> Result<MyEvents, ServiceError> {
        let invitations = InvitationRepository::new(&self.db)
            .for_invitee(user.id)
            .await?;

        let count = |status: InvitationStatus| {
            invitations
                .iter()
                .filter(|(invitation, _)| invitation.status == status)
                .count()
        };
        let pending = count(InvitationStatus::Pending);
        let accepted = count(InvitationStatus::Accepted);

        Ok(MyEvents {
            invitations,
            pending,
            accepted,
        })
    }

    /// Records the invitee's answer. Invitations addressed to someone else are
    /// reported as missing.
    pub async fn respond_to_invitation(
        &self,
        user: &UserModel,
        invitation_id: Uuid,
        response: InvitationResponse,
        now: DateTime<Utc>,
    ) -> Result<InvitationModel, ServiceError> {
        let repo = InvitationRepository::new(&self.db);
        let invitation = repo
            .find_for_invitee(invitation_id, user.id)
            .await?
            .ok_or(ServiceError::NotFound("Invitation"))?;

        let invitation = repo.set_status(invitation, response.status(), now).await?;

        info!(
            invitation_id = %invitation.id,
            invitee_id = %user.id,
            status = ?invitation.status,
            "Invitation answered"
        );
        Ok(invitation)
    }

    /// Events the user accepted, for calendar feeds.
    pub async fn export_my_events_as_feed(
        &self,
        user: &UserModel,
    ) -> Result<Vec<EventModel>, ServiceError> {
        Ok(InvitationRepository::new(&self.db)
            .accepted_events(user.id)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_keeps_retained_invitees_untouched() {
        let kept = Uuid::new_v4();
        let dropped = Uuid::new_v4();
        let added = Uuid::new_v4();

        let diff = diff_invitations(&[kept, dropped], &[kept, added]);
        assert_eq!(diff.to_invite, vec![added]);
        assert_eq!(diff.to_revoke, vec![dropped]);
    }

    #[test]
    fn creator_stays_invited() {
        let creator = Uuid::new_v4();
        let guest = Uuid::new_v4();

        let desired = with_creator(vec![guest], Some(creator));
        let diff = diff_invitations(&[guest, creator], &desired);
        assert!(diff.to_revoke.is_empty());
        assert!(diff.to_invite.is_empty());
    }

    #[test]
    fn responses_map_to_terminal_statuses() {
        assert_eq!(InvitationResponse::Accept.status(), InvitationStatus::Accepted);
        assert_eq!(InvitationResponse::Decline.status(), InvitationStatus::Rejected);
    }
}
