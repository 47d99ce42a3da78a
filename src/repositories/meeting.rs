//! # Meeting Repository
//!
//! Meetings and their participant rows. Listing queries are parameterised by a
//! [`MeetingScope`] so the caller decides visibility once and every query in a
//! request observes the same set.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::forms::MeetingInput;
use crate::models::meeting::{self, Entity as Meeting, Model as MeetingModel};
use crate::models::meeting_participant::{self, Entity as MeetingParticipant};
use crate::models::task::{self, Entity as Task};
use crate::models::user::{self, Entity as User, Model as UserModel, Role};

/// Which meetings a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingScope {
    All,
    /// Meetings the given user participates in.
    ParticipantOf(Uuid),
}

impl MeetingScope {
    fn participation_subquery(user_id: Uuid) -> SelectStatement {
        Query::select()
            .column(meeting_participant::Column::MeetingId)
            .from(MeetingParticipant)
            .and_where(meeting_participant::Column::UserId.eq(user_id))
            .to_owned()
    }

    fn apply(self, select: Select<Meeting>) -> Select<Meeting> {
        match self {
            MeetingScope::All => select,
            MeetingScope::ParticipantOf(user_id) => select.filter(
                meeting::Column::Id.in_subquery(Self::participation_subquery(user_id)),
            ),
        }
    }
}

/// One page of past meetings.
#[derive(Debug, Clone)]
pub struct MeetingPage {
    pub items: Vec<MeetingModel>,
    /// 1-based page number actually returned
    pub page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

/// Raw counters over a scoped meeting set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeetingTotals {
    pub total_meetings: u64,
    pub completed_meetings: u64,
    pub total_tasks: u64,
    pub duration_sum: i64,
}

pub struct MeetingRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> MeetingRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<MeetingModel>, RepositoryError> {
        Meeting::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Meetings starting at or after `now`, soonest first.
    pub async fn upcoming(
        &self,
        scope: MeetingScope,
        now: DateTime<Utc>,
    ) -> Result<Vec<MeetingModel>, RepositoryError> {
        scope
            .apply(Meeting::find())
            .filter(meeting::Column::MeetingTime.gte(now.fixed_offset()))
            .order_by_asc(meeting::Column::MeetingTime)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Meetings that started before `now`, most recent first. `page` is
    /// 1-based and clamped into the valid range.
    pub async fn past_page(
        &self,
        scope: MeetingScope,
        now: DateTime<Utc>,
        page: u64,
        page_size: u64,
    ) -> Result<MeetingPage, RepositoryError> {
        let paginator = scope
            .apply(Meeting::find())
            .filter(meeting::Column::MeetingTime.lt(now.fixed_offset()))
            .order_by_desc(meeting::Column::MeetingTime)
            .paginate(self.db, page_size.max(1));

        let totals = paginator
            .num_items_and_pages()
            .await
            .map_err(RepositoryError::database_error)?;

        let page = page.clamp(1, totals.number_of_pages.max(1));
        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(MeetingPage {
            items,
            page,
            total_items: totals.number_of_items,
            total_pages: totals.number_of_pages,
        })
    }

    /// Counters over the scoped set. A meeting counts as completed once its
    /// start lies before `now`.
    pub async fn totals(
        &self,
        scope: MeetingScope,
        now: DateTime<Utc>,
    ) -> Result<MeetingTotals, RepositoryError> {
        let (count, sum): (i64, Option<i64>) = scope
            .apply(Meeting::find())
            .select_only()
            .column_as(
                Expr::col((Meeting, meeting::Column::Id)).count(),
                "meeting_count",
            )
            .column_as(
                Expr::col((Meeting, meeting::Column::Duration)).sum(),
                "duration_sum",
            )
            .into_tuple()
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .unwrap_or((0, None));

        let completed = scope
            .apply(Meeting::find())
            .filter(meeting::Column::MeetingTime.lt(now.fixed_offset()))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let tasks = match scope {
            MeetingScope::All => Task::find(),
            MeetingScope::ParticipantOf(user_id) => Task::find().filter(
                task::Column::MeetingId.in_subquery(MeetingScope::participation_subquery(user_id)),
            ),
        }
        .count(self.db)
        .await
        .map_err(RepositoryError::database_error)?;

        Ok(MeetingTotals {
            total_meetings: u64::try_from(count).unwrap_or_default(),
            completed_meetings: completed,
            total_tasks: tasks,
            duration_sum: sum.unwrap_or_default(),
        })
    }

    pub async fn create(
        &self,
        input: &MeetingInput,
        now: DateTime<Utc>,
    ) -> Result<MeetingModel, RepositoryError> {
        let stamp = now.fixed_offset();
        let meeting = meeting::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title.clone()),
            meeting_time: Set(input.meeting_time.fixed_offset()),
            duration: Set(input.duration),
            meeting_type: Set(input.meeting_type),
            status: Set(input.status),
            created_at: Set(stamp),
            updated_at: Set(stamp),
        };

        meeting
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        meeting: MeetingModel,
        input: &MeetingInput,
        now: DateTime<Utc>,
    ) -> Result<MeetingModel, RepositoryError> {
        let mut active = meeting.into_active_model();
        active.title = Set(input.title.clone());
        active.meeting_time = Set(input.meeting_time.fixed_offset());
        active.duration = Set(input.duration);
        active.meeting_type = Set(input.meeting_type);
        active.status = Set(input.status);
        active.updated_at = Set(now.fixed_offset());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Replaces the participant rows of a meeting with `user_ids`, in order.
    pub async fn replace_participants(
        &self,
        meeting_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), RepositoryError> {
        MeetingParticipant::delete_many()
            .filter(meeting_participant::Column::MeetingId.eq(meeting_id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if user_ids.is_empty() {
            return Ok(());
        }

        let rows = user_ids
            .iter()
            .map(|user_id| meeting_participant::ActiveModel {
                meeting_id: Set(meeting_id),
                user_id: Set(*user_id),
            });

        MeetingParticipant::insert_many(rows)
            .exec_without_returning(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }

    /// Participants of a meeting ordered by username.
    pub async fn participants(
        &self,
        meeting: &MeetingModel,
    ) -> Result<Vec<UserModel>, RepositoryError> {
        meeting
            .find_related(User)
            .order_by_asc(user::Column::Username)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn is_participant(
        &self,
        meeting_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        let found = MeetingParticipant::find_by_id((meeting_id, user_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(found.is_some())
    }

    /// Meetings holding at least one task owned by a user with `role`, or by
    /// `owner_id` when given. Ordered by meeting time, most recent first.
    pub async fn with_tasks_owned_by(
        &self,
        role: Role,
        owner_id: Option<Uuid>,
    ) -> Result<Vec<MeetingModel>, RepositoryError> {
        let mut owners = Query::select()
            .column(user::Column::Id)
            .from(User)
            .and_where(user::Column::Role.eq(role))
            .to_owned();
        if let Some(owner_id) = owner_id {
            owners.and_where(user::Column::Id.eq(owner_id));
        }

        let meeting_ids = Query::select()
            .column(task::Column::MeetingId)
            .from(Task)
            .and_where(task::Column::OwnerId.in_subquery(owners))
            .to_owned();

        Meeting::find()
            .filter(meeting::Column::Id.in_subquery(meeting_ids))
            .order_by_desc(meeting::Column::MeetingTime)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Deletes a meeting with its tasks and participant rows. Returns the
    /// number of tasks removed. Run inside a transaction.
    pub async fn delete_cascading(&self, id: Uuid) -> Result<u64, RepositoryError> {
        let tasks = Task::delete_many()
            .filter(task::Column::MeetingId.eq(id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .rows_affected;

        MeetingParticipant::delete_many()
            .filter(meeting_participant::Column::MeetingId.eq(id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let deleted = Meeting::delete_by_id(id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if deleted.rows_affected == 0 {
            return Err(RepositoryError::not_found("Meeting"));
        }

        Ok(tasks)
    }
}
