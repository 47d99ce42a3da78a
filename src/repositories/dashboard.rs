//! # Dashboard Queries
//!
//! Read-only rollups over users and tasks.

use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, JoinType, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::task::{self, Entity as Task, TaskStatus};
use crate::models::user::{self, Entity as User, Role};

/// Task counters for one user.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct ManagerTaskSummary {
    pub user_id: Uuid,
    pub username: String,
    pub total_tasks: i64,
    pub completed_tasks: i64,
}

impl ManagerTaskSummary {
    pub fn incomplete_tasks(&self) -> i64 {
        self.total_tasks - self.completed_tasks
    }
}

pub struct DashboardRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> DashboardRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// One row per user with `role`, in a single grouped query. Users without
    /// tasks are included with zero counts. Ordered by username.
    pub async fn task_summary_by_role(
        &self,
        role: Role,
    ) -> Result<Vec<ManagerTaskSummary>, RepositoryError> {
        let completed_flag =
            Expr::case(task::Column::Status.eq(TaskStatus::Completed), 1).finally(0);
        let completed = Func::coalesce([
            SimpleExpr::from(Func::sum(Into::<SimpleExpr>::into(completed_flag))),
            Expr::val(0).into(),
        ]);

        User::find()
            .select_only()
            .column_as(user::Column::Id, "user_id")
            .column_as(user::Column::Username, "username")
            .column_as(Expr::col((Task, task::Column::Id)).count(), "total_tasks")
            .column_as(SimpleExpr::from(completed), "completed_tasks")
            .join(JoinType::LeftJoin, task::Relation::Owner.def().rev())
            .filter(user::Column::Role.eq(role))
            .group_by(user::Column::Id)
            .group_by(user::Column::Username)
            .order_by_asc(user::Column::Username)
            .into_model::<ManagerTaskSummary>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Counts tasks per status for one owner, used by the report view.
    pub async fn status_counts_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<(TaskStatus, i64)>, RepositoryError> {
        Task::find()
            .select_only()
            .column(task::Column::Status)
            .column_as(Expr::col((Task, task::Column::Id)).count(), "n")
            .filter(task::Column::OwnerId.eq(owner_id))
            .group_by(task::Column::Status)
            .into_tuple::<(TaskStatus, i64)>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}
