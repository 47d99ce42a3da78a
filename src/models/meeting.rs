//! Meeting entity model
//!
//! A meeting is the root of the meeting/task aggregate: it owns its tasks and
//! lists its participants through `meeting_participants`.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of meeting
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeetingType {
    #[sea_orm(string_value = "TEAM")]
    #[default]
    Team,
    #[sea_orm(string_value = "PROJECT")]
    Project,
    #[sea_orm(string_value = "BRAINSTORM")]
    Brainstorm,
    #[sea_orm(string_value = "REVIEW")]
    Review,
}

/// Optional bookkeeping status of a meeting
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeetingStatus {
    #[sea_orm(string_value = "SCHEDULED")]
    Scheduled,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "meetings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub title: String,

    /// Start of the meeting; the anchor for upcoming/past classification
    pub meeting_time: DateTimeWithTimeZone,

    /// Length in minutes
    pub duration: i32,

    pub meeting_type: MeetingType,

    pub status: Option<MeetingStatus>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::task::Entity")]
    Tasks,
    #[sea_orm(has_many = "super::meeting_participant::Entity")]
    Participants,
}

impl Related<super::task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tasks.def()
    }
}

impl Related<super::meeting_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        super::meeting_participant::Relation::User.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::meeting_participant::Relation::Meeting.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
