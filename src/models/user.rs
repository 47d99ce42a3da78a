//! User entity model
//!
//! This module contains the SeaORM entity model for the users table together
//! with the closed [`Role`] enumeration that drives the access policy.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Organisational role of a user.
///
/// `Management` is the privileged tier; `Manager` users are the subjects of the
/// management dashboard.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[sea_orm(string_value = "MANAGEMENT")]
    Management,
    #[sea_orm(string_value = "MANAGER")]
    #[default]
    Manager,
}

/// User entity representing an authenticated person in the system
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Login name, unique across the system
    #[sea_orm(unique)]
    pub username: String,

    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub department: Option<String>,

    /// Organisational role
    pub role: Role,

    /// Superusers are privileged regardless of role
    pub is_superuser: bool,

    /// Inactive users are treated as unauthenticated
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl Related<super::task::Entity> for Entity {
    fn to() -> RelationDef {
        super::task::Relation::Owner.def().rev()
    }
}

impl Related<super::meeting::Entity> for Entity {
    fn to() -> RelationDef {
        super::meeting_participant::Relation::Meeting.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::meeting_participant::Relation::User.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Display name used in listings, falling back to the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}
