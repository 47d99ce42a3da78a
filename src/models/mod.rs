//! # Data Models
//!
//! This module contains all the data models used throughout the Meetings service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod event;
pub mod invitation;
pub mod meeting;
pub mod meeting_participant;
pub mod task;
pub mod user;

pub use event::Entity as Event;
pub use invitation::Entity as Invitation;
pub use meeting::Entity as Meeting;
pub use meeting_participant::Entity as MeetingParticipant;
pub use task::Entity as Task;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "meetings".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
