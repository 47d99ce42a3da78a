//! # Services
//!
//! Operations behind the access policy. Handlers capture the request
//! timestamp once and hand it to every call that compares against "now".

pub mod events;
pub mod meetings;
pub mod users;

pub use events::EventService;
pub use meetings::MeetingService;
pub use users::UserService;
