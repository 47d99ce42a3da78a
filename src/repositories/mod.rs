//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations. Every
//! repository is generic over [`sea_orm::ConnectionTrait`] so the same code
//! runs against the pool or inside a transaction.

pub mod dashboard;
pub mod event;
pub mod invitation;
pub mod meeting;
pub mod task;
pub mod user;

pub use dashboard::DashboardRepository;
pub use event::EventRepository;
pub use invitation::InvitationRepository;
pub use meeting::MeetingRepository;
pub use task::TaskRepository;
pub use user::UserRepository;
