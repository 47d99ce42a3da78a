//! # Meetings API Library
//!
//! Meetings with participants and tasks, events with invitations and
//! participant conflict detection, and the management rollups over them.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repositories;
pub mod schedule;
pub mod seeds;
pub mod server;
pub mod services;
pub mod telemetry;
pub use migration;
