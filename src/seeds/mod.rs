//! Database seeding functionality
//!
//! Creates the bootstrap superuser so a fresh deployment has someone able to
//! register the remaining users.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::forms::{NewUserInput, ProfileInput};
use crate::models::user::Role;
use crate::repositories::UserRepository;

/// Creates the configured bootstrap admin as a MANAGEMENT superuser unless a
/// user with that username already exists.
///
/// Returns `true` when a user was created. Does nothing when no bootstrap
/// username is configured.
pub async fn seed_bootstrap_admin(
    db: &DatabaseConnection,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<bool> {
    let Some(username) = config.bootstrap_admin_username.as_deref() else {
        log::debug!("No bootstrap admin configured, skipping seed");
        return Ok(false);
    };

    let repo = UserRepository::new(db);
    if repo
        .find_by_username(username)
        .await
        .context("looking up bootstrap admin")?
        .is_some()
    {
        log::info!("Bootstrap admin '{username}' already exists, skipping");
        return Ok(false);
    }

    let input = NewUserInput {
        username: username.to_string(),
        role: Role::Management,
        is_superuser: true,
        profile: ProfileInput {
            first_name: String::new(),
            last_name: String::new(),
            email: config.bootstrap_admin_email.clone().unwrap_or_default(),
            phone_number: None,
            department: None,
        },
    };

    let user = repo
        .create(input, now)
        .await
        .context("creating bootstrap admin")?;
    log::info!("Created bootstrap admin '{}' ({})", user.username, user.id);

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn creates_admin_once() {
        let db = db().await;
        let config = AppConfig {
            bootstrap_admin_username: Some("admin".to_string()),
            bootstrap_admin_email: Some("admin@example.com".to_string()),
            ..AppConfig::default()
        };

        assert!(seed_bootstrap_admin(&db, &config, Utc::now()).await.unwrap());
        assert!(!seed_bootstrap_admin(&db, &config, Utc::now()).await.unwrap());

        let admin = UserRepository::new(&db)
            .find_by_username("admin")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Management);
        assert!(admin.is_superuser);
        assert!(admin.is_active);
        assert_eq!(admin.email, "admin@example.com");
    }

    #[tokio::test]
    async fn skipped_without_configured_username() {
        let db = db().await;
        assert!(
            !seed_bootstrap_admin(&db, &AppConfig::default(), Utc::now())
                .await
                .unwrap()
        );
        assert!(UserRepository::new(&db).list().await.unwrap().is_empty());
    }
}
