mod test_utils;

use chrono::Utc;
use meetings::error::ServiceError;
use meetings::forms::{NewUserForm, ProfileForm};
use meetings::models::user::Role;
use test_utils::*;

fn new_user(username: &str) -> NewUserForm {
    NewUserForm {
        username: Some(username.to_string()),
        email: Some(format!("{username}@example.com")),
        ..NewUserForm::default()
    }
}

#[tokio::test]
async fn created_users_default_to_manager() {
    let db = setup_test_db().await.unwrap();
    let admin = management_user(&db, "admin").await.unwrap();

    let created = user_service(&db)
        .create_user(&admin, new_user("jdoe"), Utc::now())
        .await
        .unwrap();

    assert_eq!(created.username, "jdoe");
    assert_eq!(created.role, Role::Manager);
    assert!(!created.is_superuser);
}

#[tokio::test]
async fn duplicate_username_is_a_field_error() {
    let db = setup_test_db().await.unwrap();
    let admin = management_user(&db, "admin").await.unwrap();
    let service = user_service(&db);

    service
        .create_user(&admin, new_user("jdoe"), Utc::now())
        .await
        .unwrap();
    let err = service
        .create_user(&admin, new_user("jdoe"), Utc::now())
        .await
        .unwrap_err();

    match err {
        ServiceError::Validation(errors) => assert!(errors.has("username")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn managers_cannot_administer_users() {
    let db = setup_test_db().await.unwrap();
    let admin = management_user(&db, "admin").await.unwrap();
    let amy = manager_user(&db, "amy").await.unwrap();
    let service = user_service(&db);

    assert!(matches!(
        service.list_users(&amy).await.unwrap_err(),
        ServiceError::Forbidden
    ));
    assert!(matches!(
        service
            .create_user(&amy, new_user("sneaky"), Utc::now())
            .await
            .unwrap_err(),
        ServiceError::Forbidden
    ));
    assert!(matches!(
        service.delete_user(&amy, admin.id).await.unwrap_err(),
        ServiceError::Forbidden
    ));
}

#[tokio::test]
async fn users_cannot_delete_themselves() {
    let db = setup_test_db().await.unwrap();
    let admin = management_user(&db, "admin").await.unwrap();

    let err = user_service(&db)
        .delete_user(&admin, admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));
}

#[tokio::test]
async fn profile_update_validates_contact_details() {
    let db = setup_test_db().await.unwrap();
    let amy = manager_user(&db, "amy").await.unwrap();
    let service = user_service(&db);

    let err = service
        .update_profile(
            &amy,
            ProfileForm {
                email: Some("not-an-email".to_string()),
                ..ProfileForm::default()
            },
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(errors) if errors.has("email")));

    let updated = service
        .update_profile(
            &amy,
            ProfileForm {
                first_name: Some("Amy".to_string()),
                last_name: Some("Pond".to_string()),
                email: Some("amy@example.org".to_string()),
                department: Some("Ops".to_string()),
                ..ProfileForm::default()
            },
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(updated.first_name, "Amy");
    assert_eq!(updated.email, "amy@example.org");
    assert_eq!(updated.department.as_deref(), Some("Ops"));
    assert_eq!(updated.role, Role::Manager);
}

#[tokio::test]
async fn deleting_unknown_user_is_not_found() {
    let db = setup_test_db().await.unwrap();
    let admin = management_user(&db, "admin").await.unwrap();

    let err = user_service(&db)
        .delete_user(&admin, uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound("User")));
}
