use crate::repositories;
use crate::test_support;
use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn admin_can_create_update_and_delete_user() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "admin001").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({
                "username": "mreyes",
                "email": "mreyes@school.test",
                "full_name": "Maria Reyes",
                "password": "staff-pass",
                "role": "staff"
            })),
        ))
        .await
        .expect("create user");

    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    let user_id = created["id"].as_str().expect("user id").to_string();
    assert_eq!(created["role"], "staff");
    assert_eq!(created["is_active"], true);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/users/{user_id}"),
            Some(&token),
            Some(json!({ "full_name": "Maria R. Reyes", "is_active": false })),
        ))
        .await
        .expect("update user");

    let status = response.status();
    let updated = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");
    assert_eq!(updated["full_name"], "Maria R. Reyes");
    assert_eq!(updated["is_active"], false);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/users?role=staff",
            Some(&token),
            None,
        ))
        .await
        .expect("list users");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed["total_count"], 1);
    assert_eq!(listed["items"][0]["username"], "mreyes");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/users/{user_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("delete user");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let remaining =
        repositories::users::find_by_id(ctx.state.db(), &user_id).await.expect("lookup");
    assert!(remaining.is_none());
}

#[tokio::test]
async fn admin_create_user_rejects_short_password() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_admin(ctx.state.db(), "admin051").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({
                "username": "student450",
                "full_name": "Short Password",
                "password": "short"
            })),
        ))
        .await
        .expect("create user");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert!(body["detail"].as_str().unwrap_or("").contains("Password must be at least"));
}

#[tokio::test]
async fn staff_cannot_manage_users() {
    let ctx = test_support::setup_test_context().await;

    let staff = test_support::insert_user(
        ctx.state.db(),
        "staff01",
        "Staff",
        "staff-pass",
        crate::db::types::UserRole::Staff,
    )
    .await;
    let token = test_support::bearer_token(&staff.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/users", Some(&token), None))
        .await
        .expect("list users");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
