use crate::test_support;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn student_signup_activation_and_login() {
    let ctx = test_support::setup_test_context().await;

    let department = test_support::insert_department(ctx.state.db(), "Computing").await;
    let course =
        test_support::insert_course(ctx.state.db(), "BSCS", "Computer Science", &department.id)
            .await;
    test_support::insert_subject(ctx.state.db(), "CS101", &course, Some(1), Some("1st")).await;
    test_support::insert_subject(ctx.state.db(), "CS102", &course, Some(1), Some("2nd")).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup/student",
            None,
            Some(json!({
                "username": "jdelacruz",
                "email": "juan@school.test",
                "password": "student-pass",
                "student_number": "2024-0001",
                "first_name": "Juan",
                "last_name": "Dela Cruz",
                "course_id": course.id,
                "year_level": "1",
                "semester": "1st"
            })),
        ))
        .await
        .expect("signup");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["user"]["is_active"], false);
    assert_eq!(body["user"]["role"], "student");
    assert_eq!(body["assignment"]["outcome"], "assigned");
    assert_eq!(body["assignment"]["created"], 2);
    let activation_token = body["activation_token"].as_str().expect("token").to_string();

    let login = json!({ "username": "jdelacruz", "password": "student-pass" });
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(login.clone()),
        ))
        .await
        .expect("login before activation");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/activate",
            None,
            Some(json!({ "token": activation_token })),
        ))
        .await
        .expect("activate");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["is_active"], true);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/activate",
            None,
            Some(json!({ "token": activation_token })),
        ))
        .await
        .expect("activate twice");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Activation link is invalid!");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "juan@school.test", "password": "student-pass" })),
        ))
        .await
        .expect("login by email");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    let access_token = body["access_token"].as_str().expect("access token").to_string();

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/auth/me",
            Some(&access_token),
            None,
        ))
        .await
        .expect("me");
    let body = test_support::read_json(response).await;
    assert_eq!(body["username"], "jdelacruz");
}

#[tokio::test]
async fn signup_rejects_duplicate_username_and_short_password() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_admin(ctx.state.db(), "taken").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup/staff",
            None,
            Some(json!({
                "username": "taken",
                "email": "new@school.test",
                "password": "staff-pass",
                "full_name": "New Staff"
            })),
        ))
        .await
        .expect("duplicate signup");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup/staff",
            None,
            Some(json!({
                "username": "fresh",
                "email": "fresh@school.test",
                "password": "short",
                "full_name": "Fresh Staff"
            })),
        ))
        .await
        .expect("short password");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap_or("").contains("Password must be at least"));
}

#[tokio::test]
async fn student_signup_with_unknown_course_creates_nothing() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup/student",
            None,
            Some(json!({
                "username": "ghoststudent",
                "email": "ghost@school.test",
                "password": "student-pass",
                "student_number": "2024-0009",
                "first_name": "Ghost",
                "last_name": "Student",
                "course_id": "no-such-course"
            })),
        ))
        .await
        .expect("signup");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");
    assert_eq!(body["detail"], "Course not found.");

    let user = crate::repositories::users::find_by_username(ctx.state.db(), "ghoststudent")
        .await
        .expect("user lookup");
    assert!(user.is_none());
}

#[tokio::test]
async fn token_endpoint_accepts_form_credentials() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_admin(ctx.state.db(), "registrar").await;

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/auth/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=registrar&password=admin-pass"))
                .expect("request"),
        )
        .await
        .expect("token");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["token_type"], "bearer");

    let response = ctx
        .app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/auth/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=registrar&password=wrong-pass"))
                .expect("request"),
        )
        .await
        .expect("token");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
