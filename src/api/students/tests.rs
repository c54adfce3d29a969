use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

use crate::core::time::current_academic_year;
use crate::db::types::UserRole;
use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn admin_creates_student_with_course_subjects_assigned() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let admin = test_support::insert_admin(db, "studentadmin01").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let department = test_support::insert_department(db, "Computing").await;
    let course = test_support::insert_course(db, "BSIT", "Information Technology", &department.id).await;
    test_support::insert_subject(db, "IT101", &course, Some(1), Some("1st")).await;
    test_support::insert_subject(db, "IT102", &course, Some(1), Some("2nd")).await;
    let account =
        test_support::insert_user(db, "juan01", "Juan", "student-pass", UserRole::Student).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/students",
            Some(&token),
            Some(json!({
                "student_number": "2024-3001",
                "user_email": "juan01@school.test",
                "first_name": "Juan",
                "last_name": "Dela Cruz",
                "course_id": course.id,
                "department_id": department.id,
                "year_level": "1",
                "semester": "1st"
            })),
        ))
        .await
        .expect("create student");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["student"]["user_id"], account.id.as_str());
    assert_eq!(body["student"]["academic_year"], current_academic_year());
    assert_eq!(body["assignment"]["outcome"], "assigned");
    assert_eq!(body["assignment"]["created"], 2);

    let student_id = body["student"]["id"].as_str().expect("student id");
    let grades = repositories::grades::list_for_student(db, student_id).await.expect("grades");
    assert_eq!(grades.len(), 2);
    assert!(grades.iter().all(|grade| grade.semester == "1st" && grade.is_active));
}

#[tokio::test]
async fn student_create_rejects_duplicates_and_unknown_accounts() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let admin = test_support::insert_admin(db, "studentadmin02").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());
    test_support::enroll_student(db, "2024-3002", None, "2024-2025").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/students",
            Some(&token),
            Some(json!({ "student_number": "2024-3002", "first_name": "A", "last_name": "B" })),
        ))
        .await
        .expect("create student");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/students",
            Some(&token),
            Some(json!({
                "student_number": "2024-3003",
                "user_email": "nobody@school.test",
                "first_name": "A",
                "last_name": "B"
            })),
        ))
        .await
        .expect("create student");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/students",
            Some(&token),
            Some(json!({ "student_number": "2024-3004", "first_name": "A" })),
        ))
        .await
        .expect("create student");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn student_writes_with_unknown_course_or_department_are_not_found() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let admin = test_support::insert_admin(db, "studentadmin06").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let student = test_support::enroll_student(db, "2024-3020", None, "2024-2025").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/students",
            Some(&token),
            Some(json!({
                "student_number": "2024-3021",
                "first_name": "A",
                "last_name": "B",
                "course_id": "no-such-course"
            })),
        ))
        .await
        .expect("create student");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");
    assert_eq!(body["detail"], "Course not found.");
    let taken = repositories::students::student_number_taken(db, "2024-3021")
        .await
        .expect("student number lookup");
    assert!(!taken);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/students/{}", student.id),
            Some(&token),
            Some(json!({ "department_id": "no-such-department" })),
        ))
        .await
        .expect("update student");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");
    assert_eq!(body["detail"], "Department not found.");
}

#[tokio::test]
async fn course_change_assigns_new_course_and_keeps_old_rows() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let admin = test_support::insert_admin(db, "studentadmin03").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let department = test_support::insert_department(db, "Engineering").await;
    let first = test_support::insert_course(db, "BSCE", "Civil Engineering", &department.id).await;
    let second = test_support::insert_course(db, "BSEE", "Electrical Engineering", &department.id).await;
    test_support::insert_subject(db, "CE1", &first, Some(1), Some("1st")).await;
    test_support::insert_subject(db, "EE1", &second, Some(1), Some("1st")).await;
    test_support::insert_subject(db, "EE2", &second, Some(1), Some("2nd")).await;
    let student =
        test_support::enroll_student(db, "2024-3005", Some(&first), &current_academic_year()).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/students/{}", student.id),
            Some(&token),
            Some(json!({ "course_id": second.id })),
        ))
        .await
        .expect("update student");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["student"]["course_id"], second.id.as_str());
    assert_eq!(body["assignment"]["created"], 2);

    let grades = repositories::grades::list_for_student(db, &student.id).await.expect("grades");
    assert_eq!(grades.len(), 3);
}

#[tokio::test]
async fn staff_list_groups_students_by_course() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let department = test_support::insert_department(db, "Arts").await;
    let course = test_support::insert_course(db, "ABENG", "English", &department.id).await;
    test_support::enroll_student(db, "2024-3006", Some(&course), "2024-2025").await;
    test_support::enroll_student(db, "2024-3007", None, "2024-2025").await;
    let staff =
        test_support::insert_user(db, "registrar08", "Registrar", "staff-pass", UserRole::Staff)
            .await;
    let token = test_support::bearer_token(&staff.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/students", Some(&token), None))
        .await
        .expect("list students");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body.as_array().map(Vec::len), Some(2));
    assert_eq!(body[0]["course_name"], "English");
    assert_eq!(body[0]["students"][0]["student_number"], "2024-3006");
    assert_eq!(body[1]["course_name"], "No Course Assigned");
}

#[tokio::test]
async fn student_pages_own_grades_by_year_level() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let admin = test_support::insert_admin(db, "studentadmin04").await;
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let department = test_support::insert_department(db, "Nursing").await;
    let course = test_support::insert_course(db, "BSN", "Nursing", &department.id).await;
    test_support::insert_subject(db, "N101", &course, Some(1), Some("1st")).await;
    test_support::insert_subject(db, "N201", &course, Some(2), Some("1st")).await;
    let account =
        test_support::insert_user(db, "maria01", "Maria", "student-pass", UserRole::Student).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/students",
            Some(&admin_token),
            Some(json!({
                "student_number": "2024-3008",
                "user_email": "maria01@school.test",
                "first_name": "Maria",
                "last_name": "Santos",
                "course_id": course.id,
                "department_id": department.id
            })),
        ))
        .await
        .expect("create student");
    assert_eq!(response.status(), StatusCode::CREATED);

    let token = test_support::bearer_token(&account.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/students/me/grades?page=2",
            Some(&token),
            None,
        ))
        .await
        .expect("my grades");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["page"], 2);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["has_previous"], true);
    assert_eq!(body["has_next"], false);
    assert_eq!(body["years"][0]["year_level"], "2");
    assert_eq!(body["years"][0]["semesters"][0]["subjects"][0]["subject"]["code"], "N201");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/students/me/grades?page=abc",
            Some(&token),
            None,
        ))
        .await
        .expect("my grades");
    let body = test_support::read_json(response).await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["years"][0]["year_level"], "1");
}

#[tokio::test]
async fn course_subjects_view_and_owner_access() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let department = test_support::insert_department(db, "Education").await;
    let course = test_support::insert_course(db, "BSED", "Secondary Education", &department.id).await;
    test_support::insert_subject(db, "ED1", &course, Some(1), Some("1st")).await;
    test_support::insert_subject(db, "ED2", &course, Some(1), Some("2nd")).await;
    let student =
        test_support::enroll_student(db, "2024-3009", Some(&course), &current_academic_year()).await;
    let staff =
        test_support::insert_user(db, "registrar09", "Registrar", "staff-pass", UserRole::Staff)
            .await;
    let outsider =
        test_support::insert_user(db, "pedro01", "Pedro", "student-pass", UserRole::Student).await;

    let uri = format!("/api/v1/students/{}/course-subjects", student.id);
    let staff_token = test_support::bearer_token(&staff.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &uri, Some(&staff_token), None))
        .await
        .expect("course subjects");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["course"]["code"], "BSED");
    assert_eq!(body["years"][0]["year_level"], "1");
    assert_eq!(body["years"][0]["semesters"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["years"][0]["semesters"][0]["semester"], "1st");

    let outsider_token = test_support::bearer_token(&outsider.id, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, &uri, Some(&outsider_token), None))
        .await
        .expect("course subjects");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn document_upload_needs_configured_storage() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let admin = test_support::insert_admin(db, "studentadmin05").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let student = test_support::enroll_student(db, "2024-3010", None, "2024-2025").await;

    let boundary = "records-boundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"form137.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n%PDF-1.4\r\n--{boundary}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/students/{}/documents/f137", student.id))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .expect("request");

    let response = ctx.app.clone().oneshot(request).await.expect("upload document");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/students/{}/documents/form137", student.id),
            Some(&token),
            None,
        ))
        .await
        .expect("delete unknown kind");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/students/{}/documents", student.id),
            Some(&token),
            None,
        ))
        .await
        .expect("list documents");
    let status = response.status();
    let listed = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {listed}");
    assert_eq!(listed.as_array().map(Vec::len), Some(0));
}
