use sqlx::PgPool;

use super::*;
use crate::core::time::current_academic_year;
use crate::repositories::students::StudentFields;
use crate::services::enrollment;
use crate::test_support;

async fn grade_count(pool: &PgPool, student_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM grades WHERE student_id = $1")
        .bind(student_id)
        .fetch_one(pool)
        .await
        .expect("count grades")
}

async fn grades_for(pool: &PgPool, student_id: &str, subject_id: &str) -> Vec<Grade> {
    repositories::grades::list_for_student(pool, student_id)
        .await
        .expect("list grades")
        .into_iter()
        .filter(|grade| grade.subject_id == subject_id)
        .collect()
}

fn edit(student: &Student, subject: &Subject, value: Option<GradeInput>) -> EditGrade {
    EditGrade {
        student_id: student.id.clone(),
        subject_id: subject.id.clone(),
        semester: None,
        academic_year: None,
        year_level: None,
        grade_value: value,
    }
}

#[tokio::test]
async fn enrollment_grade_drop_and_restore_scenario() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let policy = ctx.state.grade_policy();
    let year = current_academic_year();

    let dept = test_support::insert_department(db, "Computing").await;
    let bscs = test_support::insert_course(db, "BSCS", "Computer Science", &dept.id).await;
    let a = test_support::insert_subject(db, "A", &bscs, Some(1), Some("1st")).await;
    let b = test_support::insert_subject(db, "B", &bscs, Some(1), Some("1st")).await;
    let student = test_support::enroll_student(db, "S-0001", Some(&bscs), &year).await;

    for subject in [&a, &b] {
        let rows = grades_for(db, &student.id, &subject.id).await;
        assert_eq!(rows.len(), 1);
        let grade = &rows[0];
        assert_eq!(grade.semester, "1st");
        assert_eq!(grade.academic_year, year);
        assert!(grade.is_active);
        assert_eq!(grade.grade_value, None);
        assert_eq!(grade.status, EnrollmentStatus::CurrentlyTaking);
    }

    let change = edit_grade(db, policy, edit(&student, &a, Some(GradeInput::Number(90.0))))
        .await
        .expect("edit grade");
    assert_eq!(change.grade.status, EnrollmentStatus::Done);
    assert_eq!(change.grade.grade_value, Some(90.0));
    assert_eq!(change.subject.status, EnrollmentStatus::Done);
    assert!(change.subject_status_changed);
    assert_eq!(grade_count(db, &student.id).await, 2);

    let dropped = drop_subject(db, &student.id, &b.id).await.expect("drop subject");
    assert_eq!(dropped.affected_rows, 1);
    let rows = grades_for(db, &student.id, &b.id).await;
    assert!(!rows[0].is_active);
    assert_eq!(rows[0].status, EnrollmentStatus::Drop);

    let restored =
        restore_subject(db, &student.id, &b.id, TermFilter::default()).await.expect("restore");
    let grade = restored.grade.expect("restored grade");
    assert!(grade.is_active);
    assert_eq!(grade.status, EnrollmentStatus::CurrentlyTaking);
}

#[tokio::test]
async fn clearing_a_grade_keeps_subject_status() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let policy = ctx.state.grade_policy();

    let dept = test_support::insert_department(db, "Computing").await;
    let course = test_support::insert_course(db, "BSIT", "Information Technology", &dept.id).await;
    let subject = test_support::insert_subject(db, "IT101", &course, Some(1), None).await;
    let student =
        test_support::enroll_student(db, "S-0002", Some(&course), &current_academic_year()).await;

    edit_grade(db, policy, edit(&student, &subject, Some(GradeInput::Number(85.0))))
        .await
        .expect("enter grade");
    let cleared =
        edit_grade(db, policy, edit(&student, &subject, Some(GradeInput::Text("-".into()))))
            .await
            .expect("clear grade");

    assert_eq!(cleared.grade.grade_value, None);
    assert_eq!(cleared.grade.status, EnrollmentStatus::CurrentlyTaking);
    assert_eq!(cleared.subject.status, EnrollmentStatus::Done);
    assert!(!cleared.subject_status_changed);
}

#[tokio::test]
async fn out_of_range_grade_changes_nothing() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let policy = ctx.state.grade_policy();

    let dept = test_support::insert_department(db, "Computing").await;
    let course = test_support::insert_course(db, "BSCS", "Computer Science", &dept.id).await;
    let subject = test_support::insert_subject(db, "CS101", &course, Some(1), None).await;
    let student =
        test_support::enroll_student(db, "S-0003", Some(&course), &current_academic_year()).await;

    let err = edit_grade(db, policy, edit(&student, &subject, Some(GradeInput::Number(101.0))))
        .await
        .expect_err("out of range");
    assert!(matches!(err, RecordsError::Validation(_)));

    let rows = grades_for(db, &student.id, &subject.id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].grade_value, None);
}

#[tokio::test]
async fn deleting_a_grade_clears_the_value_and_drops_subject_status() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let policy = ctx.state.grade_policy();
    let year = current_academic_year();

    let dept = test_support::insert_department(db, "Computing").await;
    let course = test_support::insert_course(db, "BSCS", "Computer Science", &dept.id).await;
    let subject = test_support::insert_subject(db, "CS102", &course, Some(1), None).await;
    let student = test_support::enroll_student(db, "S-0004", Some(&course), &year).await;

    edit_grade(db, policy, edit(&student, &subject, Some(GradeInput::Number(75.0))))
        .await
        .expect("enter grade");

    let term = TermFilter { semester: Some("1st".into()), academic_year: Some(year.clone()) };
    let change = delete_grade(db, policy, &student.id, &subject.id, term).await.expect("delete");
    assert_eq!(change.grade.grade_value, None);
    assert_eq!(change.grade.status, EnrollmentStatus::CurrentlyTaking);
    assert_eq!(change.subject.status, EnrollmentStatus::Drop);
    assert_eq!(grade_count(db, &student.id).await, 1);

    let missing = TermFilter { semester: Some("2nd".into()), academic_year: Some(year) };
    let err = delete_grade(db, policy, &student.id, &subject.id, missing).await.unwrap_err();
    assert!(matches!(err, RecordsError::NotFound(_)));
}

#[tokio::test]
async fn removed_subject_can_only_be_deleted_once_inactive() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let dept = test_support::insert_department(db, "Computing").await;
    let course = test_support::insert_course(db, "BSCS", "Computer Science", &dept.id).await;
    let subject = test_support::insert_subject(db, "CS103", &course, Some(1), None).await;
    let student =
        test_support::enroll_student(db, "S-0005", Some(&course), &current_academic_year()).await;

    let err = delete_removed_subject(db, &student.id, &subject.id).await.unwrap_err();
    assert_eq!(err.to_string(), "Removed subject not found for the student.");
    assert_eq!(grade_count(db, &student.id).await, 1);

    let removed = remove_subject(db, &student.id, &subject.id, TermFilter::default())
        .await
        .expect("remove subject");
    let grade = removed.grade.expect("removed grade");
    assert!(!grade.is_active);
    assert_eq!(grade.status, EnrollmentStatus::Drop);

    let err = remove_subject(db, &student.id, &subject.id, TermFilter::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Active subject not found for the student.");

    delete_removed_subject(db, &student.id, &subject.id).await.expect("delete removed");
    assert_eq!(grade_count(db, &student.id).await, 0);
}

#[tokio::test]
async fn adding_an_active_subject_twice_is_a_duplicate() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let dept = test_support::insert_department(db, "Computing").await;
    let course = test_support::insert_course(db, "BSCS", "Computer Science", &dept.id).await;
    let subject = test_support::insert_subject(db, "CS104", &course, Some(1), None).await;
    let student =
        test_support::enroll_student(db, "S-0006", Some(&course), &current_academic_year()).await;

    let params = AddSubject {
        student_id: student.id.clone(),
        subject_id: subject.id.clone(),
        course_id: None,
        semester: Some("1st".into()),
    };
    let err = add_subject(db, params.clone()).await.unwrap_err();
    assert!(matches!(err, RecordsError::DuplicateAssignment(_)));
    assert_eq!(grade_count(db, &student.id).await, 1);

    let added = add_subject(db, AddSubject { semester: Some("2nd".into()), ..params })
        .await
        .expect("add for second semester");
    assert!(!added.reactivated);
    assert_eq!(added.grade.semester, "2nd");
    assert_eq!(grade_count(db, &student.id).await, 2);
}

#[tokio::test]
async fn adding_a_removed_subject_reactivates_its_row() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let dept = test_support::insert_department(db, "Computing").await;
    let course = test_support::insert_course(db, "BSCS", "Computer Science", &dept.id).await;
    let subject = test_support::insert_subject(db, "CS105", &course, Some(1), None).await;
    let student =
        test_support::enroll_student(db, "S-0007", Some(&course), &current_academic_year()).await;

    drop_subject(db, &student.id, &subject.id).await.expect("drop");
    let added = add_subject(
        db,
        AddSubject {
            student_id: student.id.clone(),
            subject_id: subject.id.clone(),
            course_id: Some(course.id.clone()),
            semester: Some("1st".into()),
        },
    )
    .await
    .expect("add subject");

    assert!(added.reactivated);
    assert!(added.grade.is_active);
    assert_eq!(grade_count(db, &student.id).await, 1);
}

#[tokio::test]
async fn add_subject_checks_department_course_and_semester_in_order() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let computing = test_support::insert_department(db, "Computing").await;
    let business = test_support::insert_department(db, "Business").await;
    let bscs = test_support::insert_course(db, "BSCS", "Computer Science", &computing.id).await;
    let bsit = test_support::insert_course(db, "BSIT", "Information Tech", &computing.id).await;
    let bsba = test_support::insert_course(db, "BSBA", "Business Admin", &business.id).await;
    let foreign = test_support::insert_subject(db, "BA101", &bsba, Some(1), None).await;
    let sibling = test_support::insert_subject(db, "IT101", &bsit, Some(1), None).await;
    let own = test_support::insert_subject(db, "CS201", &bscs, Some(2), None).await;
    let student =
        test_support::enroll_student(db, "S-0008", Some(&bscs), &current_academic_year()).await;
    let before = grade_count(db, &student.id).await;

    let request = |subject: &Subject, semester: Option<&str>| AddSubject {
        student_id: student.id.clone(),
        subject_id: subject.id.clone(),
        course_id: None,
        semester: semester.map(str::to_string),
    };

    let err = add_subject(db, request(&foreign, None)).await.unwrap_err();
    assert_eq!(err.to_string(), "Selected subject does not belong to the student's department.");

    let err = add_subject(db, request(&sibling, None)).await.unwrap_err();
    assert_eq!(err.to_string(), "Selected subject does not belong to the selected course.");

    let err = add_subject(db, request(&sibling, Some("1st"))).await.unwrap_err();
    assert!(matches!(err, RecordsError::Validation(_)));

    let err = add_subject(db, request(&own, None)).await.unwrap_err();
    assert_eq!(err.to_string(), "Semester is required.");

    assert_eq!(grade_count(db, &student.id).await, before);
}

#[tokio::test]
async fn change_subject_swaps_rows_atomically() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let dept = test_support::insert_department(db, "Computing").await;
    let course = test_support::insert_course(db, "BSCS", "Computer Science", &dept.id).await;
    let old = test_support::insert_subject(db, "CS106", &course, Some(1), None).await;
    let replacement = test_support::insert_subject(db, "CS107", &course, Some(1), None).await;
    let unassigned = test_support::insert_subject(db, "CS108", &course, Some(1), None).await;
    let student =
        test_support::enroll_student(db, "S-0009", None, &current_academic_year()).await;
    add_subject(
        db,
        AddSubject {
            student_id: student.id.clone(),
            subject_id: old.id.clone(),
            course_id: Some(course.id.clone()),
            semester: Some("1st".into()),
        },
    )
    .await
    .expect_err("student without department cannot take the subject");

    let student = enrollment::update_student(
        db,
        ctx.state.grade_policy(),
        &student.id,
        StudentFields {
            course_id: Some(course.id.clone()),
            department_id: Some(dept.id.clone()),
            ..StudentFields::default()
        },
    )
    .await
    .expect("assign course")
    .student;
    assert_eq!(grade_count(db, &student.id).await, 3);

    let changed = change_subject(
        db,
        ChangeSubject {
            student_id: student.id.clone(),
            old_subject_id: old.id.clone(),
            new_subject_id: replacement.id.clone(),
            semester: Some("2nd".into()),
            year_level: Some("1".into()),
        },
    )
    .await
    .expect("change subject");
    assert_eq!(changed.removed_rows, 1);
    assert_eq!(changed.grade.subject_id, replacement.id);
    assert_eq!(changed.grade.semester, "2nd");
    assert!(!changed.reused_existing_row);
    assert!(grades_for(db, &student.id, &old.id).await.is_empty());
    assert_eq!(grades_for(db, &student.id, &replacement.id).await.len(), 2);

    let err = change_subject(
        db,
        ChangeSubject {
            student_id: student.id.clone(),
            old_subject_id: old.id.clone(),
            new_subject_id: unassigned.id.clone(),
            semester: Some("2nd".into()),
            year_level: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RecordsError::NotFound(_)));
    assert_eq!(grades_for(db, &student.id, &unassigned.id).await.len(), 1);

    let err = change_subject(
        db,
        ChangeSubject {
            student_id: student.id.clone(),
            old_subject_id: replacement.id.clone(),
            new_subject_id: replacement.id.clone(),
            semester: None,
            year_level: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RecordsError::Validation(_)));
}

#[tokio::test]
async fn change_into_a_removed_slot_returns_the_removed_row() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();

    let dept = test_support::insert_department(db, "Computing").await;
    let course = test_support::insert_course(db, "BSCS", "Computer Science", &dept.id).await;
    let old = test_support::insert_subject(db, "CS120", &course, Some(1), Some("1st")).await;
    let target = test_support::insert_subject(db, "CS121", &course, Some(1), Some("1st")).await;
    let student =
        test_support::enroll_student(db, "S-0012", Some(&course), &current_academic_year()).await;

    drop_subject(db, &student.id, &target.id).await.expect("drop target");

    let changed = change_subject(
        db,
        ChangeSubject {
            student_id: student.id.clone(),
            old_subject_id: old.id.clone(),
            new_subject_id: target.id.clone(),
            semester: None,
            year_level: None,
        },
    )
    .await
    .expect("change subject");

    assert!(changed.reused_existing_row);
    assert!(!changed.grade.is_active);
    assert_eq!(changed.grade.status, EnrollmentStatus::Drop);
    assert!(grades_for(db, &student.id, &old.id).await.is_empty());
    assert_eq!(grades_for(db, &student.id, &target.id).await.len(), 1);
}

#[tokio::test]
async fn entering_a_grade_on_a_dropped_subject_marks_it_done() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let policy = ctx.state.grade_policy();

    let dept = test_support::insert_department(db, "Computing").await;
    let course = test_support::insert_course(db, "BSCS", "Computer Science", &dept.id).await;
    let subject = test_support::insert_subject(db, "CS122", &course, Some(1), Some("1st")).await;
    let student =
        test_support::enroll_student(db, "S-0013", Some(&course), &current_academic_year()).await;

    drop_subject(db, &student.id, &subject.id).await.expect("drop subject");
    let change = edit_grade(db, policy, edit(&student, &subject, Some(GradeInput::Number(80.0))))
        .await
        .expect("edit dropped grade");

    assert_eq!(change.grade.grade_value, Some(80.0));
    assert_eq!(change.grade.status, EnrollmentStatus::Done);
    assert!(!change.grade.is_active);

    let rows = grades_for(db, &student.id, &subject.id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, EnrollmentStatus::Done);
    assert!(!rows[0].is_active);

    delete_removed_subject(db, &student.id, &subject.id).await.expect("still removable");
}

#[tokio::test]
async fn reconcile_reactivates_current_slot_once() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let policy = ctx.state.grade_policy();

    let dept = test_support::insert_department(db, "Computing").await;
    let course = test_support::insert_course(db, "BSCS", "Computer Science", &dept.id).await;
    let subject = test_support::insert_subject(db, "CS109", &course, Some(1), None).await;
    let student =
        test_support::enroll_student(db, "S-0010", Some(&course), &current_academic_year()).await;

    let mut params = edit(&student, &subject, Some(GradeInput::Number(88.0)));
    params.year_level = Some("1".into());
    edit_grade(db, policy, params).await.expect("edit grade");
    remove_subject(db, &student.id, &subject.id, TermFilter::default()).await.expect("remove");

    let first = reconcile_student(db, policy, &student.id).await.expect("reconcile");
    assert_eq!(first, ReconcileOutcome { backfilled: 0, reactivated: 1 });
    let rows = grades_for(db, &student.id, &subject.id).await;
    assert!(rows[0].is_active);
    assert_eq!(rows[0].status, EnrollmentStatus::Done);

    let second = reconcile_student(db, policy, &student.id).await.expect("reconcile again");
    assert_eq!(second, ReconcileOutcome::default());
}

#[tokio::test]
async fn unknown_student_is_not_found() {
    let ctx = test_support::setup_test_context().await;
    let err = drop_subject(ctx.state.db(), "missing", "missing").await.unwrap_err();
    assert_eq!(err.to_string(), "Student not found.");
}
