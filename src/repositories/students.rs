use sqlx::{PgExecutor, PgPool};
use time::Date;

use crate::db::models::Student;
use crate::db::types::StudentStatus;

pub(crate) const COLUMNS: &str = "\
    id, user_id, student_number, first_name, middle_name, last_name, email, gender, \
    date_of_birth, place_of_birth, address, phone_number, citizenship, civil_status, \
    father_name, mother_name, guardian_contact_number, school_name, student_type, \
    course_id, department_id, year_level, semester, academic_year, student_status, \
    created_at, updated_at";

/// Student row paired with the name of its course, for list screens.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StudentListRow {
    #[sqlx(flatten)]
    pub(crate) student: Student,
    pub(crate) course_name: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct StudentFields {
    pub(crate) first_name: Option<String>,
    pub(crate) middle_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) gender: Option<String>,
    pub(crate) date_of_birth: Option<Date>,
    pub(crate) place_of_birth: Option<String>,
    pub(crate) address: Option<String>,
    pub(crate) phone_number: Option<String>,
    pub(crate) citizenship: Option<String>,
    pub(crate) civil_status: Option<String>,
    pub(crate) father_name: Option<String>,
    pub(crate) mother_name: Option<String>,
    pub(crate) guardian_contact_number: Option<String>,
    pub(crate) school_name: Option<String>,
    pub(crate) student_type: Option<String>,
    pub(crate) course_id: Option<String>,
    pub(crate) department_id: Option<String>,
    pub(crate) year_level: Option<String>,
    pub(crate) semester: Option<String>,
    pub(crate) academic_year: Option<String>,
    pub(crate) student_status: Option<StudentStatus>,
}

pub(crate) struct CreateStudent<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: Option<&'a str>,
    pub(crate) student_number: &'a str,
    pub(crate) fields: StudentFields,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create<'e, E>(
    executor: E,
    params: CreateStudent<'_>,
) -> Result<Student, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let fields = params.fields;
    sqlx::query_as::<_, Student>(&format!(
        "INSERT INTO students (
            id, user_id, student_number, first_name, middle_name, last_name, email, gender,
            date_of_birth, place_of_birth, address, phone_number, citizenship, civil_status,
            father_name, mother_name, guardian_contact_number, school_name, student_type,
            course_id, department_id, year_level, semester, academic_year, student_status,
            created_at, updated_at
         ) VALUES (
            $1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,
            $23,$24,$25,$26,$26
         )
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.student_number)
    .bind(fields.first_name.unwrap_or_default())
    .bind(fields.middle_name)
    .bind(fields.last_name.unwrap_or_default())
    .bind(fields.email)
    .bind(fields.gender)
    .bind(fields.date_of_birth)
    .bind(fields.place_of_birth)
    .bind(fields.address)
    .bind(fields.phone_number)
    .bind(fields.citizenship)
    .bind(fields.civil_status)
    .bind(fields.father_name)
    .bind(fields.mother_name)
    .bind(fields.guardian_contact_number)
    .bind(fields.school_name)
    .bind(fields.student_type)
    .bind(fields.course_id)
    .bind(fields.department_id)
    .bind(fields.year_level)
    .bind(fields.semester)
    .bind(fields.academic_year)
    .bind(fields.student_status.unwrap_or(StudentStatus::Enrolled))
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

/// Partial update; `None` keeps the stored value.
pub(crate) async fn update<'e, E>(
    executor: E,
    id: &str,
    fields: StudentFields,
    updated_at: time::PrimitiveDateTime,
) -> Result<Option<Student>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Student>(&format!(
        "UPDATE students SET
            first_name = COALESCE($1, first_name),
            middle_name = COALESCE($2, middle_name),
            last_name = COALESCE($3, last_name),
            email = COALESCE($4, email),
            gender = COALESCE($5, gender),
            date_of_birth = COALESCE($6, date_of_birth),
            place_of_birth = COALESCE($7, place_of_birth),
            address = COALESCE($8, address),
            phone_number = COALESCE($9, phone_number),
            citizenship = COALESCE($10, citizenship),
            civil_status = COALESCE($11, civil_status),
            father_name = COALESCE($12, father_name),
            mother_name = COALESCE($13, mother_name),
            guardian_contact_number = COALESCE($14, guardian_contact_number),
            school_name = COALESCE($15, school_name),
            student_type = COALESCE($16, student_type),
            course_id = COALESCE($17, course_id),
            department_id = COALESCE($18, department_id),
            year_level = COALESCE($19, year_level),
            semester = COALESCE($20, semester),
            academic_year = COALESCE($21, academic_year),
            student_status = COALESCE($22, student_status),
            updated_at = $23
         WHERE id = $24
         RETURNING {COLUMNS}"
    ))
    .bind(fields.first_name)
    .bind(fields.middle_name)
    .bind(fields.last_name)
    .bind(fields.email)
    .bind(fields.gender)
    .bind(fields.date_of_birth)
    .bind(fields.place_of_birth)
    .bind(fields.address)
    .bind(fields.phone_number)
    .bind(fields.citizenship)
    .bind(fields.civil_status)
    .bind(fields.father_name)
    .bind(fields.mother_name)
    .bind(fields.guardian_contact_number)
    .bind(fields.school_name)
    .bind(fields.student_type)
    .bind(fields.course_id)
    .bind(fields.department_id)
    .bind(fields.year_level)
    .bind(fields.semester)
    .bind(fields.academic_year)
    .bind(fields.student_status)
    .bind(updated_at)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_id<'e, E>(
    executor: E,
    id: &str,
) -> Result<Option<Student>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Locks the student row for the rest of the transaction.
pub(crate) async fn find_for_update<'e, E>(
    executor: E,
    id: &str,
) -> Result<Option<Student>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_by_user_id(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE user_id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn student_number_taken(
    pool: &PgPool,
    student_number: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM students WHERE student_number = $1)")
        .bind(student_number)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    search: Option<&str>,
) -> Result<Vec<StudentListRow>, sqlx::Error> {
    let pattern = search
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| format!("%{value}%"));
    let prefixed = COLUMNS
        .split(',')
        .map(|column| format!("s.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    sqlx::query_as::<_, StudentListRow>(&format!(
        "SELECT {prefixed}, c.name AS course_name
         FROM students s
         LEFT JOIN courses c ON c.id = s.course_id
         WHERE $1::text IS NULL
            OR s.first_name ILIKE $1 OR s.last_name ILIKE $1
            OR s.student_number ILIKE $1 OR s.email ILIKE $1
         ORDER BY c.name NULLS LAST, s.last_name, s.first_name"
    ))
    .bind(pattern)
    .fetch_all(pool)
    .await
}

pub(crate) async fn delete<'e, E>(executor: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result =
        sqlx::query("DELETE FROM students WHERE id = $1").bind(id).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}
