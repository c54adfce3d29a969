//! Read-only shaping of a student's subjects and grades for display.

use std::collections::{BTreeSet, HashMap};

use crate::db::models::{Grade, Student, Subject};
use crate::repositories::students::StudentListRow;

pub(crate) const UNASSIGNED_YEAR: &str = "Unassigned Year";
pub(crate) const UNASSIGNED_SEMESTER: &str = "Unassigned Semester";
pub(crate) const NO_COURSE: &str = "No Course Assigned";

const UNRANKED: u8 = 99;

#[derive(Debug, Clone)]
pub(crate) struct SubjectWithGrade {
    pub(crate) subject: Subject,
    pub(crate) grade: Option<Grade>,
}

impl SubjectWithGrade {
    fn year_key(&self) -> String {
        self.subject
            .year_level
            .map(|level| level.to_string())
            .unwrap_or_else(|| UNASSIGNED_YEAR.to_string())
    }

    fn semester_key(&self) -> String {
        let from_grade = self
            .grade
            .as_ref()
            .map(|grade| grade.semester.trim())
            .filter(|semester| !semester.is_empty());
        let from_subject = self
            .subject
            .semester_offered
            .as_deref()
            .map(str::trim)
            .filter(|semester| !semester.is_empty());
        from_grade.or(from_subject).unwrap_or(UNASSIGNED_SEMESTER).to_string()
    }

    fn academic_year(&self) -> Option<&str> {
        self.grade
            .as_ref()
            .map(|grade| grade.academic_year.trim())
            .filter(|year| !year.is_empty())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SemesterGroup {
    pub(crate) semester: String,
    pub(crate) subjects: Vec<SubjectWithGrade>,
}

#[derive(Debug, Clone)]
pub(crate) struct YearGroup {
    pub(crate) year_level: String,
    /// Distinct academic years of the grades shown in this year level, ascending.
    pub(crate) academic_years: Vec<String>,
    pub(crate) semesters: Vec<SemesterGroup>,
}

#[derive(Debug, Clone)]
pub(crate) struct RemovedSubject {
    pub(crate) subject: Subject,
    pub(crate) grade: Grade,
}

#[derive(Debug, Clone)]
pub(crate) struct StudentRecord {
    pub(crate) years: Vec<YearGroup>,
    pub(crate) removed: Vec<RemovedSubject>,
    pub(crate) academic_years: Vec<String>,
}

pub(crate) fn semester_rank(semester: &str) -> u8 {
    match semester.trim().to_ascii_lowercase().as_str() {
        "1st" => 1,
        "2nd" => 2,
        "3rd" => 3,
        _ => UNRANKED,
    }
}

/// Numeric year levels ascending, everything else after them.
fn year_rank(year_level: &str) -> (bool, u64) {
    match year_level.parse::<u64>() {
        Ok(level) => (false, level),
        Err(_) => (true, 0),
    }
}

/// Pairs each subject with the student's active grade for it, if any.
///
/// When several active rows exist the one listed last wins.
pub(crate) fn pair_with_active_grades(
    subjects: Vec<Subject>,
    grades: &[Grade],
) -> Vec<SubjectWithGrade> {
    pair_with(subjects, grades.iter().filter(|grade| grade.is_active))
}

fn pair_with<'a>(
    subjects: Vec<Subject>,
    grades: impl Iterator<Item = &'a Grade>,
) -> Vec<SubjectWithGrade> {
    let mut by_subject: HashMap<&str, &Grade> = HashMap::new();
    for grade in grades {
        by_subject.insert(grade.subject_id.as_str(), grade);
    }

    subjects
        .into_iter()
        .map(|subject| {
            let grade = by_subject.get(subject.id.as_str()).map(|grade| (*grade).clone());
            SubjectWithGrade { subject, grade }
        })
        .collect()
}

/// Groups by the subject's year level, then by the grade's (or subject's) semester.
pub(crate) fn group_by_year_and_semester(items: Vec<SubjectWithGrade>) -> Vec<YearGroup> {
    let mut years: Vec<YearGroup> = Vec::new();

    for item in items {
        let year_key = item.year_key();
        let semester_key = item.semester_key();

        let year_index = match years.iter().position(|group| group.year_level == year_key) {
            Some(index) => index,
            None => {
                years.push(YearGroup {
                    year_level: year_key,
                    academic_years: Vec::new(),
                    semesters: Vec::new(),
                });
                years.len() - 1
            }
        };
        let year = &mut years[year_index];
        match year.semesters.iter_mut().find(|group| group.semester == semester_key) {
            Some(group) => group.subjects.push(item),
            None => year.semesters.push(SemesterGroup { semester: semester_key, subjects: vec![item] }),
        }
    }

    for year in &mut years {
        year.semesters.sort_by_key(|group| semester_rank(&group.semester));
        year.academic_years = year
            .semesters
            .iter()
            .flat_map(|group| group.subjects.iter())
            .filter_map(SubjectWithGrade::academic_year)
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
    }
    years.sort_by_key(|group| year_rank(&group.year_level));
    years
}

/// Full record view: every subject the student has a row for, paired with its active
/// grade, plus the list of removed rows.
pub(crate) fn build_record(subjects: Vec<Subject>, grades: Vec<Grade>) -> StudentRecord {
    let academic_years = grades
        .iter()
        .filter(|grade| grade.is_active)
        .map(|grade| grade.academic_year.trim())
        .filter(|year| !year.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let by_id: HashMap<&str, &Subject> =
        subjects.iter().map(|subject| (subject.id.as_str(), subject)).collect();
    let removed = grades
        .iter()
        .filter(|grade| !grade.is_active)
        .filter_map(|grade| {
            by_id.get(grade.subject_id.as_str()).map(|subject| RemovedSubject {
                subject: (*subject).clone(),
                grade: grade.clone(),
            })
        })
        .collect();

    let years = group_by_year_and_semester(pair_with_active_grades(subjects, &grades));
    StudentRecord { years, removed, academic_years }
}

/// Every subject of the student's course grouped by offering slot, each paired with the
/// student's row for it whether active or removed.
pub(crate) fn course_overview(course_subjects: Vec<Subject>, grades: &[Grade]) -> Vec<YearGroup> {
    group_by_year_and_semester(pair_with(course_subjects, grades.iter()))
}

#[derive(Debug, Clone)]
pub(crate) struct YearPage {
    pub(crate) years: Vec<YearGroup>,
    pub(crate) page: usize,
    pub(crate) total_pages: usize,
    pub(crate) has_previous: bool,
    pub(crate) has_next: bool,
}

/// One year level per page. Pages are 1-based; an out-of-range page falls back to 1.
pub(crate) fn paginate_years(mut years: Vec<YearGroup>, page: Option<usize>) -> YearPage {
    let total_pages = years.len();
    let page = page.filter(|page| (1..=total_pages).contains(page)).unwrap_or(1);

    let current = if total_pages == 0 { Vec::new() } else { vec![years.swap_remove(page - 1)] };
    YearPage {
        years: current,
        page,
        total_pages,
        has_previous: page > 1,
        has_next: page < total_pages,
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CourseStudents {
    pub(crate) course_name: String,
    pub(crate) students: Vec<Student>,
}

/// Buckets list rows by course name, keeping the incoming order of both.
pub(crate) fn group_students_by_course(rows: Vec<StudentListRow>) -> Vec<CourseStudents> {
    let mut groups: Vec<CourseStudents> = Vec::new();
    for row in rows {
        let course_name = row
            .course_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| NO_COURSE.to_string());
        match groups.iter_mut().find(|group| group.course_name == course_name) {
            Some(group) => group.students.push(row.student),
            None => groups.push(CourseStudents { course_name, students: vec![row.student] }),
        }
    }
    groups
}
