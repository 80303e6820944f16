//! Persistence seam.
//!
//! Every entity lives in its own table/collection. Uniqueness invariants are
//! enforced by the backend's unique indexes, and a rejected write comes back as
//! [`StoreError::Duplicate`] carrying the index name from [`keys`]. Services
//! rely on that rejection to settle races instead of locking.

use async_trait::async_trait;
use chrono::NaiveDate;
use derive_more::Display;

use crate::model::{
    admin::{Admin, NewAdmin},
    attendance::{Attendance, AttendanceMark},
    homework::{Homework, HomeworkPatch, NewHomework, Submission},
    marks::{Marks, MarksPatch, NewMarks},
    school::School,
    sclass::Sclass,
    student::{NewStudent, Student, StudentUpdate},
    subject::{NewSubject, Subject},
    teacher::{NewTeacher, Teacher, TeacherUpdate},
    timetable::{SlotAssignment, TimetableEntry, TimetablePatch},
};

pub mod memory;
pub mod mysql;
mod sql_update;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Unique index names, identical in the SQL schema and the in-memory store.
pub mod keys {
    pub const SCHOOL_NAME: &str = "uq_schools_name";
    pub const ADMIN_EMAIL: &str = "uq_admins_email";
    pub const CLASS_NAME: &str = "uq_sclasses_school_name";
    pub const TEACHER_EMAIL: &str = "uq_teachers_email";
    pub const CLASS_TEACHER: &str = "uq_teachers_class_teacher";
    pub const STUDENT_EMAIL: &str = "uq_students_email";
    pub const STUDENT_ROLL: &str = "uq_students_roll";
    pub const ATTENDANCE_DAY: &str = "uq_attendance_day";
    pub const TIMETABLE_SLOT: &str = "uq_timetable_slot";
    pub const SUBMISSION_STUDENT: &str = "uq_submissions_student";
}

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "duplicate key {}", _0)]
    Duplicate(String),
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    #[display(fmt = "store unavailable: {}", _0)]
    Unavailable(String),
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

/// Ownership scope used by listings and cascading deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Scope {
    #[display(fmt = "class {}", _0)]
    Class(u64),
    #[display(fmt = "school {}", _0)]
    School(u64),
}

#[derive(Debug, Clone)]
pub enum HomeworkFilter {
    /// Homework addressed to a class name within one school.
    Class { school_id: u64, sclass: String },
    Teacher(u64),
}

#[derive(Debug, Clone, Copy)]
pub enum MarksFilter {
    Teacher(u64),
    Student(u64),
    Subject(u64),
}

#[async_trait]
pub trait SchoolStore: Send + Sync {
    // schools & admins

    /// Creates the school and its admin account together.
    async fn create_school_admin(&self, school_name: &str, admin: NewAdmin) -> StoreResult<Admin>;
    async fn find_admin(&self, id: u64) -> StoreResult<Option<Admin>>;
    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>>;
    async fn find_school(&self, id: u64) -> StoreResult<Option<School>>;

    // classes
    async fn insert_class(&self, school_id: u64, sclass_name: &str) -> StoreResult<Sclass>;
    async fn find_class(&self, id: u64) -> StoreResult<Option<Sclass>>;
    async fn find_class_by_name(&self, school_id: u64, sclass_name: &str) -> StoreResult<Option<Sclass>>;
    async fn list_classes(&self, school_id: u64) -> StoreResult<Vec<Sclass>>;
    /// `Scope::Class` removes that one class, `Scope::School` every class of the school.
    async fn delete_classes(&self, scope: Scope) -> StoreResult<u64>;

    // subjects
    async fn insert_subject(&self, subject: NewSubject) -> StoreResult<Subject>;
    async fn find_subject(&self, id: u64) -> StoreResult<Option<Subject>>;
    async fn list_subjects(&self, scope: Scope) -> StoreResult<Vec<Subject>>;
    async fn set_subject_teacher(&self, subject_id: u64, teacher_id: Option<u64>) -> StoreResult<bool>;
    async fn delete_subject(&self, id: u64) -> StoreResult<bool>;
    async fn delete_subjects(&self, scope: Scope) -> StoreResult<u64>;

    // teachers
    async fn insert_teacher(&self, teacher: NewTeacher) -> StoreResult<Teacher>;
    async fn find_teacher(&self, id: u64) -> StoreResult<Option<Teacher>>;
    async fn find_teacher_by_email(&self, email: &str) -> StoreResult<Option<Teacher>>;
    /// `Scope::Class` matches teachers teaching in, or homeroom of, the class.
    async fn list_teachers(&self, scope: Scope) -> StoreResult<Vec<Teacher>>;
    async fn update_teacher(&self, id: u64, update: TeacherUpdate) -> StoreResult<Option<Teacher>>;
    async fn add_teacher_class(&self, teacher_id: u64, sclass_id: u64) -> StoreResult<bool>;
    /// Adds the subject and its class to the teacher's sets and marks the subject as taught by them.
    async fn add_teacher_subject(&self, teacher_id: u64, subject_id: u64, sclass_id: u64) -> StoreResult<bool>;
    async fn set_class_teacher(&self, teacher_id: u64, sclass_id: Option<u64>) -> StoreResult<bool>;
    /// Also clears `teacher_id` on subjects that referenced the teacher.
    async fn delete_teacher(&self, id: u64) -> StoreResult<bool>;
    async fn delete_teachers(&self, scope: Scope) -> StoreResult<u64>;

    // students
    async fn insert_student(&self, student: NewStudent) -> StoreResult<Student>;
    async fn find_student(&self, id: u64) -> StoreResult<Option<Student>>;
    async fn find_student_by_email(&self, email: &str) -> StoreResult<Option<Student>>;
    async fn find_student_by_roll(&self, roll_num: i32, name: &str) -> StoreResult<Option<Student>>;
    async fn list_students(&self, scope: Scope) -> StoreResult<Vec<Student>>;
    async fn update_student(&self, id: u64, update: StudentUpdate) -> StoreResult<Option<Student>>;
    async fn upsert_exam_result(&self, student_id: u64, subject_id: u64, marks_obtained: f64) -> StoreResult<bool>;
    async fn delete_student(&self, id: u64) -> StoreResult<bool>;
    async fn delete_students(&self, scope: Scope) -> StoreResult<u64>;

    // attendance

    /// Upserts every mark keyed by (student, class, date) as one unit: either
    /// all marks are applied or none is.
    async fn upsert_attendance(
        &self,
        sclass_id: u64,
        date: NaiveDate,
        marked_by: u64,
        marks: &[AttendanceMark],
    ) -> StoreResult<()>;
    async fn list_class_attendance(&self, sclass_id: u64, date: Option<NaiveDate>) -> StoreResult<Vec<Attendance>>;
    /// Ascending by date.
    async fn list_student_attendance(&self, student_id: u64) -> StoreResult<Vec<Attendance>>;
    async fn delete_attendance(&self, scope: Scope) -> StoreResult<u64>;

    // timetable

    /// Upserts keyed by (school, class, day, period), applied in order so the
    /// last assignment for a slot wins.
    async fn upsert_timetable(&self, school_id: u64, entries: &[SlotAssignment]) -> StoreResult<()>;
    async fn find_timetable_entry(&self, id: u64) -> StoreResult<Option<TimetableEntry>>;
    async fn list_timetable(&self, scope: Scope) -> StoreResult<Vec<TimetableEntry>>;
    async fn update_timetable_entry(&self, id: u64, patch: TimetablePatch) -> StoreResult<Option<TimetableEntry>>;
    async fn delete_timetable_entry(&self, id: u64) -> StoreResult<bool>;
    async fn delete_timetable(&self, scope: Scope) -> StoreResult<u64>;

    // homework
    async fn insert_homework(&self, homework: NewHomework) -> StoreResult<Homework>;
    async fn find_homework(&self, id: u64) -> StoreResult<Option<Homework>>;
    async fn list_homework(&self, filter: HomeworkFilter) -> StoreResult<Vec<Homework>>;
    async fn update_homework(&self, id: u64, patch: HomeworkPatch) -> StoreResult<Option<Homework>>;
    async fn delete_homework(&self, id: u64) -> StoreResult<bool>;
    async fn delete_school_homework(&self, school_id: u64) -> StoreResult<u64>;
    /// `false` when the homework does not exist. Rejected with
    /// [`keys::SUBMISSION_STUDENT`] when the student already submitted.
    async fn insert_submission(&self, homework_id: u64, submission: Submission) -> StoreResult<bool>;
    async fn grade_submission(
        &self,
        homework_id: u64,
        student_id: u64,
        grade: f64,
        feedback: Option<String>,
    ) -> StoreResult<bool>;

    // marks
    async fn insert_marks(&self, marks: NewMarks) -> StoreResult<Marks>;
    async fn find_marks(&self, id: u64) -> StoreResult<Option<Marks>>;
    async fn list_marks(&self, filter: MarksFilter) -> StoreResult<Vec<Marks>>;
    async fn update_marks(&self, id: u64, patch: MarksPatch) -> StoreResult<Option<Marks>>;
    async fn delete_marks(&self, id: u64) -> StoreResult<bool>;
}
