use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool, types::Json};

use super::{
    HomeworkFilter, MarksFilter, SchoolStore, Scope, StoreError, StoreResult, sql_update::SqlUpdate,
};
use crate::model::{
    admin::{Admin, NewAdmin},
    attendance::{Attendance, AttendanceMark},
    homework::{Attachment, Homework, HomeworkPatch, HomeworkStatus, NewHomework, Submission, SubmissionStatus},
    marks::{Marks, MarksPatch, NewMarks},
    school::School,
    sclass::Sclass,
    student::{ExamResult, NewStudent, Student, StudentUpdate},
    subject::{NewSubject, Subject},
    teacher::{NewTeacher, Teacher, TeacherUpdate},
    timetable::{SlotAssignment, TimetableEntry, TimetablePatch},
};

/// MySQL-backed store. Schema lives in `migrations/`.
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, table: &'static str, id: u64) -> StoreResult<bool> {
        let found: Option<u64> = sqlx::query_scalar(&format!("SELECT id FROM {table} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn hydrate_teacher(&self, row: TeacherRow) -> StoreResult<Teacher> {
        let teach_subject: Vec<u64> =
            sqlx::query_scalar("SELECT subject_id FROM teacher_subjects WHERE teacher_id = ? ORDER BY subject_id")
                .bind(row.id)
                .fetch_all(&self.pool)
                .await?;
        let teach_sclass: Vec<u64> =
            sqlx::query_scalar("SELECT sclass_id FROM teacher_classes WHERE teacher_id = ? ORDER BY sclass_id")
                .bind(row.id)
                .fetch_all(&self.pool)
                .await?;
        Ok(row.into_teacher(teach_subject, teach_sclass))
    }

    async fn hydrate_teachers(&self, rows: Vec<TeacherRow>) -> StoreResult<Vec<Teacher>> {
        let mut teachers = Vec::with_capacity(rows.len());
        for row in rows {
            teachers.push(self.hydrate_teacher(row).await?);
        }
        Ok(teachers)
    }

    async fn hydrate_student(&self, row: StudentRow) -> StoreResult<Student> {
        let results: Vec<(u64, f64)> = sqlx::query_as(
            "SELECT subject_id, marks_obtained FROM exam_results WHERE student_id = ? ORDER BY subject_id",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let exam_result = results
            .into_iter()
            .map(|(subject_id, marks_obtained)| ExamResult {
                subject_id,
                marks_obtained,
            })
            .collect();
        Ok(row.into_student(exam_result))
    }

    async fn hydrate_students(&self, rows: Vec<StudentRow>) -> StoreResult<Vec<Student>> {
        let mut students = Vec::with_capacity(rows.len());
        for row in rows {
            students.push(self.hydrate_student(row).await?);
        }
        Ok(students)
    }

    async fn hydrate_homework(&self, row: HomeworkRow) -> StoreResult<Homework> {
        let rows: Vec<SubmissionRow> =
            sqlx::query_as("SELECT * FROM homework_submissions WHERE homework_id = ? ORDER BY submitted_at")
                .bind(row.id)
                .fetch_all(&self.pool)
                .await?;

        let submissions = rows
            .into_iter()
            .map(Submission::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        row.into_homework(submissions)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::Duplicate(duplicate_key(db.message()));
            }
        }
        StoreError::Database(err)
    }
}

/// Extracts the index name from
/// "Duplicate entry '4B-12' for key 'students.uq_students_roll'".
fn duplicate_key(message: &str) -> String {
    let key = message
        .rsplit_once("for key '")
        .map(|(_, rest)| rest.trim_end_matches('\''))
        .unwrap_or(message);
    key.rsplit_once('.').map_or(key, |(_, name)| name).to_string()
}

fn parse_column<T>(value: &str) -> StoreResult<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|e: T::Err| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

fn to_json<T: serde::Serialize>(value: &T) -> StoreResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

// -------------------- Rows --------------------

#[derive(FromRow)]
struct TeacherRow {
    id: u64,
    name: String,
    email: String,
    password: String,
    school_id: u64,
    class_teacher_of: Option<u64>,
    father_name: Option<String>,
    dob: Option<NaiveDate>,
    phone_number: Option<String>,
    emergency_contact: Option<String>,
    address: Option<String>,
}

impl TeacherRow {
    fn into_teacher(self, teach_subject: Vec<u64>, teach_sclass: Vec<u64>) -> Teacher {
        Teacher {
            id: self.id,
            name: self.name,
            email: self.email,
            password: self.password,
            school_id: self.school_id,
            teach_subject,
            teach_sclass,
            class_teacher_of: self.class_teacher_of,
            father_name: self.father_name,
            dob: self.dob,
            phone_number: self.phone_number,
            emergency_contact: self.emergency_contact,
            address: self.address,
        }
    }
}

#[derive(FromRow)]
struct StudentRow {
    id: u64,
    name: String,
    father_name: String,
    email: String,
    roll_num: i32,
    dob: NaiveDate,
    phone_number: String,
    emergency_contact: String,
    address: String,
    password: String,
    sclass_id: u64,
    school_id: u64,
}

impl StudentRow {
    fn into_student(self, exam_result: Vec<ExamResult>) -> Student {
        Student {
            id: self.id,
            name: self.name,
            father_name: self.father_name,
            email: self.email,
            roll_num: self.roll_num,
            dob: self.dob,
            phone_number: self.phone_number,
            emergency_contact: self.emergency_contact,
            address: self.address,
            password: self.password,
            sclass_id: self.sclass_id,
            school_id: self.school_id,
            exam_result,
        }
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    student_id: u64,
    sclass_id: u64,
    date: NaiveDate,
    status: String,
    marked_by: u64,
}

impl TryFrom<AttendanceRow> for Attendance {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> StoreResult<Self> {
        Ok(Attendance {
            id: row.id,
            student_id: row.student_id,
            sclass_id: row.sclass_id,
            date: row.date,
            status: parse_column(&row.status)?,
            marked_by: row.marked_by,
        })
    }
}

#[derive(FromRow)]
struct TimetableRow {
    id: u64,
    school_id: u64,
    class_id: u64,
    day: String,
    period_number: i32,
    subject_id: u64,
    teacher_id: Option<u64>,
}

impl TryFrom<TimetableRow> for TimetableEntry {
    type Error = StoreError;

    fn try_from(row: TimetableRow) -> StoreResult<Self> {
        Ok(TimetableEntry {
            id: row.id,
            school_id: row.school_id,
            class_id: row.class_id,
            day: parse_column(&row.day)?,
            period_number: row.period_number,
            subject_id: row.subject_id,
            teacher_id: row.teacher_id,
        })
    }
}

#[derive(FromRow)]
struct HomeworkRow {
    id: u64,
    title: String,
    description: String,
    subject: String,
    sclass: String,
    school_id: u64,
    teacher_id: u64,
    due_date: DateTime<Utc>,
    assigned_date: DateTime<Utc>,
    status: String,
    attachments: Json<Vec<Attachment>>,
}

impl HomeworkRow {
    fn into_homework(self, submissions: Vec<Submission>) -> StoreResult<Homework> {
        Ok(Homework {
            id: self.id,
            title: self.title,
            description: self.description,
            subject: self.subject,
            sclass: self.sclass,
            school_id: self.school_id,
            teacher_id: self.teacher_id,
            due_date: self.due_date,
            assigned_date: self.assigned_date,
            status: parse_column::<HomeworkStatus>(&self.status)?,
            attachments: self.attachments.0,
            submissions,
        })
    }
}

#[derive(FromRow)]
struct SubmissionRow {
    student_id: u64,
    submitted_at: DateTime<Utc>,
    content: String,
    attachments: Json<Vec<Attachment>>,
    grade: Option<f64>,
    feedback: Option<String>,
    status: String,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = StoreError;

    fn try_from(row: SubmissionRow) -> StoreResult<Self> {
        Ok(Submission {
            student_id: row.student_id,
            submitted_at: row.submitted_at,
            content: row.content,
            attachments: row.attachments.0,
            grade: row.grade,
            feedback: row.feedback,
            status: parse_column(&row.status)?,
        })
    }
}

#[derive(FromRow)]
struct MarksRow {
    id: u64,
    student_id: u64,
    teacher_id: u64,
    subject_id: u64,
    assessment_type: String,
    topic: String,
    date: DateTime<Utc>,
    obtained_marks: f64,
    total_marks: f64,
}

impl TryFrom<MarksRow> for Marks {
    type Error = StoreError;

    fn try_from(row: MarksRow) -> StoreResult<Self> {
        Ok(Marks {
            id: row.id,
            student_id: row.student_id,
            teacher_id: row.teacher_id,
            subject_id: row.subject_id,
            assessment_type: parse_column(&row.assessment_type)?,
            topic: row.topic,
            date: row.date,
            obtained_marks: row.obtained_marks,
            total_marks: row.total_marks,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// -------------------- Store --------------------

#[async_trait]
impl SchoolStore for MySqlStore {
    async fn create_school_admin(&self, school_name: &str, admin: NewAdmin) -> StoreResult<Admin> {
        let mut tx = self.pool.begin().await?;

        let school_id = sqlx::query("INSERT INTO schools (school_name) VALUES (?)")
            .bind(school_name)
            .execute(&mut *tx)
            .await?
            .last_insert_id();

        let id = sqlx::query("INSERT INTO admins (name, email, password, school_id) VALUES (?, ?, ?, ?)")
            .bind(&admin.name)
            .bind(&admin.email)
            .bind(&admin.password)
            .bind(school_id)
            .execute(&mut *tx)
            .await?
            .last_insert_id();

        tx.commit().await?;

        Ok(Admin {
            id,
            name: admin.name,
            email: admin.email,
            password: admin.password,
            school_id,
        })
    }

    async fn find_admin(&self, id: u64) -> StoreResult<Option<Admin>> {
        Ok(sqlx::query_as("SELECT * FROM admins WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>> {
        Ok(sqlx::query_as("SELECT * FROM admins WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_school(&self, id: u64) -> StoreResult<Option<School>> {
        Ok(sqlx::query_as("SELECT * FROM schools WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_class(&self, school_id: u64, sclass_name: &str) -> StoreResult<Sclass> {
        let id = sqlx::query("INSERT INTO sclasses (sclass_name, school_id) VALUES (?, ?)")
            .bind(sclass_name)
            .bind(school_id)
            .execute(&self.pool)
            .await?
            .last_insert_id();

        Ok(Sclass {
            id,
            sclass_name: sclass_name.to_string(),
            school_id,
        })
    }

    async fn find_class(&self, id: u64) -> StoreResult<Option<Sclass>> {
        Ok(sqlx::query_as("SELECT * FROM sclasses WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_class_by_name(&self, school_id: u64, sclass_name: &str) -> StoreResult<Option<Sclass>> {
        Ok(sqlx::query_as("SELECT * FROM sclasses WHERE school_id = ? AND sclass_name = ?")
            .bind(school_id)
            .bind(sclass_name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_classes(&self, school_id: u64) -> StoreResult<Vec<Sclass>> {
        Ok(sqlx::query_as("SELECT * FROM sclasses WHERE school_id = ? ORDER BY id")
            .bind(school_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn delete_classes(&self, scope: Scope) -> StoreResult<u64> {
        let (sql, id) = match scope {
            Scope::Class(id) => ("DELETE FROM sclasses WHERE id = ?", id),
            Scope::School(id) => ("DELETE FROM sclasses WHERE school_id = ?", id),
        };
        Ok(sqlx::query(sql).bind(id).execute(&self.pool).await?.rows_affected())
    }

    async fn insert_subject(&self, subject: NewSubject) -> StoreResult<Subject> {
        let id = sqlx::query(
            "INSERT INTO subjects (sub_name, sub_code, sessions, sclass_id, school_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&subject.sub_name)
        .bind(&subject.sub_code)
        .bind(subject.sessions)
        .bind(subject.sclass_id)
        .bind(subject.school_id)
        .execute(&self.pool)
        .await?
        .last_insert_id();

        Ok(Subject {
            id,
            sub_name: subject.sub_name,
            sub_code: subject.sub_code,
            sessions: subject.sessions,
            sclass_id: subject.sclass_id,
            school_id: subject.school_id,
            teacher_id: None,
        })
    }

    async fn find_subject(&self, id: u64) -> StoreResult<Option<Subject>> {
        Ok(sqlx::query_as("SELECT * FROM subjects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_subjects(&self, scope: Scope) -> StoreResult<Vec<Subject>> {
        let (sql, id) = match scope {
            Scope::Class(id) => ("SELECT * FROM subjects WHERE sclass_id = ? ORDER BY id", id),
            Scope::School(id) => ("SELECT * FROM subjects WHERE school_id = ? ORDER BY id", id),
        };
        Ok(sqlx::query_as(sql).bind(id).fetch_all(&self.pool).await?)
    }

    async fn set_subject_teacher(&self, subject_id: u64, teacher_id: Option<u64>) -> StoreResult<bool> {
        if !self.exists("subjects", subject_id).await? {
            return Ok(false);
        }
        sqlx::query("UPDATE subjects SET teacher_id = ? WHERE id = ?")
            .bind(teacher_id)
            .bind(subject_id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    async fn delete_subject(&self, id: u64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_subjects(&self, scope: Scope) -> StoreResult<u64> {
        let (sql, id) = match scope {
            Scope::Class(id) => ("DELETE FROM subjects WHERE sclass_id = ?", id),
            Scope::School(id) => ("DELETE FROM subjects WHERE school_id = ?", id),
        };
        Ok(sqlx::query(sql).bind(id).execute(&self.pool).await?.rows_affected())
    }

    async fn insert_teacher(&self, teacher: NewTeacher) -> StoreResult<Teacher> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO teachers
            (name, email, password, school_id, father_name, dob, phone_number, emergency_contact, address)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&teacher.name)
        .bind(&teacher.email)
        .bind(&teacher.password)
        .bind(teacher.school_id)
        .bind(&teacher.father_name)
        .bind(teacher.dob)
        .bind(&teacher.phone_number)
        .bind(&teacher.emergency_contact)
        .bind(&teacher.address)
        .execute(&mut *tx)
        .await?
        .last_insert_id();

        for subject_id in &teacher.teach_subject {
            sqlx::query("INSERT IGNORE INTO teacher_subjects (teacher_id, subject_id) VALUES (?, ?)")
                .bind(id)
                .bind(subject_id)
                .execute(&mut *tx)
                .await?;
        }
        for sclass_id in &teacher.teach_sclass {
            sqlx::query("INSERT IGNORE INTO teacher_classes (teacher_id, sclass_id) VALUES (?, ?)")
                .bind(id)
                .bind(sclass_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let mut teach_subject = teacher.teach_subject;
        teach_subject.sort_unstable();
        teach_subject.dedup();
        let mut teach_sclass = teacher.teach_sclass;
        teach_sclass.sort_unstable();
        teach_sclass.dedup();

        Ok(Teacher {
            id,
            name: teacher.name,
            email: teacher.email,
            password: teacher.password,
            school_id: teacher.school_id,
            teach_subject,
            teach_sclass,
            class_teacher_of: None,
            father_name: teacher.father_name,
            dob: teacher.dob,
            phone_number: teacher.phone_number,
            emergency_contact: teacher.emergency_contact,
            address: teacher.address,
        })
    }

    async fn find_teacher(&self, id: u64) -> StoreResult<Option<Teacher>> {
        let row: Option<TeacherRow> = sqlx::query_as("SELECT * FROM teachers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate_teacher(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_teacher_by_email(&self, email: &str) -> StoreResult<Option<Teacher>> {
        let row: Option<TeacherRow> = sqlx::query_as("SELECT * FROM teachers WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate_teacher(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_teachers(&self, scope: Scope) -> StoreResult<Vec<Teacher>> {
        let rows: Vec<TeacherRow> = match scope {
            Scope::Class(id) => {
                sqlx::query_as(
                    r#"
                    SELECT * FROM teachers
                    WHERE class_teacher_of = ?
                       OR id IN (SELECT teacher_id FROM teacher_classes WHERE sclass_id = ?)
                    ORDER BY id
                    "#,
                )
                .bind(id)
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            Scope::School(id) => {
                sqlx::query_as("SELECT * FROM teachers WHERE school_id = ? ORDER BY id")
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        self.hydrate_teachers(rows).await
    }

    async fn update_teacher(&self, id: u64, update: TeacherUpdate) -> StoreResult<Option<Teacher>> {
        SqlUpdate::new("teachers", "id")
            .set("name", update.name)
            .set("email", update.email)
            .set("phone_number", update.phone_number)
            .set("address", update.address)
            .set("emergency_contact", update.emergency_contact)
            .execute(id, &self.pool)
            .await?;
        self.find_teacher(id).await
    }

    async fn add_teacher_class(&self, teacher_id: u64, sclass_id: u64) -> StoreResult<bool> {
        if !self.exists("teachers", teacher_id).await? {
            return Ok(false);
        }
        sqlx::query("INSERT IGNORE INTO teacher_classes (teacher_id, sclass_id) VALUES (?, ?)")
            .bind(teacher_id)
            .bind(sclass_id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    async fn add_teacher_subject(&self, teacher_id: u64, subject_id: u64, sclass_id: u64) -> StoreResult<bool> {
        if !self.exists("teachers", teacher_id).await? {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT IGNORE INTO teacher_subjects (teacher_id, subject_id) VALUES (?, ?)")
            .bind(teacher_id)
            .bind(subject_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT IGNORE INTO teacher_classes (teacher_id, sclass_id) VALUES (?, ?)")
            .bind(teacher_id)
            .bind(sclass_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE subjects SET teacher_id = ? WHERE id = ?")
            .bind(teacher_id)
            .bind(subject_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(true)
    }

    async fn set_class_teacher(&self, teacher_id: u64, sclass_id: Option<u64>) -> StoreResult<bool> {
        if !self.exists("teachers", teacher_id).await? {
            return Ok(false);
        }
        // uq_teachers_class_teacher rejects a second homeroom claim
        sqlx::query("UPDATE teachers SET class_teacher_of = ? WHERE id = ?")
            .bind(sclass_id)
            .bind(teacher_id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    async fn delete_teacher(&self, id: u64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM teachers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_teachers(&self, scope: Scope) -> StoreResult<u64> {
        let result = match scope {
            Scope::Class(id) => {
                sqlx::query(
                    r#"
                    DELETE FROM teachers
                    WHERE class_teacher_of = ?
                       OR id IN (SELECT teacher_id FROM teacher_classes WHERE sclass_id = ?)
                    "#,
                )
                .bind(id)
                .bind(id)
                .execute(&self.pool)
                .await?
            }
            Scope::School(id) => {
                sqlx::query("DELETE FROM teachers WHERE school_id = ?")
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected())
    }

    async fn insert_student(&self, student: NewStudent) -> StoreResult<Student> {
        let id = sqlx::query(
            r#"
            INSERT INTO students
            (name, father_name, email, roll_num, dob, phone_number, emergency_contact, address, password, sclass_id, school_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&student.name)
        .bind(&student.father_name)
        .bind(&student.email)
        .bind(student.roll_num)
        .bind(student.dob)
        .bind(&student.phone_number)
        .bind(&student.emergency_contact)
        .bind(&student.address)
        .bind(&student.password)
        .bind(student.sclass_id)
        .bind(student.school_id)
        .execute(&self.pool)
        .await?
        .last_insert_id();

        Ok(Student {
            id,
            name: student.name,
            father_name: student.father_name,
            email: student.email,
            roll_num: student.roll_num,
            dob: student.dob,
            phone_number: student.phone_number,
            emergency_contact: student.emergency_contact,
            address: student.address,
            password: student.password,
            sclass_id: student.sclass_id,
            school_id: student.school_id,
            exam_result: Vec::new(),
        })
    }

    async fn find_student(&self, id: u64) -> StoreResult<Option<Student>> {
        let row: Option<StudentRow> = sqlx::query_as("SELECT * FROM students WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate_student(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_student_by_email(&self, email: &str) -> StoreResult<Option<Student>> {
        let row: Option<StudentRow> = sqlx::query_as("SELECT * FROM students WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate_student(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_student_by_roll(&self, roll_num: i32, name: &str) -> StoreResult<Option<Student>> {
        let row: Option<StudentRow> =
            sqlx::query_as("SELECT * FROM students WHERE roll_num = ? AND name = ? ORDER BY id LIMIT 1")
                .bind(roll_num)
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate_student(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_students(&self, scope: Scope) -> StoreResult<Vec<Student>> {
        let (sql, id) = match scope {
            Scope::Class(id) => ("SELECT * FROM students WHERE sclass_id = ? ORDER BY id", id),
            Scope::School(id) => ("SELECT * FROM students WHERE school_id = ? ORDER BY id", id),
        };
        let rows: Vec<StudentRow> = sqlx::query_as(sql).bind(id).fetch_all(&self.pool).await?;
        self.hydrate_students(rows).await
    }

    async fn update_student(&self, id: u64, update: StudentUpdate) -> StoreResult<Option<Student>> {
        SqlUpdate::new("students", "id")
            .set("name", update.name)
            .set("father_name", update.father_name)
            .set("email", update.email)
            .set("roll_num", update.roll_num)
            .set("dob", update.dob)
            .set("phone_number", update.phone_number)
            .set("emergency_contact", update.emergency_contact)
            .set("address", update.address)
            .set("password", update.password)
            .set("sclass_id", update.sclass_id)
            .execute(id, &self.pool)
            .await?;
        self.find_student(id).await
    }

    async fn upsert_exam_result(&self, student_id: u64, subject_id: u64, marks_obtained: f64) -> StoreResult<bool> {
        if !self.exists("students", student_id).await? {
            return Ok(false);
        }
        sqlx::query(
            r#"
            INSERT INTO exam_results (student_id, subject_id, marks_obtained)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE marks_obtained = VALUES(marks_obtained)
            "#,
        )
        .bind(student_id)
        .bind(subject_id)
        .bind(marks_obtained)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    async fn delete_student(&self, id: u64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_students(&self, scope: Scope) -> StoreResult<u64> {
        let (sql, id) = match scope {
            Scope::Class(id) => ("DELETE FROM students WHERE sclass_id = ?", id),
            Scope::School(id) => ("DELETE FROM students WHERE school_id = ?", id),
        };
        Ok(sqlx::query(sql).bind(id).execute(&self.pool).await?.rows_affected())
    }

    async fn upsert_attendance(
        &self,
        sclass_id: u64,
        date: NaiveDate,
        marked_by: u64,
        marks: &[AttendanceMark],
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for mark in marks {
            sqlx::query(
                r#"
                INSERT INTO attendance (student_id, sclass_id, date, status, marked_by)
                VALUES (?, ?, ?, ?, ?)
                ON DUPLICATE KEY UPDATE status = VALUES(status), marked_by = VALUES(marked_by)
                "#,
            )
            .bind(mark.student_id)
            .bind(sclass_id)
            .bind(date)
            .bind(mark.status.to_string())
            .bind(marked_by)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_class_attendance(&self, sclass_id: u64, date: Option<NaiveDate>) -> StoreResult<Vec<Attendance>> {
        let rows: Vec<AttendanceRow> = match date {
            Some(date) => {
                sqlx::query_as("SELECT * FROM attendance WHERE sclass_id = ? AND date = ? ORDER BY id")
                    .bind(sclass_id)
                    .bind(date)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM attendance WHERE sclass_id = ? ORDER BY id")
                    .bind(sclass_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        convert_all(rows)
    }

    async fn list_student_attendance(&self, student_id: u64) -> StoreResult<Vec<Attendance>> {
        let rows: Vec<AttendanceRow> =
            sqlx::query_as("SELECT * FROM attendance WHERE student_id = ? ORDER BY date, id")
                .bind(student_id)
                .fetch_all(&self.pool)
                .await?;
        convert_all(rows)
    }

    async fn delete_attendance(&self, scope: Scope) -> StoreResult<u64> {
        let result = match scope {
            Scope::Class(id) => {
                sqlx::query("DELETE FROM attendance WHERE sclass_id = ?")
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
            Scope::School(id) => {
                sqlx::query(
                    r#"
                    DELETE FROM attendance
                    WHERE sclass_id IN (SELECT id FROM sclasses WHERE school_id = ?)
                       OR student_id IN (SELECT id FROM students WHERE school_id = ?)
                    "#,
                )
                .bind(id)
                .bind(id)
                .execute(&self.pool)
                .await?
            }
        };
        Ok(result.rows_affected())
    }

    async fn upsert_timetable(&self, school_id: u64, entries: &[SlotAssignment]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO timetable (school_id, class_id, day, period_number, subject_id, teacher_id)
                VALUES (?, ?, ?, ?, ?, ?)
                ON DUPLICATE KEY UPDATE subject_id = VALUES(subject_id), teacher_id = VALUES(teacher_id)
                "#,
            )
            .bind(school_id)
            .bind(entry.class_id)
            .bind(entry.day.to_string())
            .bind(entry.period_number)
            .bind(entry.subject_id)
            .bind(entry.teacher_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_timetable_entry(&self, id: u64) -> StoreResult<Option<TimetableEntry>> {
        let row: Option<TimetableRow> = sqlx::query_as("SELECT * FROM timetable WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TimetableEntry::try_from).transpose()
    }

    async fn list_timetable(&self, scope: Scope) -> StoreResult<Vec<TimetableEntry>> {
        let (sql, id) = match scope {
            Scope::Class(id) => ("SELECT * FROM timetable WHERE class_id = ? ORDER BY id", id),
            Scope::School(id) => ("SELECT * FROM timetable WHERE school_id = ? ORDER BY id", id),
        };
        let rows: Vec<TimetableRow> = sqlx::query_as(sql).bind(id).fetch_all(&self.pool).await?;
        convert_all(rows)
    }

    async fn update_timetable_entry(&self, id: u64, patch: TimetablePatch) -> StoreResult<Option<TimetableEntry>> {
        SqlUpdate::new("timetable", "id")
            .set("day", patch.day.map(|d| d.to_string()))
            .set("period_number", patch.period_number)
            .set("subject_id", patch.subject_id)
            .set("teacher_id", patch.teacher_id)
            .execute(id, &self.pool)
            .await?;
        self.find_timetable_entry(id).await
    }

    async fn delete_timetable_entry(&self, id: u64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM timetable WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_timetable(&self, scope: Scope) -> StoreResult<u64> {
        let (sql, id) = match scope {
            Scope::Class(id) => ("DELETE FROM timetable WHERE class_id = ?", id),
            Scope::School(id) => ("DELETE FROM timetable WHERE school_id = ?", id),
        };
        Ok(sqlx::query(sql).bind(id).execute(&self.pool).await?.rows_affected())
    }

    async fn insert_homework(&self, homework: NewHomework) -> StoreResult<Homework> {
        let id = sqlx::query(
            r#"
            INSERT INTO homework
            (title, description, subject, sclass, school_id, teacher_id, due_date, assigned_date, status, attachments)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&homework.title)
        .bind(&homework.description)
        .bind(&homework.subject)
        .bind(&homework.sclass)
        .bind(homework.school_id)
        .bind(homework.teacher_id)
        .bind(homework.due_date)
        .bind(homework.assigned_date)
        .bind(HomeworkStatus::Active.to_string())
        .bind(Json(&homework.attachments))
        .execute(&self.pool)
        .await?
        .last_insert_id();

        Ok(Homework {
            id,
            title: homework.title,
            description: homework.description,
            subject: homework.subject,
            sclass: homework.sclass,
            school_id: homework.school_id,
            teacher_id: homework.teacher_id,
            due_date: homework.due_date,
            assigned_date: homework.assigned_date,
            status: HomeworkStatus::Active,
            attachments: homework.attachments,
            submissions: Vec::new(),
        })
    }

    async fn find_homework(&self, id: u64) -> StoreResult<Option<Homework>> {
        let row: Option<HomeworkRow> = sqlx::query_as("SELECT * FROM homework WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate_homework(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_homework(&self, filter: HomeworkFilter) -> StoreResult<Vec<Homework>> {
        let rows: Vec<HomeworkRow> = match filter {
            HomeworkFilter::Class { school_id, sclass } => {
                sqlx::query_as("SELECT * FROM homework WHERE school_id = ? AND sclass = ? ORDER BY id")
                    .bind(school_id)
                    .bind(sclass)
                    .fetch_all(&self.pool)
                    .await?
            }
            HomeworkFilter::Teacher(teacher_id) => {
                sqlx::query_as("SELECT * FROM homework WHERE teacher_id = ? ORDER BY id")
                    .bind(teacher_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut homework = Vec::with_capacity(rows.len());
        for row in rows {
            homework.push(self.hydrate_homework(row).await?);
        }
        Ok(homework)
    }

    async fn update_homework(&self, id: u64, patch: HomeworkPatch) -> StoreResult<Option<Homework>> {
        let attachments = patch.attachments.as_ref().map(to_json).transpose()?;
        SqlUpdate::new("homework", "id")
            .set("title", patch.title)
            .set("description", patch.description)
            .set("subject", patch.subject)
            .set("sclass", patch.sclass)
            .set("due_date", patch.due_date)
            .set("status", patch.status.map(|s| s.to_string()))
            .set("attachments", attachments)
            .execute(id, &self.pool)
            .await?;
        self.find_homework(id).await
    }

    async fn delete_homework(&self, id: u64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM homework WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_school_homework(&self, school_id: u64) -> StoreResult<u64> {
        Ok(sqlx::query("DELETE FROM homework WHERE school_id = ?")
            .bind(school_id)
            .execute(&self.pool)
            .await?
            .rows_affected())
    }

    async fn insert_submission(&self, homework_id: u64, submission: Submission) -> StoreResult<bool> {
        if !self.exists("homework", homework_id).await? {
            return Ok(false);
        }
        sqlx::query(
            r#"
            INSERT INTO homework_submissions
            (homework_id, student_id, submitted_at, content, attachments, grade, feedback, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(homework_id)
        .bind(submission.student_id)
        .bind(submission.submitted_at)
        .bind(&submission.content)
        .bind(Json(&submission.attachments))
        .bind(submission.grade)
        .bind(&submission.feedback)
        .bind(submission.status.to_string())
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    async fn grade_submission(
        &self,
        homework_id: u64,
        student_id: u64,
        grade: f64,
        feedback: Option<String>,
    ) -> StoreResult<bool> {
        let found: Option<u64> = sqlx::query_scalar(
            "SELECT student_id FROM homework_submissions WHERE homework_id = ? AND student_id = ?",
        )
        .bind(homework_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        if found.is_none() {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE homework_submissions SET grade = ?, feedback = ?, status = ? WHERE homework_id = ? AND student_id = ?",
        )
        .bind(grade)
        .bind(feedback)
        .bind(SubmissionStatus::Graded.to_string())
        .bind(homework_id)
        .bind(student_id)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    async fn insert_marks(&self, marks: NewMarks) -> StoreResult<Marks> {
        let id = sqlx::query(
            r#"
            INSERT INTO marks
            (student_id, teacher_id, subject_id, assessment_type, topic, date, obtained_marks, total_marks)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(marks.student_id)
        .bind(marks.teacher_id)
        .bind(marks.subject_id)
        .bind(marks.assessment_type.to_string())
        .bind(&marks.topic)
        .bind(marks.date)
        .bind(marks.obtained_marks)
        .bind(marks.total_marks)
        .execute(&self.pool)
        .await?
        .last_insert_id();

        Ok(Marks {
            id,
            student_id: marks.student_id,
            teacher_id: marks.teacher_id,
            subject_id: marks.subject_id,
            assessment_type: marks.assessment_type,
            topic: marks.topic,
            date: marks.date,
            obtained_marks: marks.obtained_marks,
            total_marks: marks.total_marks,
        })
    }

    async fn find_marks(&self, id: u64) -> StoreResult<Option<Marks>> {
        let row: Option<MarksRow> = sqlx::query_as("SELECT * FROM marks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Marks::try_from).transpose()
    }

    async fn list_marks(&self, filter: MarksFilter) -> StoreResult<Vec<Marks>> {
        let (sql, id) = match filter {
            MarksFilter::Teacher(id) => ("SELECT * FROM marks WHERE teacher_id = ? ORDER BY date DESC, id", id),
            MarksFilter::Student(id) => ("SELECT * FROM marks WHERE student_id = ? ORDER BY date DESC, id", id),
            MarksFilter::Subject(id) => ("SELECT * FROM marks WHERE subject_id = ? ORDER BY date DESC, id", id),
        };
        let rows: Vec<MarksRow> = sqlx::query_as(sql).bind(id).fetch_all(&self.pool).await?;
        convert_all(rows)
    }

    async fn update_marks(&self, id: u64, patch: MarksPatch) -> StoreResult<Option<Marks>> {
        SqlUpdate::new("marks", "id")
            .set("obtained_marks", patch.obtained_marks)
            .set("total_marks", patch.total_marks)
            .set("topic", patch.topic)
            .set("assessment_type", patch.assessment_type.map(|t| t.to_string()))
            .set("date", patch.date)
            .execute(id, &self.pool)
            .await?;
        self.find_marks(id).await
    }

    async fn delete_marks(&self, id: u64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM marks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_strips_table_prefix() {
        let message = "Duplicate entry '7-12-3' for key 'students.uq_students_roll'";
        assert_eq!(duplicate_key(message), "uq_students_roll");
    }

    #[test]
    fn duplicate_key_without_table_prefix() {
        let message = "Duplicate entry 'a@b.c' for key 'uq_admins_email'";
        assert_eq!(duplicate_key(message), "uq_admins_email");
    }
}
