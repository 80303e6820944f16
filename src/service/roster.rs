//! Classes, subjects, students and teachers of a school, and the
//! denormalized views handed back to clients.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::{auth::AuthUser, password::hash_password},
    error::ApiError,
    model::{
        admin::Admin,
        role::Role,
        school::School,
        sclass::Sclass,
        student::{NewStudent, Student, StudentUpdate},
        subject::{NewSubject, Subject},
        teacher::{NewTeacher, Teacher, TeacherUpdate},
    },
    service::cascade::{CascadeReport, CascadeSaga},
    store::{SchoolStore, Scope},
};

pub const MIN_PASSWORD_LEN: usize = 6;

// -------------------- Views --------------------

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassRef {
    pub id: u64,
    pub sclass_name: String,
}

impl From<&Sclass> for ClassRef {
    fn from(c: &Sclass) -> Self {
        Self {
            id: c.id,
            sclass_name: c.sclass_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRef {
    pub id: u64,
    pub sub_name: String,
    pub sub_code: Option<String>,
    pub sessions: Option<i32>,
    pub sclass_id: u64,
}

impl From<&Subject> for SubjectRef {
    fn from(s: &Subject) -> Self {
        Self {
            id: s.id,
            sub_name: s.sub_name.clone(),
            sub_code: s.sub_code.clone(),
            sessions: s.sessions,
            sclass_id: s.sclass_id,
        }
    }
}

/// Id and display name of a person referenced from another record.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonRef {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminView {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub school_id: u64,
    pub school_name: String,
}

impl AdminView {
    pub fn new(admin: &Admin, school: &School) -> Self {
        Self {
            id: admin.id,
            name: admin.name.clone(),
            email: admin.email.clone(),
            school_id: school.id,
            school_name: school.school_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultView {
    pub subject_id: u64,
    pub sub_name: Option<String>,
    pub marks_obtained: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    pub id: u64,
    pub name: String,
    pub father_name: String,
    pub email: String,
    pub roll_num: i32,
    #[schema(value_type = String, format = "date")]
    pub dob: NaiveDate,
    pub phone_number: String,
    pub emergency_contact: String,
    pub address: String,
    pub sclass: Option<ClassRef>,
    pub school: Option<School>,
    pub exam_result: Vec<ExamResultView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherView {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub school: Option<School>,
    pub teach_subject: Vec<SubjectRef>,
    pub teach_sclass: Vec<ClassRef>,
    pub class_teacher_of: Option<ClassRef>,
    pub father_name: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub dob: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub emergency_contact: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassDetail {
    pub id: u64,
    pub sclass_name: String,
    pub school: Option<School>,
    pub teachers: Vec<PersonRef>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDetail {
    #[serde(flatten)]
    pub subject: Subject,
    pub sclass: Option<ClassRef>,
    pub teacher: Option<PersonRef>,
}

pub async fn student_view(store: &dyn SchoolStore, student: &Student) -> Result<StudentView, ApiError> {
    let sclass = store.find_class(student.sclass_id).await?;
    let school = store.find_school(student.school_id).await?;

    let mut exam_result = Vec::with_capacity(student.exam_result.len());
    for result in &student.exam_result {
        let subject = store.find_subject(result.subject_id).await?;
        exam_result.push(ExamResultView {
            subject_id: result.subject_id,
            sub_name: subject.map(|s| s.sub_name),
            marks_obtained: result.marks_obtained,
        });
    }

    Ok(StudentView {
        id: student.id,
        name: student.name.clone(),
        father_name: student.father_name.clone(),
        email: student.email.clone(),
        roll_num: student.roll_num,
        dob: student.dob,
        phone_number: student.phone_number.clone(),
        emergency_contact: student.emergency_contact.clone(),
        address: student.address.clone(),
        sclass: sclass.as_ref().map(ClassRef::from),
        school,
        exam_result,
    })
}

pub async fn teacher_view(store: &dyn SchoolStore, teacher: &Teacher) -> Result<TeacherView, ApiError> {
    let school = store.find_school(teacher.school_id).await?;

    let mut teach_subject = Vec::with_capacity(teacher.teach_subject.len());
    for id in &teacher.teach_subject {
        if let Some(subject) = store.find_subject(*id).await? {
            teach_subject.push(SubjectRef::from(&subject));
        }
    }

    let mut teach_sclass = Vec::with_capacity(teacher.teach_sclass.len());
    for id in &teacher.teach_sclass {
        if let Some(sclass) = store.find_class(*id).await? {
            teach_sclass.push(ClassRef::from(&sclass));
        }
    }

    let class_teacher_of = match teacher.class_teacher_of {
        Some(id) => store.find_class(id).await?.as_ref().map(ClassRef::from),
        None => None,
    };

    Ok(TeacherView {
        id: teacher.id,
        name: teacher.name.clone(),
        email: teacher.email.clone(),
        school,
        teach_subject,
        teach_sclass,
        class_teacher_of,
        father_name: teacher.father_name.clone(),
        dob: teacher.dob,
        phone_number: teacher.phone_number.clone(),
        emergency_contact: teacher.emergency_contact.clone(),
        address: teacher.address.clone(),
    })
}

// -------------------- Lookups --------------------

/// Resolves the `adminID` every client request uses to name a school.
pub async fn school_of_admin(store: &dyn SchoolStore, admin_id: u64) -> Result<(Admin, School), ApiError> {
    let admin = store
        .find_admin(admin_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Admin not found"))?;
    let school = store
        .find_school(admin.school_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Admin does not have a school assigned"))?;
    Ok((admin, school))
}

/// School the authenticated principal belongs to.
pub async fn principal_school(store: &dyn SchoolStore, user: &AuthUser) -> Result<u64, ApiError> {
    let school_id = match user.role {
        Role::Admin => store.find_admin(user.principal_id).await?.map(|a| a.school_id),
        Role::Teacher => store.find_teacher(user.principal_id).await?.map(|t| t.school_id),
        Role::Student => store.find_student(user.principal_id).await?.map(|s| s.school_id),
    };
    school_id.ok_or_else(|| ApiError::auth("Account no longer exists"))
}

pub async fn find_class(store: &dyn SchoolStore, sclass_id: u64) -> Result<Sclass, ApiError> {
    store
        .find_class(sclass_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Class not found"))
}

pub async fn find_student(store: &dyn SchoolStore, student_id: u64) -> Result<Student, ApiError> {
    store
        .find_student(student_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Student not found"))
}

pub async fn find_teacher(store: &dyn SchoolStore, teacher_id: u64) -> Result<Teacher, ApiError> {
    store
        .find_teacher(teacher_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Teacher not found"))
}

pub async fn find_subject(store: &dyn SchoolStore, subject_id: u64) -> Result<Subject, ApiError> {
    store
        .find_subject(subject_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Subject not found"))
}

/// Accepts a class id or a class name within the school.
async fn resolve_class(store: &dyn SchoolStore, school_id: u64, reference: &str) -> Result<Sclass, ApiError> {
    let reference = reference.trim();

    if let Ok(id) = reference.parse::<u64>() {
        if let Some(sclass) = store.find_class(id).await? {
            if sclass.school_id == school_id {
                return Ok(sclass);
            }
        }
    }

    store
        .find_class_by_name(school_id, reference)
        .await?
        .ok_or_else(|| ApiError::not_found("Class not found. Please check class name."))
}

/// Emails are unique across admins, teachers and students so that login
/// resolves to exactly one principal. Each table's unique index still has
/// the final word for concurrent registrations into the same table.
pub async fn ensure_email_free(
    store: &dyn SchoolStore,
    email: &str,
    owner: Option<(Role, u64)>,
) -> Result<(), ApiError> {
    let taken_by = |role: Role, id: u64| owner != Some((role, id));

    let admin = store.find_admin_by_email(email).await?;
    let teacher = store.find_teacher_by_email(email).await?;
    let student = store.find_student_by_email(email).await?;

    let taken = admin.is_some_and(|a| taken_by(Role::Admin, a.id))
        || teacher.is_some_and(|t| taken_by(Role::Teacher, t.id))
        || student.is_some_and(|s| taken_by(Role::Student, s.id));

    if taken {
        return Err(ApiError::conflict("Email already exists"));
    }
    Ok(())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

fn require_fields(fields: &[(&str, bool)]) -> Result<(), ApiError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

// -------------------- Classes --------------------

pub async fn create_class(store: &dyn SchoolStore, admin_id: u64, sclass_name: &str) -> Result<Sclass, ApiError> {
    let (_, school) = school_of_admin(store, admin_id).await?;

    let name = sclass_name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Class name is required"));
    }

    // uq_sclasses_school_name settles concurrent creates
    let sclass = store.insert_class(school.id, name).await?;
    tracing::info!(sclass_id = sclass.id, school_id = school.id, "Class created");
    Ok(sclass)
}

pub async fn list_classes(store: &dyn SchoolStore, admin_id: u64) -> Result<Vec<Sclass>, ApiError> {
    let (_, school) = school_of_admin(store, admin_id).await?;
    Ok(store.list_classes(school.id).await?)
}

pub async fn class_detail(store: &dyn SchoolStore, sclass_id: u64) -> Result<ClassDetail, ApiError> {
    let sclass = find_class(store, sclass_id).await?;
    let school = store.find_school(sclass.school_id).await?;
    let teachers = store
        .list_teachers(Scope::Class(sclass.id))
        .await?
        .into_iter()
        .map(|t| PersonRef {
            id: t.id,
            name: t.name,
            email: Some(t.email),
        })
        .collect();

    Ok(ClassDetail {
        id: sclass.id,
        sclass_name: sclass.sclass_name,
        school,
        teachers,
    })
}

pub async fn class_students(store: &dyn SchoolStore, sclass_id: u64) -> Result<Vec<Student>, ApiError> {
    let sclass = find_class(store, sclass_id).await?;
    Ok(store.list_students(Scope::Class(sclass.id)).await?)
}

pub async fn delete_class(store: &dyn SchoolStore, sclass_id: u64) -> Result<CascadeReport, ApiError> {
    let sclass = find_class(store, sclass_id).await?;
    CascadeSaga::for_class(store, sclass.id).run().await
}

/// Removes every class of the school with everything that hangs off them.
/// The admin account and the school record stay.
pub async fn delete_school(store: &dyn SchoolStore, admin_id: u64) -> Result<CascadeReport, ApiError> {
    let (_, school) = school_of_admin(store, admin_id).await?;
    CascadeSaga::for_school(store, school.id).run().await
}

// -------------------- Subjects --------------------

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectInput {
    #[schema(example = "Mathematics")]
    pub sub_name: String,
    #[schema(example = "MTH-4")]
    pub sub_code: Option<String>,
    #[schema(example = 5)]
    pub sessions: Option<i32>,
}

pub async fn create_subjects(
    store: &dyn SchoolStore,
    admin_id: u64,
    sclass_id: u64,
    subjects: Vec<SubjectInput>,
) -> Result<Vec<Subject>, ApiError> {
    if subjects.is_empty() {
        return Err(ApiError::validation("At least one subject is required"));
    }
    if subjects.iter().any(|s| s.sub_name.trim().is_empty()) {
        return Err(ApiError::validation("Subject name is required"));
    }

    let (_, school) = school_of_admin(store, admin_id).await?;
    let sclass = find_class(store, sclass_id).await?;
    if sclass.school_id != school.id {
        return Err(ApiError::not_found("Class not found"));
    }

    let mut created = Vec::with_capacity(subjects.len());
    for input in subjects {
        let subject = store
            .insert_subject(NewSubject {
                sub_name: input.sub_name.trim().to_string(),
                sub_code: input.sub_code,
                sessions: input.sessions,
                sclass_id: sclass.id,
                school_id: school.id,
            })
            .await?;
        created.push(subject);
    }
    Ok(created)
}

pub async fn class_subjects(store: &dyn SchoolStore, sclass_id: u64) -> Result<Vec<Subject>, ApiError> {
    Ok(store.list_subjects(Scope::Class(sclass_id)).await?)
}

pub async fn school_subjects(store: &dyn SchoolStore, admin_id: u64) -> Result<Vec<Subject>, ApiError> {
    let (_, school) = school_of_admin(store, admin_id).await?;
    Ok(store.list_subjects(Scope::School(school.id)).await?)
}

/// Subjects of the class nobody teaches yet.
pub async fn free_subjects(store: &dyn SchoolStore, sclass_id: u64) -> Result<Vec<Subject>, ApiError> {
    let subjects = store.list_subjects(Scope::Class(sclass_id)).await?;
    Ok(subjects.into_iter().filter(|s| s.teacher_id.is_none()).collect())
}

pub async fn subject_detail(store: &dyn SchoolStore, subject_id: u64) -> Result<SubjectDetail, ApiError> {
    let subject = find_subject(store, subject_id).await?;
    let sclass = store.find_class(subject.sclass_id).await?;
    let teacher = match subject.teacher_id {
        Some(id) => store.find_teacher(id).await?.map(|t| PersonRef {
            id: t.id,
            name: t.name,
            email: None,
        }),
        None => None,
    };

    Ok(SubjectDetail {
        sclass: sclass.as_ref().map(ClassRef::from),
        teacher,
        subject,
    })
}

pub async fn delete_subject(store: &dyn SchoolStore, subject_id: u64) -> Result<(), ApiError> {
    if !store.delete_subject(subject_id).await? {
        return Err(ApiError::not_found("Subject not found"));
    }
    Ok(())
}

// -------------------- Students --------------------

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentRegistration {
    #[schema(example = "Areeba Ali")]
    pub name: Option<String>,
    #[schema(example = "Junaid Ali")]
    pub father_name: Option<String>,
    #[schema(example = "areeba@example.com")]
    pub email: Option<String>,
    #[schema(example = "secret123")]
    pub password: Option<String>,
    #[schema(example = 2)]
    pub roll_num: Option<i32>,
    #[schema(value_type = Option<String>, format = "date", example = "2011-05-12")]
    pub dob: Option<NaiveDate>,
    #[schema(example = "03001234567")]
    pub phone_number: Option<String>,
    #[schema(example = "03112223344")]
    pub emergency_contact: Option<String>,
    #[schema(example = "House #20, Street 7, Lahore")]
    pub address: Option<String>,
    /// Class id or class name within the school.
    #[schema(example = "4B")]
    pub sclass_name: Option<String>,
    #[serde(rename = "adminID")]
    #[schema(example = 1)]
    pub admin_id: Option<u64>,
}

pub async fn create_student(store: &dyn SchoolStore, input: StudentRegistration) -> Result<StudentView, ApiError> {
    require_fields(&[
        ("name", !is_blank(&input.name)),
        ("fatherName", !is_blank(&input.father_name)),
        ("email", !is_blank(&input.email)),
        ("password", !is_blank(&input.password)),
        ("rollNum", input.roll_num.is_some()),
        ("dob", input.dob.is_some()),
        ("phoneNumber", !is_blank(&input.phone_number)),
        ("emergencyContact", !is_blank(&input.emergency_contact)),
        ("address", !is_blank(&input.address)),
        ("sclassName", !is_blank(&input.sclass_name)),
        ("adminID", input.admin_id.is_some()),
    ])?;

    let password = input.password.unwrap_or_default();
    validate_password(&password)?;

    let (Some(admin_id), Some(roll_num), Some(dob)) = (input.admin_id, input.roll_num, input.dob) else {
        return Err(ApiError::validation("Missing required fields"));
    };

    let (_, school) = school_of_admin(store, admin_id).await?;
    let sclass = resolve_class(store, school.id, input.sclass_name.as_deref().unwrap_or_default()).await?;

    let email = trimmed(input.email);
    ensure_email_free(store, &email, None).await?;

    // uq_students_roll and uq_students_email are authoritative
    let student = store
        .insert_student(NewStudent {
            name: trimmed(input.name),
            father_name: trimmed(input.father_name),
            email,
            roll_num,
            dob,
            phone_number: trimmed(input.phone_number),
            emergency_contact: trimmed(input.emergency_contact),
            address: trimmed(input.address),
            password: hash_password(&password)?,
            sclass_id: sclass.id,
            school_id: school.id,
        })
        .await?;

    tracing::info!(student_id = student.id, sclass_id = sclass.id, "Student registered");
    student_view(store, &student).await
}

pub async fn list_students(store: &dyn SchoolStore, admin_id: u64) -> Result<Vec<StudentView>, ApiError> {
    let (_, school) = school_of_admin(store, admin_id).await?;
    let students = store.list_students(Scope::School(school.id)).await?;
    let classes: HashMap<u64, Sclass> = store
        .list_classes(school.id)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    Ok(students
        .into_iter()
        .map(|s| StudentView {
            sclass: classes.get(&s.sclass_id).map(ClassRef::from),
            school: Some(school.clone()),
            exam_result: s
                .exam_result
                .iter()
                .map(|r| ExamResultView {
                    subject_id: r.subject_id,
                    sub_name: None,
                    marks_obtained: r.marks_obtained,
                })
                .collect(),
            id: s.id,
            name: s.name,
            father_name: s.father_name,
            email: s.email,
            roll_num: s.roll_num,
            dob: s.dob,
            phone_number: s.phone_number,
            emergency_contact: s.emergency_contact,
            address: s.address,
        })
        .collect())
}

pub async fn student_detail(store: &dyn SchoolStore, student_id: u64) -> Result<StudentView, ApiError> {
    let student = store
        .find_student(student_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No student found"))?;
    student_view(store, &student).await
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    pub name: Option<String>,
    pub father_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub roll_num: Option<i32>,
    #[schema(value_type = Option<String>, format = "date")]
    pub dob: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub emergency_contact: Option<String>,
    pub address: Option<String>,
    /// Class id or class name within the student's school.
    pub sclass_name: Option<String>,
}

pub async fn update_student(
    store: &dyn SchoolStore,
    student_id: u64,
    patch: StudentPatch,
) -> Result<StudentView, ApiError> {
    let student = find_student(store, student_id).await?;

    let password = match patch.password.as_deref() {
        Some(p) => {
            validate_password(p)?;
            Some(hash_password(p)?)
        }
        None => None,
    };

    let sclass_id = match patch.sclass_name.as_deref() {
        Some(reference) => Some(resolve_class(store, student.school_id, reference).await?.id),
        None => None,
    };

    let email = patch.email.map(|e| e.trim().to_string());
    if let Some(email) = &email {
        ensure_email_free(store, email, Some((Role::Student, student.id))).await?;
    }

    let update = StudentUpdate {
        name: patch.name,
        father_name: patch.father_name,
        email,
        roll_num: patch.roll_num,
        dob: patch.dob,
        phone_number: patch.phone_number,
        emergency_contact: patch.emergency_contact,
        address: patch.address,
        password,
        sclass_id,
    };
    if update.is_empty() {
        return Err(ApiError::validation("No fields provided for update"));
    }

    let updated = store
        .update_student(student.id, update)
        .await?
        .ok_or_else(|| ApiError::not_found("Student not found"))?;
    student_view(store, &updated).await
}

pub async fn update_exam_result(
    store: &dyn SchoolStore,
    student_id: u64,
    subject_id: u64,
    marks_obtained: f64,
) -> Result<StudentView, ApiError> {
    if marks_obtained < 0.0 {
        return Err(ApiError::validation("Marks cannot be negative"));
    }
    find_subject(store, subject_id).await?;

    if !store.upsert_exam_result(student_id, subject_id, marks_obtained).await? {
        return Err(ApiError::not_found("Student not found"));
    }
    let student = find_student(store, student_id).await?;
    student_view(store, &student).await
}

pub async fn delete_student(store: &dyn SchoolStore, student_id: u64) -> Result<(), ApiError> {
    if !store.delete_student(student_id).await? {
        return Err(ApiError::not_found("Student not found"));
    }
    tracing::info!(student_id, "Student deleted");
    Ok(())
}

// -------------------- Teachers --------------------

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherRegistration {
    #[schema(example = "Sara Khan")]
    pub name: Option<String>,
    #[schema(example = "sara@school.edu")]
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "adminID")]
    #[schema(example = 1)]
    pub admin_id: Option<u64>,
    #[serde(default)]
    pub teach_subject: Vec<u64>,
    #[serde(default)]
    pub teach_sclass: Vec<u64>,
    pub father_name: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub dob: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub emergency_contact: Option<String>,
    pub address: Option<String>,
}

pub async fn create_teacher(store: &dyn SchoolStore, input: TeacherRegistration) -> Result<TeacherView, ApiError> {
    require_fields(&[
        ("name", !is_blank(&input.name)),
        ("email", !is_blank(&input.email)),
        ("password", !is_blank(&input.password)),
        ("adminID", input.admin_id.is_some()),
    ])?;
    let password = input.password.unwrap_or_default();
    validate_password(&password)?;

    let Some(admin_id) = input.admin_id else {
        return Err(ApiError::validation("Admin ID is required"));
    };
    let (_, school) = school_of_admin(store, admin_id).await?;

    for subject_id in &input.teach_subject {
        let subject = find_subject(store, *subject_id).await?;
        if subject.school_id != school.id {
            return Err(ApiError::not_found("Subject not found"));
        }
    }
    for sclass_id in &input.teach_sclass {
        let sclass = find_class(store, *sclass_id).await?;
        if sclass.school_id != school.id {
            return Err(ApiError::not_found("Class not found"));
        }
    }

    let email = trimmed(input.email);
    ensure_email_free(store, &email, None).await?;

    let teacher = store
        .insert_teacher(NewTeacher {
            name: trimmed(input.name),
            email,
            password: hash_password(&password)?,
            school_id: school.id,
            teach_subject: input.teach_subject,
            teach_sclass: input.teach_sclass,
            father_name: input.father_name,
            dob: input.dob,
            phone_number: input.phone_number,
            emergency_contact: input.emergency_contact,
            address: input.address,
        })
        .await?;

    for subject_id in &teacher.teach_subject {
        store.set_subject_teacher(*subject_id, Some(teacher.id)).await?;
    }

    tracing::info!(teacher_id = teacher.id, school_id = school.id, "Teacher registered");
    teacher_view(store, &teacher).await
}

pub async fn list_teachers(store: &dyn SchoolStore, admin_id: u64) -> Result<Vec<TeacherView>, ApiError> {
    let (_, school) = school_of_admin(store, admin_id).await?;
    let teachers = store.list_teachers(Scope::School(school.id)).await?;

    let mut views = Vec::with_capacity(teachers.len());
    for teacher in &teachers {
        views.push(teacher_view(store, teacher).await?);
    }
    Ok(views)
}

pub async fn teacher_detail(store: &dyn SchoolStore, teacher_id: u64) -> Result<TeacherView, ApiError> {
    let teacher = store
        .find_teacher(teacher_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No teacher found"))?;
    teacher_view(store, &teacher).await
}

pub async fn update_teacher(
    store: &dyn SchoolStore,
    teacher_id: u64,
    mut update: TeacherUpdate,
) -> Result<TeacherView, ApiError> {
    let teacher = find_teacher(store, teacher_id).await?;

    if let Some(email) = update.email.as_mut() {
        *email = email.trim().to_string();
        ensure_email_free(store, email, Some((Role::Teacher, teacher.id))).await?;
    }
    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::validation("Name cannot be empty"));
    }

    let updated = store
        .update_teacher(teacher.id, update)
        .await?
        .ok_or_else(|| ApiError::not_found("Teacher not found"))?;
    teacher_view(store, &updated).await
}

pub async fn delete_teacher(store: &dyn SchoolStore, teacher_id: u64) -> Result<(), ApiError> {
    if !store.delete_teacher(teacher_id).await? {
        return Err(ApiError::not_found("Teacher not found"));
    }
    tracing::info!(teacher_id, "Teacher deleted");
    Ok(())
}

pub async fn assign_class(store: &dyn SchoolStore, teacher_id: u64, sclass_id: u64) -> Result<TeacherView, ApiError> {
    let teacher = find_teacher(store, teacher_id).await?;
    let sclass = find_class(store, sclass_id).await?;
    if sclass.school_id != teacher.school_id {
        return Err(ApiError::validation("Class belongs to another school"));
    }

    if !store.add_teacher_class(teacher.id, sclass.id).await? {
        return Err(ApiError::not_found("Teacher not found"));
    }
    teacher_detail(store, teacher.id).await
}

pub async fn assign_subject(store: &dyn SchoolStore, teacher_id: u64, subject_id: u64) -> Result<TeacherView, ApiError> {
    let subject = find_subject(store, subject_id).await?;
    let teacher = find_teacher(store, teacher_id).await?;
    if subject.school_id != teacher.school_id {
        return Err(ApiError::validation("Subject belongs to another school"));
    }

    if !store.add_teacher_subject(teacher.id, subject.id, subject.sclass_id).await? {
        return Err(ApiError::not_found("Teacher not found"));
    }
    teacher_detail(store, teacher.id).await
}

/// Makes the teacher the homeroom teacher of the class. A class already
/// claimed by someone else is rejected by the store's unique index.
pub async fn assign_class_teacher(
    store: &dyn SchoolStore,
    teacher_id: u64,
    sclass_id: u64,
) -> Result<TeacherView, ApiError> {
    let teacher = find_teacher(store, teacher_id).await?;
    let sclass = find_class(store, sclass_id).await?;
    if sclass.school_id != teacher.school_id {
        return Err(ApiError::validation("Class belongs to another school"));
    }

    if !store.set_class_teacher(teacher.id, Some(sclass.id)).await? {
        return Err(ApiError::not_found("Teacher not found"));
    }
    tracing::info!(teacher_id, sclass_id, "Class teacher assigned");
    teacher_detail(store, teacher.id).await
}
