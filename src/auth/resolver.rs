//! Turns credentials into a principal and a session token.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::{
        jwt::generate_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::ApiError,
    model::{
        admin::{Admin, NewAdmin},
        role::Role,
        student::Student,
        teacher::Teacher,
    },
    service::roster::{
        AdminView, MIN_PASSWORD_LEN, StudentView, TeacherView, ensure_email_free, student_view, teacher_view,
    },
    store::SchoolStore,
};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[schema(example = "head@greenvalley.edu")]
    pub email: Option<String>,
    #[schema(example = "secret123")]
    pub password: Option<String>,
    #[schema(example = 2)]
    pub roll_num: Option<i32>,
    #[schema(example = "Areeba Ali")]
    pub student_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminRegistration {
    #[schema(example = "Nadia Hussain")]
    pub name: Option<String>,
    #[schema(example = "head@greenvalley.edu")]
    pub email: Option<String>,
    pub password: Option<String>,
    #[schema(example = "Green Valley School")]
    pub school_name: Option<String>,
}

/// Password-free principal with the names a client needs to render it.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum PrincipalView {
    Admin(AdminView),
    Teacher(TeacherView),
    Student(StudentView),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = "Login successful")]
    pub message: String,
    pub token: String,
    pub role: Role,
    pub user: PrincipalView,
}

/// A principal found by the lookup, still carrying its password hash.
enum Candidate {
    Admin(Admin),
    Teacher(Teacher),
    Student(Student),
}

impl Candidate {
    fn password_hash(&self) -> &str {
        match self {
            Candidate::Admin(a) => &a.password,
            Candidate::Teacher(t) => &t.password,
            Candidate::Student(s) => &s.password,
        }
    }

    fn identity(&self) -> (u64, Role) {
        match self {
            Candidate::Admin(a) => (a.id, Role::Admin),
            Candidate::Teacher(t) => (t.id, Role::Teacher),
            Candidate::Student(s) => (s.id, Role::Student),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Email logins try admins, then teachers, then students; the first table
/// holding the email decides the role. Roll-number logins only ever resolve
/// to a student.
async fn lookup(store: &dyn SchoolStore, request: &LoginRequest) -> Result<Option<Candidate>, ApiError> {
    if let Some(email) = non_blank(&request.email) {
        if let Some(admin) = store.find_admin_by_email(email).await? {
            return Ok(Some(Candidate::Admin(admin)));
        }
        if let Some(teacher) = store.find_teacher_by_email(email).await? {
            return Ok(Some(Candidate::Teacher(teacher)));
        }
        return Ok(store.find_student_by_email(email).await?.map(Candidate::Student));
    }

    match (request.roll_num, non_blank(&request.student_name)) {
        (Some(roll_num), Some(name)) => Ok(store
            .find_student_by_roll(roll_num, name)
            .await?
            .map(Candidate::Student)),
        _ => Ok(None),
    }
}

pub async fn admin_view(store: &dyn SchoolStore, admin: &Admin) -> Result<AdminView, ApiError> {
    let school = store
        .find_school(admin.school_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Admin does not have a school assigned"))?;
    Ok(AdminView::new(admin, &school))
}

async fn principal_view(store: &dyn SchoolStore, candidate: &Candidate) -> Result<PrincipalView, ApiError> {
    Ok(match candidate {
        Candidate::Admin(a) => PrincipalView::Admin(admin_view(store, a).await?),
        Candidate::Teacher(t) => PrincipalView::Teacher(teacher_view(store, t).await?),
        Candidate::Student(s) => PrincipalView::Student(student_view(store, s).await?),
    })
}

pub async fn resolve_login(
    store: &dyn SchoolStore,
    request: &LoginRequest,
    config: &Config,
) -> Result<LoginResponse, ApiError> {
    // 1️⃣ shape of the credentials
    let password = request.password.as_deref().filter(|p| !p.is_empty());
    let has_email = non_blank(&request.email).is_some();
    let has_roll = request.roll_num.is_some() && non_blank(&request.student_name).is_some();
    let Some(password) = password.filter(|_| has_email || has_roll) else {
        return Err(ApiError::validation(
            "Provide password and either email OR rollNum+studentName",
        ));
    };

    // 2️⃣ find the principal
    let candidate = lookup(store, request)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    // 3️⃣ verify password
    if !verify_password(password, candidate.password_hash()) {
        tracing::info!("Invalid credentials: password mismatch");
        return Err(ApiError::auth("Invalid credentials"));
    }

    // 4️⃣ issue token
    let (principal_id, role) = candidate.identity();
    let token = generate_token(principal_id, role, config)?;

    tracing::info!(principal_id, %role, "Login successful");
    Ok(LoginResponse {
        message: "Login successful".to_string(),
        token,
        role,
        user: principal_view(store, &candidate).await?,
    })
}

/// Creates a school together with its admin account and signs the admin in.
pub async fn register_admin(
    store: &dyn SchoolStore,
    input: AdminRegistration,
    config: &Config,
) -> Result<LoginResponse, ApiError> {
    let (Some(name), Some(email), Some(password), Some(school_name)) = (
        non_blank(&input.name),
        non_blank(&input.email),
        input.password.as_deref().filter(|p| !p.is_empty()),
        non_blank(&input.school_name),
    ) else {
        return Err(ApiError::validation(
            "Missing required fields: name, email, password, schoolName",
        ));
    };
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    ensure_email_free(store, email, None).await?;

    // uq_admins_email and uq_schools_name are authoritative
    let admin = store
        .create_school_admin(
            school_name,
            NewAdmin {
                name: name.to_string(),
                email: email.to_string(),
                password: hash_password(password)?,
            },
        )
        .await?;

    let token = generate_token(admin.id, Role::Admin, config)?;
    tracing::info!(admin_id = admin.id, school_id = admin.school_id, "Admin registered");

    Ok(LoginResponse {
        message: "Admin registered successfully".to_string(),
        token,
        role: Role::Admin,
        user: PrincipalView::Admin(admin_view(store, &admin).await?),
    })
}
