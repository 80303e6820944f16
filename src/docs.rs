use crate::api::{
    classes::CreateClass,
    students::ExamResultInput,
    subjects::CreateSubjects,
    teachers::{AssignClass, AssignSubject},
};
use crate::auth::resolver::{AdminRegistration, LoginRequest, LoginResponse, PrincipalView};
use crate::model::{
    admin::Admin,
    attendance::{AttendanceMark, AttendanceStatus},
    homework::{Attachment, Homework, HomeworkPatch, HomeworkStatus, Submission, SubmissionStatus},
    marks::{AssessmentType, Marks, MarksPatch},
    role::Role,
    school::School,
    sclass::Sclass,
    student::{ExamResult, Student},
    subject::Subject,
    teacher::{Teacher, TeacherUpdate},
    timetable::{SlotAssignment, TimetableEntry, TimetablePatch, Weekday},
};
use crate::service::{
    attendance::{ClassAttendanceRow, MarkAttendanceRequest, StudentAttendanceDay},
    cascade::{CascadeReport, CascadeStep, StepOutcome},
    homework::{GradeInput, HomeworkInput, HomeworkPage, StudentHomework, SubmissionInput},
    marks::{MarksInput, MarksView},
    roster::{
        AdminView, ClassDetail, ClassRef, ExamResultView, PersonRef, StudentPatch, StudentRegistration, StudentView,
        SubjectDetail, SubjectInput, SubjectRef, TeacherRegistration, TeacherView,
    },
    timetable::{TimetableRequest, TimetableView},
};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Administration API",
        version = "1.0.0",
        description = r#"
## School Administration System

This API runs the day-to-day records of a school: who belongs where, who may
see what, and when things happen.

### 🔹 Key Features
- **Roster**
  - Classes, subjects, students and teachers of one school per admin
  - Roll numbers unique per class, one class teacher per class
- **Attendance**
  - Daily marks by the class teacher, history per student
- **Timetable**
  - Weekly grid per class, teacher and student
- **Homework**
  - Assignment, submission (on time or late), grading
- **Marks**
  - Assessment records with report card names

### 🔐 Security
All `/api` endpoints require a **JWT Bearer** token obtained from `/Login`
or `/AdminReg`. Every record is scoped to the caller's school.

### 📦 Response Format
- JSON bodies
- Errors are `{"kind": "...", "message": "..."}`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::admin_register,
        crate::auth::handlers::admin_detail,

        crate::api::classes::create_class,
        crate::api::classes::list_classes,
        crate::api::classes::class_detail,
        crate::api::classes::class_students,
        crate::api::classes::delete_class,
        crate::api::classes::delete_school_classes,

        crate::api::subjects::create_subjects,
        crate::api::subjects::school_subjects,
        crate::api::subjects::class_subjects,
        crate::api::subjects::free_subjects,
        crate::api::subjects::subject_detail,
        crate::api::subjects::delete_subject,

        crate::api::students::register_student,
        crate::api::students::list_students,
        crate::api::students::student_detail,
        crate::api::students::update_student,
        crate::api::students::delete_student,
        crate::api::students::update_exam_result,

        crate::api::teachers::register_teacher,
        crate::api::teachers::list_teachers,
        crate::api::teachers::teacher_detail,
        crate::api::teachers::update_teacher,
        crate::api::teachers::delete_teacher,
        crate::api::teachers::assign_subject,
        crate::api::teachers::assign_class,
        crate::api::teachers::assign_class_teacher,

        crate::api::attendance::mark_attendance,
        crate::api::attendance::class_attendance,
        crate::api::attendance::student_attendance,

        crate::api::timetable::add_entries,
        crate::api::timetable::class_timetable,
        crate::api::timetable::teacher_timetable,
        crate::api::timetable::student_timetable,
        crate::api::timetable::update_entry,
        crate::api::timetable::delete_entry,

        crate::api::homework::create_homework,
        crate::api::homework::homework_by_class,
        crate::api::homework::student_homework,
        crate::api::homework::teacher_homework,
        crate::api::homework::submit_homework,
        crate::api::homework::update_homework,
        crate::api::homework::delete_homework,
        crate::api::homework::grade_submission,

        crate::api::marks::add_marks,
        crate::api::marks::teacher_marks,
        crate::api::marks::student_marks,
        crate::api::marks::subject_marks,
        crate::api::marks::update_marks,
        crate::api::marks::delete_marks
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            AdminRegistration,
            PrincipalView,
            AdminView,
            Admin,
            Role,
            School,
            CreateClass,
            Sclass,
            ClassDetail,
            ClassRef,
            PersonRef,
            CascadeReport,
            CascadeStep,
            StepOutcome,
            CreateSubjects,
            SubjectInput,
            Subject,
            SubjectDetail,
            SubjectRef,
            StudentRegistration,
            StudentPatch,
            Student,
            StudentView,
            ExamResult,
            ExamResultView,
            ExamResultInput,
            TeacherRegistration,
            TeacherUpdate,
            Teacher,
            TeacherView,
            AssignSubject,
            AssignClass,
            MarkAttendanceRequest,
            AttendanceMark,
            AttendanceStatus,
            ClassAttendanceRow,
            StudentAttendanceDay,
            TimetableRequest,
            SlotAssignment,
            TimetableEntry,
            TimetablePatch,
            TimetableView,
            Weekday,
            HomeworkInput,
            HomeworkPatch,
            Homework,
            HomeworkStatus,
            HomeworkPage,
            StudentHomework,
            Submission,
            SubmissionInput,
            SubmissionStatus,
            Attachment,
            GradeInput,
            MarksInput,
            MarksPatch,
            Marks,
            MarksView,
            AssessmentType
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and school registration"),
        (name = "Class", description = "Class management APIs"),
        (name = "Subject", description = "Subject management APIs"),
        (name = "Student", description = "Student management APIs"),
        (name = "Teacher", description = "Teacher management and assignment APIs"),
        (name = "Attendance", description = "Daily class attendance APIs"),
        (name = "Timetable", description = "Weekly timetable APIs"),
        (name = "Homework", description = "Homework, submission and grading APIs"),
        (name = "Marks", description = "Assessment marks APIs"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme the protected paths refer to.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_protected_and_public_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/Login"));
        assert!(doc.paths.paths.contains_key("/api/Attendance/Mark"));
        assert!(doc.paths.paths.contains_key("/api/Homework/{homeworkId}/Grade"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
