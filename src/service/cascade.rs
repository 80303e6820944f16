//! Cascading deletes as an ordered saga.
//!
//! Every step removes one kind of dependent and records how many rows it
//! removed. Dependents go before their owner, so when a step fails the owner
//! still exists and running the same delete again resumes where it stopped.

use std::fmt;

use serde::Serialize;
use strum_macros::Display;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    store::{SchoolStore, Scope, StoreResult},
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, Serialize, ToSchema)]
pub enum CascadeStep {
    Attendance,
    Timetable,
    Homework,
    Students,
    Subjects,
    Teachers,
    Classes,
}

impl CascadeStep {
    pub const CLASS: &'static [CascadeStep] = &[
        CascadeStep::Attendance,
        CascadeStep::Timetable,
        CascadeStep::Students,
        CascadeStep::Subjects,
        CascadeStep::Teachers,
        CascadeStep::Classes,
    ];

    pub const SCHOOL: &'static [CascadeStep] = &[
        CascadeStep::Attendance,
        CascadeStep::Timetable,
        CascadeStep::Homework,
        CascadeStep::Students,
        CascadeStep::Subjects,
        CascadeStep::Teachers,
        CascadeStep::Classes,
    ];
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StepOutcome {
    pub step: CascadeStep,
    pub deleted: u64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct CascadeReport {
    pub completed: Vec<StepOutcome>,
    pub failed: Option<CascadeStep>,
}

impl CascadeReport {
    pub fn deleted(&self, step: CascadeStep) -> u64 {
        self.completed
            .iter()
            .filter(|o| o.step == step)
            .map(|o| o.deleted)
            .sum()
    }
}

impl fmt::Display for CascadeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let done = self
            .completed
            .iter()
            .map(|o| o.step.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        match self.failed {
            Some(step) if done.is_empty() => write!(f, "Cascade delete failed at {step}; nothing was removed"),
            Some(step) => write!(f, "Cascade delete failed at {step} after removing {done}; retry to resume"),
            None => write!(f, "Cascade delete completed: {done}"),
        }
    }
}

pub struct CascadeSaga<'a> {
    store: &'a dyn SchoolStore,
    scope: Scope,
    steps: &'static [CascadeStep],
}

impl<'a> CascadeSaga<'a> {
    pub fn for_class(store: &'a dyn SchoolStore, sclass_id: u64) -> Self {
        Self {
            store,
            scope: Scope::Class(sclass_id),
            steps: CascadeStep::CLASS,
        }
    }

    pub fn for_school(store: &'a dyn SchoolStore, school_id: u64) -> Self {
        Self {
            store,
            scope: Scope::School(school_id),
            steps: CascadeStep::SCHOOL,
        }
    }

    async fn run_step(&self, step: CascadeStep) -> StoreResult<u64> {
        let store = self.store;
        match step {
            CascadeStep::Attendance => store.delete_attendance(self.scope).await,
            CascadeStep::Timetable => store.delete_timetable(self.scope).await,
            CascadeStep::Homework => match self.scope {
                Scope::School(id) => store.delete_school_homework(id).await,
                // homework addresses classes by name, it is not owned by one
                Scope::Class(_) => Ok(0),
            },
            CascadeStep::Students => store.delete_students(self.scope).await,
            CascadeStep::Subjects => store.delete_subjects(self.scope).await,
            CascadeStep::Teachers => store.delete_teachers(self.scope).await,
            CascadeStep::Classes => store.delete_classes(self.scope).await,
        }
    }

    /// Runs every step in order, stopping at the first failure.
    pub async fn run(self) -> Result<CascadeReport, ApiError> {
        let mut report = CascadeReport::default();

        for &step in self.steps {
            match self.run_step(step).await {
                Ok(deleted) => {
                    tracing::debug!(scope = %self.scope, %step, deleted, "Cascade step done");
                    report.completed.push(StepOutcome { step, deleted });
                }
                Err(e) => {
                    tracing::error!(error = %e, scope = %self.scope, %step, "Cascade step failed");
                    report.failed = Some(step);
                    return Err(ApiError::PartialCascade(report));
                }
            }
        }

        tracing::info!(scope = %self.scope, "Cascade delete finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        admin::NewAdmin,
        attendance::{AttendanceMark, AttendanceStatus},
        student::NewStudent,
        subject::NewSubject,
        teacher::NewTeacher,
        timetable::{SlotAssignment, Weekday},
    };
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    struct Fixture {
        store: MemoryStore,
        school_id: u64,
        class_id: u64,
        other_class_id: u64,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let admin = store
            .create_school_admin(
                "Green Valley",
                NewAdmin {
                    name: "Head".into(),
                    email: "head@gv.edu".into(),
                    password: "x".into(),
                },
            )
            .await
            .unwrap();
        let school_id = admin.school_id;
        let class = store.insert_class(school_id, "4B").await.unwrap();
        let other = store.insert_class(school_id, "5A").await.unwrap();

        for (roll, sclass) in [(1, class.id), (2, class.id), (1, other.id)] {
            store
                .insert_student(NewStudent {
                    name: format!("Student {roll}-{sclass}"),
                    father_name: "Father".into(),
                    email: format!("s{roll}-{sclass}@gv.edu"),
                    roll_num: roll,
                    dob: NaiveDate::from_ymd_opt(2012, 1, 1).unwrap(),
                    phone_number: "1".into(),
                    emergency_contact: "2".into(),
                    address: "Street".into(),
                    password: "x".into(),
                    sclass_id: sclass,
                    school_id,
                })
                .await
                .unwrap();
        }

        let subject = store
            .insert_subject(NewSubject {
                sub_name: "Math".into(),
                sub_code: None,
                sessions: None,
                sclass_id: class.id,
                school_id,
            })
            .await
            .unwrap();

        let teacher = store
            .insert_teacher(NewTeacher {
                name: "Homeroom".into(),
                email: "t@gv.edu".into(),
                password: "x".into(),
                school_id,
                teach_sclass: vec![class.id],
                ..Default::default()
            })
            .await
            .unwrap();
        store.set_class_teacher(teacher.id, Some(class.id)).await.unwrap();

        let students = store.list_students(Scope::Class(class.id)).await.unwrap();
        let marks: Vec<AttendanceMark> = students
            .iter()
            .map(|s| AttendanceMark {
                student_id: s.id,
                status: AttendanceStatus::Present,
            })
            .collect();
        store
            .upsert_attendance(class.id, NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(), teacher.id, &marks)
            .await
            .unwrap();

        store
            .upsert_timetable(
                school_id,
                &[SlotAssignment {
                    class_id: class.id,
                    day: Weekday::Monday,
                    period_number: 1,
                    subject_id: subject.id,
                    teacher_id: Some(teacher.id),
                }],
            )
            .await
            .unwrap();

        Fixture {
            store,
            school_id,
            class_id: class.id,
            other_class_id: other.id,
        }
    }

    #[actix_web::test]
    async fn class_cascade_removes_only_that_class() {
        let f = fixture().await;

        let report = CascadeSaga::for_class(&f.store, f.class_id).run().await.unwrap();

        assert_eq!(report.failed, None);
        assert_eq!(report.deleted(CascadeStep::Students), 2);
        assert_eq!(report.deleted(CascadeStep::Attendance), 2);
        assert_eq!(report.deleted(CascadeStep::Classes), 1);
        assert!(f.store.find_class(f.class_id).await.unwrap().is_none());
        assert!(f.store.find_class(f.other_class_id).await.unwrap().is_some());
        assert_eq!(f.store.list_students(Scope::School(f.school_id)).await.unwrap().len(), 1);
        assert!(f.store.list_timetable(Scope::Class(f.class_id)).await.unwrap().is_empty());
        assert!(f.store.list_teachers(Scope::School(f.school_id)).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn failed_step_is_reported_and_rerun_resumes() {
        let f = fixture().await;
        f.store.fail_on("delete_teachers");

        let err = CascadeSaga::for_class(&f.store, f.class_id).run().await.unwrap_err();
        let ApiError::PartialCascade(report) = err else {
            panic!("expected a partial cascade");
        };
        assert_eq!(report.failed, Some(CascadeStep::Teachers));
        let done: Vec<CascadeStep> = report.completed.iter().map(|o| o.step).collect();
        assert_eq!(
            done,
            vec![
                CascadeStep::Attendance,
                CascadeStep::Timetable,
                CascadeStep::Students,
                CascadeStep::Subjects,
            ]
        );
        // the owner survives so the delete can be retried
        assert!(f.store.find_class(f.class_id).await.unwrap().is_some());

        f.store.heal();
        let report = CascadeSaga::for_class(&f.store, f.class_id).run().await.unwrap();
        assert_eq!(report.deleted(CascadeStep::Students), 0);
        assert_eq!(report.deleted(CascadeStep::Teachers), 1);
        assert!(f.store.find_class(f.class_id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn school_cascade_clears_every_class() {
        let f = fixture().await;

        let report = CascadeSaga::for_school(&f.store, f.school_id).run().await.unwrap();

        assert_eq!(report.deleted(CascadeStep::Classes), 2);
        assert_eq!(report.deleted(CascadeStep::Students), 3);
        assert!(f.store.list_classes(f.school_id).await.unwrap().is_empty());
        assert!(f.store.find_school(f.school_id).await.unwrap().is_some());
    }

    #[test]
    fn report_message_names_the_failed_step() {
        let report = CascadeReport {
            completed: vec![StepOutcome {
                step: CascadeStep::Attendance,
                deleted: 3,
            }],
            failed: Some(CascadeStep::Timetable),
        };
        assert_eq!(
            report.to_string(),
            "Cascade delete failed at Timetable after removing Attendance; retry to resume"
        );
    }
}
