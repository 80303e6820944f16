//! In-process store. Selected with `DATABASE_URL=memory://` and used by the
//! test suites. A single lock guards all tables, so every operation, including
//! bulk upserts, is atomic and unique-index checks cannot race.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{HomeworkFilter, MarksFilter, SchoolStore, Scope, StoreError, StoreResult, keys};
use crate::model::{
    admin::{Admin, NewAdmin},
    attendance::{Attendance, AttendanceMark},
    homework::{Homework, HomeworkPatch, HomeworkStatus, NewHomework, Submission, SubmissionStatus},
    marks::{Marks, MarksPatch, NewMarks},
    school::School,
    sclass::Sclass,
    student::{ExamResult, NewStudent, Student, StudentUpdate},
    subject::{NewSubject, Subject},
    teacher::{NewTeacher, Teacher, TeacherUpdate},
    timetable::{SlotAssignment, TimetableEntry, TimetablePatch},
};

#[derive(Default)]
struct Tables {
    next_id: u64,
    schools: BTreeMap<u64, School>,
    admins: BTreeMap<u64, Admin>,
    classes: BTreeMap<u64, Sclass>,
    subjects: BTreeMap<u64, Subject>,
    teachers: BTreeMap<u64, Teacher>,
    students: BTreeMap<u64, Student>,
    attendance: BTreeMap<u64, Attendance>,
    timetable: BTreeMap<u64, TimetableEntry>,
    homework: BTreeMap<u64, Homework>,
    marks: BTreeMap<u64, Marks>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn class_in_scope(&self, sclass_id: u64, scope: Scope) -> bool {
        match scope {
            Scope::Class(id) => sclass_id == id,
            Scope::School(school_id) => self
                .classes
                .get(&sclass_id)
                .is_some_and(|c| c.school_id == school_id),
        }
    }

    fn student_clash(&self, candidate: &Student) -> Option<&'static str> {
        self.students
            .values()
            .filter(|s| s.id != candidate.id)
            .find_map(|s| {
                if s.email == candidate.email {
                    Some(keys::STUDENT_EMAIL)
                } else if s.school_id == candidate.school_id
                    && s.sclass_id == candidate.sclass_id
                    && s.roll_num == candidate.roll_num
                {
                    Some(keys::STUDENT_ROLL)
                } else {
                    None
                }
            })
    }

    fn slot_taken(&self, candidate: &TimetableEntry) -> bool {
        self.timetable.values().any(|e| {
            e.id != candidate.id
                && e.school_id == candidate.school_id
                && e.class_id == candidate.class_id
                && e.day == candidate.day
                && e.period_number == candidate.period_number
        })
    }

    fn unlink_teachers(&mut self, removed: &[u64]) {
        for subject in self.subjects.values_mut() {
            if subject.teacher_id.is_some_and(|t| removed.contains(&t)) {
                subject.teacher_id = None;
            }
        }
    }

    fn unlink_subjects(&mut self, removed: &[u64]) {
        for teacher in self.teachers.values_mut() {
            teacher.teach_subject.retain(|s| !removed.contains(s));
        }
    }

    fn unlink_classes(&mut self, removed: &[u64]) {
        for teacher in self.teachers.values_mut() {
            teacher.teach_sclass.retain(|c| !removed.contains(c));
            if teacher.class_teacher_of.is_some_and(|c| removed.contains(&c)) {
                teacher.class_teacher_of = None;
            }
        }
    }

    fn drop_student_attendance(&mut self, removed: &[u64]) {
        self.attendance.retain(|_, a| !removed.contains(&a.student_id));
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    #[cfg(test)]
    fail_on: Mutex<Option<&'static str>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    /// Makes the named operation fail until [`MemoryStore::heal`] is called.
    #[cfg(test)]
    pub fn fail_on(&self, op: &'static str) {
        *self.fail_on.lock().unwrap() = Some(op);
    }

    #[cfg(test)]
    pub fn heal(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    #[cfg(test)]
    fn check_fault(&self, op: &'static str) -> StoreResult<()> {
        if *self.fail_on.lock().unwrap() == Some(op) {
            return Err(StoreError::Unavailable(format!("injected failure in {op}")));
        }
        Ok(())
    }

    #[cfg(not(test))]
    #[inline]
    fn check_fault(&self, _op: &'static str) -> StoreResult<()> {
        Ok(())
    }
}

fn count(before: usize, after: usize) -> u64 {
    (before - after) as u64
}

#[async_trait]
impl SchoolStore for MemoryStore {
    async fn create_school_admin(&self, school_name: &str, admin: NewAdmin) -> StoreResult<Admin> {
        let mut t = self.lock()?;
        if t.schools.values().any(|s| s.school_name == school_name) {
            return Err(StoreError::Duplicate(keys::SCHOOL_NAME.into()));
        }
        if t.admins.values().any(|a| a.email == admin.email) {
            return Err(StoreError::Duplicate(keys::ADMIN_EMAIL.into()));
        }

        let school_id = t.next_id();
        t.schools.insert(
            school_id,
            School {
                id: school_id,
                school_name: school_name.to_string(),
            },
        );

        let id = t.next_id();
        let admin = Admin {
            id,
            name: admin.name,
            email: admin.email,
            password: admin.password,
            school_id,
        };
        t.admins.insert(id, admin.clone());
        Ok(admin)
    }

    async fn find_admin(&self, id: u64) -> StoreResult<Option<Admin>> {
        Ok(self.lock()?.admins.get(&id).cloned())
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>> {
        Ok(self.lock()?.admins.values().find(|a| a.email == email).cloned())
    }

    async fn find_school(&self, id: u64) -> StoreResult<Option<School>> {
        Ok(self.lock()?.schools.get(&id).cloned())
    }

    async fn insert_class(&self, school_id: u64, sclass_name: &str) -> StoreResult<Sclass> {
        let mut t = self.lock()?;
        if t
            .classes
            .values()
            .any(|c| c.school_id == school_id && c.sclass_name == sclass_name)
        {
            return Err(StoreError::Duplicate(keys::CLASS_NAME.into()));
        }

        let id = t.next_id();
        let sclass = Sclass {
            id,
            sclass_name: sclass_name.to_string(),
            school_id,
        };
        t.classes.insert(id, sclass.clone());
        Ok(sclass)
    }

    async fn find_class(&self, id: u64) -> StoreResult<Option<Sclass>> {
        Ok(self.lock()?.classes.get(&id).cloned())
    }

    async fn find_class_by_name(&self, school_id: u64, sclass_name: &str) -> StoreResult<Option<Sclass>> {
        Ok(self
            .lock()?
            .classes
            .values()
            .find(|c| c.school_id == school_id && c.sclass_name == sclass_name)
            .cloned())
    }

    async fn list_classes(&self, school_id: u64) -> StoreResult<Vec<Sclass>> {
        Ok(self
            .lock()?
            .classes
            .values()
            .filter(|c| c.school_id == school_id)
            .cloned()
            .collect())
    }

    async fn delete_classes(&self, scope: Scope) -> StoreResult<u64> {
        self.check_fault("delete_classes")?;
        let mut t = self.lock()?;
        let removed: Vec<u64> = t
            .classes
            .values()
            .filter(|c| match scope {
                Scope::Class(id) => c.id == id,
                Scope::School(school_id) => c.school_id == school_id,
            })
            .map(|c| c.id)
            .collect();

        t.classes.retain(|id, _| !removed.contains(id));
        t.unlink_classes(&removed);
        Ok(removed.len() as u64)
    }

    async fn insert_subject(&self, subject: NewSubject) -> StoreResult<Subject> {
        let mut t = self.lock()?;
        let id = t.next_id();
        let subject = Subject {
            id,
            sub_name: subject.sub_name,
            sub_code: subject.sub_code,
            sessions: subject.sessions,
            sclass_id: subject.sclass_id,
            school_id: subject.school_id,
            teacher_id: None,
        };
        t.subjects.insert(id, subject.clone());
        Ok(subject)
    }

    async fn find_subject(&self, id: u64) -> StoreResult<Option<Subject>> {
        Ok(self.lock()?.subjects.get(&id).cloned())
    }

    async fn list_subjects(&self, scope: Scope) -> StoreResult<Vec<Subject>> {
        Ok(self
            .lock()?
            .subjects
            .values()
            .filter(|s| match scope {
                Scope::Class(id) => s.sclass_id == id,
                Scope::School(id) => s.school_id == id,
            })
            .cloned()
            .collect())
    }

    async fn set_subject_teacher(&self, subject_id: u64, teacher_id: Option<u64>) -> StoreResult<bool> {
        let mut t = self.lock()?;
        match t.subjects.get_mut(&subject_id) {
            Some(subject) => {
                subject.teacher_id = teacher_id;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_subject(&self, id: u64) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let removed = t.subjects.remove(&id).is_some();
        if removed {
            t.unlink_subjects(&[id]);
        }
        Ok(removed)
    }

    async fn delete_subjects(&self, scope: Scope) -> StoreResult<u64> {
        self.check_fault("delete_subjects")?;
        let mut t = self.lock()?;
        let removed: Vec<u64> = t
            .subjects
            .values()
            .filter(|s| match scope {
                Scope::Class(id) => s.sclass_id == id,
                Scope::School(id) => s.school_id == id,
            })
            .map(|s| s.id)
            .collect();

        t.subjects.retain(|id, _| !removed.contains(id));
        t.unlink_subjects(&removed);
        Ok(removed.len() as u64)
    }

    async fn insert_teacher(&self, teacher: NewTeacher) -> StoreResult<Teacher> {
        let mut t = self.lock()?;
        if t.teachers.values().any(|x| x.email == teacher.email) {
            return Err(StoreError::Duplicate(keys::TEACHER_EMAIL.into()));
        }

        let id = t.next_id();
        let mut teach_subject = teacher.teach_subject;
        teach_subject.dedup();
        let mut teach_sclass = teacher.teach_sclass;
        teach_sclass.dedup();

        let teacher = Teacher {
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
        };
        t.teachers.insert(id, teacher.clone());
        Ok(teacher)
    }

    async fn find_teacher(&self, id: u64) -> StoreResult<Option<Teacher>> {
        Ok(self.lock()?.teachers.get(&id).cloned())
    }

    async fn find_teacher_by_email(&self, email: &str) -> StoreResult<Option<Teacher>> {
        Ok(self.lock()?.teachers.values().find(|x| x.email == email).cloned())
    }

    async fn list_teachers(&self, scope: Scope) -> StoreResult<Vec<Teacher>> {
        Ok(self
            .lock()?
            .teachers
            .values()
            .filter(|x| match scope {
                Scope::Class(id) => x.teach_sclass.contains(&id) || x.class_teacher_of == Some(id),
                Scope::School(id) => x.school_id == id,
            })
            .cloned()
            .collect())
    }

    async fn update_teacher(&self, id: u64, update: TeacherUpdate) -> StoreResult<Option<Teacher>> {
        let mut t = self.lock()?;
        if let Some(email) = &update.email {
            if t.teachers.values().any(|x| x.id != id && &x.email == email) {
                return Err(StoreError::Duplicate(keys::TEACHER_EMAIL.into()));
            }
        }

        let Some(teacher) = t.teachers.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            teacher.name = name;
        }
        if let Some(email) = update.email {
            teacher.email = email;
        }
        if update.phone_number.is_some() {
            teacher.phone_number = update.phone_number;
        }
        if update.address.is_some() {
            teacher.address = update.address;
        }
        if update.emergency_contact.is_some() {
            teacher.emergency_contact = update.emergency_contact;
        }
        Ok(Some(teacher.clone()))
    }

    async fn add_teacher_class(&self, teacher_id: u64, sclass_id: u64) -> StoreResult<bool> {
        let mut t = self.lock()?;
        match t.teachers.get_mut(&teacher_id) {
            Some(teacher) => {
                if !teacher.teach_sclass.contains(&sclass_id) {
                    teacher.teach_sclass.push(sclass_id);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_teacher_subject(&self, teacher_id: u64, subject_id: u64, sclass_id: u64) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let Some(teacher) = t.teachers.get_mut(&teacher_id) else {
            return Ok(false);
        };
        if !teacher.teach_subject.contains(&subject_id) {
            teacher.teach_subject.push(subject_id);
        }
        if !teacher.teach_sclass.contains(&sclass_id) {
            teacher.teach_sclass.push(sclass_id);
        }
        if let Some(subject) = t.subjects.get_mut(&subject_id) {
            subject.teacher_id = Some(teacher_id);
        }
        Ok(true)
    }

    async fn set_class_teacher(&self, teacher_id: u64, sclass_id: Option<u64>) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let Some(school_id) = t.teachers.get(&teacher_id).map(|x| x.school_id) else {
            return Ok(false);
        };

        if let Some(class) = sclass_id {
            let taken = t.teachers.values().any(|x| {
                x.id != teacher_id && x.school_id == school_id && x.class_teacher_of == Some(class)
            });
            if taken {
                return Err(StoreError::Duplicate(keys::CLASS_TEACHER.into()));
            }
        }

        if let Some(teacher) = t.teachers.get_mut(&teacher_id) {
            teacher.class_teacher_of = sclass_id;
        }
        Ok(true)
    }

    async fn delete_teacher(&self, id: u64) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let removed = t.teachers.remove(&id).is_some();
        if removed {
            t.unlink_teachers(&[id]);
        }
        Ok(removed)
    }

    async fn delete_teachers(&self, scope: Scope) -> StoreResult<u64> {
        self.check_fault("delete_teachers")?;
        let mut t = self.lock()?;
        let removed: Vec<u64> = t
            .teachers
            .values()
            .filter(|x| match scope {
                Scope::Class(id) => x.teach_sclass.contains(&id) || x.class_teacher_of == Some(id),
                Scope::School(id) => x.school_id == id,
            })
            .map(|x| x.id)
            .collect();

        t.teachers.retain(|id, _| !removed.contains(id));
        t.unlink_teachers(&removed);
        Ok(removed.len() as u64)
    }

    async fn insert_student(&self, student: NewStudent) -> StoreResult<Student> {
        let mut t = self.lock()?;
        let mut candidate = Student {
            id: 0,
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
        };
        if let Some(key) = t.student_clash(&candidate) {
            return Err(StoreError::Duplicate(key.into()));
        }

        candidate.id = t.next_id();
        t.students.insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    async fn find_student(&self, id: u64) -> StoreResult<Option<Student>> {
        Ok(self.lock()?.students.get(&id).cloned())
    }

    async fn find_student_by_email(&self, email: &str) -> StoreResult<Option<Student>> {
        Ok(self.lock()?.students.values().find(|s| s.email == email).cloned())
    }

    async fn find_student_by_roll(&self, roll_num: i32, name: &str) -> StoreResult<Option<Student>> {
        Ok(self
            .lock()?
            .students
            .values()
            .find(|s| s.roll_num == roll_num && s.name == name)
            .cloned())
    }

    async fn list_students(&self, scope: Scope) -> StoreResult<Vec<Student>> {
        Ok(self
            .lock()?
            .students
            .values()
            .filter(|s| match scope {
                Scope::Class(id) => s.sclass_id == id,
                Scope::School(id) => s.school_id == id,
            })
            .cloned()
            .collect())
    }

    async fn update_student(&self, id: u64, update: StudentUpdate) -> StoreResult<Option<Student>> {
        let mut t = self.lock()?;
        let Some(mut next) = t.students.get(&id).cloned() else {
            return Ok(None);
        };

        if let Some(v) = update.name {
            next.name = v;
        }
        if let Some(v) = update.father_name {
            next.father_name = v;
        }
        if let Some(v) = update.email {
            next.email = v;
        }
        if let Some(v) = update.roll_num {
            next.roll_num = v;
        }
        if let Some(v) = update.dob {
            next.dob = v;
        }
        if let Some(v) = update.phone_number {
            next.phone_number = v;
        }
        if let Some(v) = update.emergency_contact {
            next.emergency_contact = v;
        }
        if let Some(v) = update.address {
            next.address = v;
        }
        if let Some(v) = update.password {
            next.password = v;
        }
        if let Some(v) = update.sclass_id {
            next.sclass_id = v;
        }

        if let Some(key) = t.student_clash(&next) {
            return Err(StoreError::Duplicate(key.into()));
        }
        t.students.insert(id, next.clone());
        Ok(Some(next))
    }

    async fn upsert_exam_result(&self, student_id: u64, subject_id: u64, marks_obtained: f64) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let Some(student) = t.students.get_mut(&student_id) else {
            return Ok(false);
        };
        match student.exam_result.iter_mut().find(|r| r.subject_id == subject_id) {
            Some(result) => result.marks_obtained = marks_obtained,
            None => student.exam_result.push(ExamResult {
                subject_id,
                marks_obtained,
            }),
        }
        Ok(true)
    }

    async fn delete_student(&self, id: u64) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let removed = t.students.remove(&id).is_some();
        if removed {
            t.drop_student_attendance(&[id]);
        }
        Ok(removed)
    }

    async fn delete_students(&self, scope: Scope) -> StoreResult<u64> {
        self.check_fault("delete_students")?;
        let mut t = self.lock()?;
        let removed: Vec<u64> = t
            .students
            .values()
            .filter(|s| match scope {
                Scope::Class(id) => s.sclass_id == id,
                Scope::School(id) => s.school_id == id,
            })
            .map(|s| s.id)
            .collect();

        t.students.retain(|id, _| !removed.contains(id));
        t.drop_student_attendance(&removed);
        Ok(removed.len() as u64)
    }

    async fn upsert_attendance(
        &self,
        sclass_id: u64,
        date: NaiveDate,
        marked_by: u64,
        marks: &[AttendanceMark],
    ) -> StoreResult<()> {
        self.check_fault("upsert_attendance")?;
        let mut t = self.lock()?;
        for mark in marks {
            let existing = t
                .attendance
                .values_mut()
                .find(|a| a.student_id == mark.student_id && a.sclass_id == sclass_id && a.date == date);

            match existing {
                Some(record) => {
                    record.status = mark.status;
                    record.marked_by = marked_by;
                }
                None => {
                    let id = t.next_id();
                    t.attendance.insert(
                        id,
                        Attendance {
                            id,
                            student_id: mark.student_id,
                            sclass_id,
                            date,
                            status: mark.status,
                            marked_by,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    async fn list_class_attendance(&self, sclass_id: u64, date: Option<NaiveDate>) -> StoreResult<Vec<Attendance>> {
        Ok(self
            .lock()?
            .attendance
            .values()
            .filter(|a| a.sclass_id == sclass_id && date.is_none_or(|d| a.date == d))
            .cloned()
            .collect())
    }

    async fn list_student_attendance(&self, student_id: u64) -> StoreResult<Vec<Attendance>> {
        let mut records: Vec<Attendance> = self
            .lock()?
            .attendance
            .values()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect();
        records.sort_by_key(|a| a.date);
        Ok(records)
    }

    async fn delete_attendance(&self, scope: Scope) -> StoreResult<u64> {
        self.check_fault("delete_attendance")?;
        let mut t = self.lock()?;
        let before = t.attendance.len();
        let doomed: Vec<u64> = t
            .attendance
            .values()
            .filter(|a| {
                t.class_in_scope(a.sclass_id, scope)
                    || matches!(scope, Scope::School(school_id)
                        if t.students.get(&a.student_id).is_some_and(|s| s.school_id == school_id))
            })
            .map(|a| a.id)
            .collect();
        t.attendance.retain(|id, _| !doomed.contains(id));
        Ok(count(before, t.attendance.len()))
    }

    async fn upsert_timetable(&self, school_id: u64, entries: &[SlotAssignment]) -> StoreResult<()> {
        let mut t = self.lock()?;
        for entry in entries {
            let existing = t.timetable.values_mut().find(|e| {
                e.school_id == school_id
                    && e.class_id == entry.class_id
                    && e.day == entry.day
                    && e.period_number == entry.period_number
            });

            match existing {
                Some(slot) => {
                    slot.subject_id = entry.subject_id;
                    slot.teacher_id = entry.teacher_id;
                }
                None => {
                    let id = t.next_id();
                    t.timetable.insert(
                        id,
                        TimetableEntry {
                            id,
                            school_id,
                            class_id: entry.class_id,
                            day: entry.day,
                            period_number: entry.period_number,
                            subject_id: entry.subject_id,
                            teacher_id: entry.teacher_id,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    async fn find_timetable_entry(&self, id: u64) -> StoreResult<Option<TimetableEntry>> {
        Ok(self.lock()?.timetable.get(&id).cloned())
    }

    async fn list_timetable(&self, scope: Scope) -> StoreResult<Vec<TimetableEntry>> {
        Ok(self
            .lock()?
            .timetable
            .values()
            .filter(|e| match scope {
                Scope::Class(id) => e.class_id == id,
                Scope::School(id) => e.school_id == id,
            })
            .cloned()
            .collect())
    }

    async fn update_timetable_entry(&self, id: u64, patch: TimetablePatch) -> StoreResult<Option<TimetableEntry>> {
        let mut t = self.lock()?;
        let Some(mut next) = t.timetable.get(&id).cloned() else {
            return Ok(None);
        };
        if let Some(day) = patch.day {
            next.day = day;
        }
        if let Some(period) = patch.period_number {
            next.period_number = period;
        }
        if let Some(subject) = patch.subject_id {
            next.subject_id = subject;
        }
        if patch.teacher_id.is_some() {
            next.teacher_id = patch.teacher_id;
        }

        if t.slot_taken(&next) {
            return Err(StoreError::Duplicate(keys::TIMETABLE_SLOT.into()));
        }
        t.timetable.insert(id, next.clone());
        Ok(Some(next))
    }

    async fn delete_timetable_entry(&self, id: u64) -> StoreResult<bool> {
        Ok(self.lock()?.timetable.remove(&id).is_some())
    }

    async fn delete_timetable(&self, scope: Scope) -> StoreResult<u64> {
        self.check_fault("delete_timetable")?;
        let mut t = self.lock()?;
        let before = t.timetable.len();
        t.timetable.retain(|_, e| match scope {
            Scope::Class(id) => e.class_id != id,
            Scope::School(id) => e.school_id != id,
        });
        Ok(count(before, t.timetable.len()))
    }

    async fn insert_homework(&self, homework: NewHomework) -> StoreResult<Homework> {
        let mut t = self.lock()?;
        let id = t.next_id();
        let homework = Homework {
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
        };
        t.homework.insert(id, homework.clone());
        Ok(homework)
    }

    async fn find_homework(&self, id: u64) -> StoreResult<Option<Homework>> {
        Ok(self.lock()?.homework.get(&id).cloned())
    }

    async fn list_homework(&self, filter: HomeworkFilter) -> StoreResult<Vec<Homework>> {
        Ok(self
            .lock()?
            .homework
            .values()
            .filter(|h| match &filter {
                HomeworkFilter::Class { school_id, sclass } => {
                    h.school_id == *school_id && &h.sclass == sclass
                }
                HomeworkFilter::Teacher(id) => h.teacher_id == *id,
            })
            .cloned()
            .collect())
    }

    async fn update_homework(&self, id: u64, patch: HomeworkPatch) -> StoreResult<Option<Homework>> {
        let mut t = self.lock()?;
        let Some(homework) = t.homework.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = patch.title {
            homework.title = v;
        }
        if let Some(v) = patch.description {
            homework.description = v;
        }
        if let Some(v) = patch.subject {
            homework.subject = v;
        }
        if let Some(v) = patch.sclass {
            homework.sclass = v;
        }
        if let Some(v) = patch.due_date {
            homework.due_date = v;
        }
        if let Some(v) = patch.status {
            homework.status = v;
        }
        if let Some(v) = patch.attachments {
            homework.attachments = v;
        }
        Ok(Some(homework.clone()))
    }

    async fn delete_homework(&self, id: u64) -> StoreResult<bool> {
        Ok(self.lock()?.homework.remove(&id).is_some())
    }

    async fn delete_school_homework(&self, school_id: u64) -> StoreResult<u64> {
        self.check_fault("delete_school_homework")?;
        let mut t = self.lock()?;
        let before = t.homework.len();
        t.homework.retain(|_, h| h.school_id != school_id);
        Ok(count(before, t.homework.len()))
    }

    async fn insert_submission(&self, homework_id: u64, submission: Submission) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let Some(homework) = t.homework.get_mut(&homework_id) else {
            return Ok(false);
        };
        if homework.submission_of(submission.student_id).is_some() {
            return Err(StoreError::Duplicate(keys::SUBMISSION_STUDENT.into()));
        }
        homework.submissions.push(submission);
        Ok(true)
    }

    async fn grade_submission(
        &self,
        homework_id: u64,
        student_id: u64,
        grade: f64,
        feedback: Option<String>,
    ) -> StoreResult<bool> {
        let mut t = self.lock()?;
        let submission = t
            .homework
            .get_mut(&homework_id)
            .and_then(|h| h.submissions.iter_mut().find(|s| s.student_id == student_id));

        match submission {
            Some(s) => {
                s.grade = Some(grade);
                s.feedback = feedback;
                s.status = SubmissionStatus::Graded;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_marks(&self, marks: NewMarks) -> StoreResult<Marks> {
        let mut t = self.lock()?;
        let id = t.next_id();
        let marks = Marks {
            id,
            student_id: marks.student_id,
            teacher_id: marks.teacher_id,
            subject_id: marks.subject_id,
            assessment_type: marks.assessment_type,
            topic: marks.topic,
            date: marks.date,
            obtained_marks: marks.obtained_marks,
            total_marks: marks.total_marks,
        };
        t.marks.insert(id, marks.clone());
        Ok(marks)
    }

    async fn find_marks(&self, id: u64) -> StoreResult<Option<Marks>> {
        Ok(self.lock()?.marks.get(&id).cloned())
    }

    async fn list_marks(&self, filter: MarksFilter) -> StoreResult<Vec<Marks>> {
        Ok(self
            .lock()?
            .marks
            .values()
            .filter(|m| match filter {
                MarksFilter::Teacher(id) => m.teacher_id == id,
                MarksFilter::Student(id) => m.student_id == id,
                MarksFilter::Subject(id) => m.subject_id == id,
            })
            .cloned()
            .collect())
    }

    async fn update_marks(&self, id: u64, patch: MarksPatch) -> StoreResult<Option<Marks>> {
        let mut t = self.lock()?;
        let Some(marks) = t.marks.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = patch.obtained_marks {
            marks.obtained_marks = v;
        }
        if let Some(v) = patch.total_marks {
            marks.total_marks = v;
        }
        if let Some(v) = patch.topic {
            marks.topic = v;
        }
        if let Some(v) = patch.assessment_type {
            marks.assessment_type = v;
        }
        if let Some(v) = patch.date {
            marks.date = v;
        }
        Ok(Some(marks.clone()))
    }

    async fn delete_marks(&self, id: u64) -> StoreResult<bool> {
        Ok(self.lock()?.marks.remove(&id).is_some())
    }
}
