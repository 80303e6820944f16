use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    model::timetable::{SlotAssignment, TimetableEntry, TimetablePatch, Weekday},
    service::roster::{find_class, find_student, find_teacher, school_of_admin},
    store::{SchoolStore, Scope},
};

pub const UNKNOWN_SUBJECT: &str = "Unknown Subject";

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimetableRequest {
    #[serde(rename = "adminID")]
    #[schema(example = 1)]
    pub admin_id: u64,
    #[serde(default)]
    pub entries: Vec<SlotAssignment>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimetableView {
    pub id: u64,
    pub class_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub day: Weekday,
    pub period_number: i32,
    pub subject_id: u64,
    pub subject_name: String,
    pub teacher_id: Option<u64>,
}

fn validate_slot(period_number: i32) -> Result<(), ApiError> {
    if period_number < 1 {
        return Err(ApiError::validation("Period number must be at least 1"));
    }
    Ok(())
}

/// Resolves subject (and optionally class) names for a set of entries.
async fn denormalize(
    store: &dyn SchoolStore,
    entries: Vec<TimetableEntry>,
    with_class_name: bool,
) -> Result<Vec<TimetableView>, ApiError> {
    let mut subjects: HashMap<u64, Option<String>> = HashMap::new();
    let mut classes: HashMap<u64, Option<String>> = HashMap::new();

    let mut views = Vec::with_capacity(entries.len());
    for entry in entries {
        if !subjects.contains_key(&entry.subject_id) {
            let name = store.find_subject(entry.subject_id).await?.map(|s| s.sub_name);
            subjects.insert(entry.subject_id, name);
        }
        if with_class_name && !classes.contains_key(&entry.class_id) {
            let name = store.find_class(entry.class_id).await?.map(|c| c.sclass_name);
            classes.insert(entry.class_id, name);
        }

        views.push(TimetableView {
            id: entry.id,
            class_id: entry.class_id,
            class_name: classes.get(&entry.class_id).cloned().flatten(),
            day: entry.day,
            period_number: entry.period_number,
            subject_id: entry.subject_id,
            subject_name: subjects
                .get(&entry.subject_id)
                .cloned()
                .flatten()
                .unwrap_or_else(|| UNKNOWN_SUBJECT.to_string()),
            teacher_id: entry.teacher_id,
        });
    }

    views.sort_by_key(|v| (v.day, v.period_number, v.class_id));
    Ok(views)
}

/// Upserts every assignment into its slot. Within one batch the last
/// assignment for a slot wins.
pub async fn add_entries(store: &dyn SchoolStore, request: TimetableRequest) -> Result<usize, ApiError> {
    if request.entries.is_empty() {
        return Err(ApiError::validation("Entries array required"));
    }
    let (_, school) = school_of_admin(store, request.admin_id).await?;

    for entry in &request.entries {
        validate_slot(entry.period_number)?;
        let sclass = find_class(store, entry.class_id).await?;
        if sclass.school_id != school.id {
            return Err(ApiError::not_found("Class not found"));
        }
    }

    store.upsert_timetable(school.id, &request.entries).await?;
    tracing::info!(school_id = school.id, entries = request.entries.len(), "Timetable saved");
    Ok(request.entries.len())
}

pub async fn class_timetable(store: &dyn SchoolStore, class_id: u64) -> Result<Vec<TimetableView>, ApiError> {
    let entries = store.list_timetable(Scope::Class(class_id)).await?;
    denormalize(store, entries, false).await
}

/// Slots in the teacher's school whose subject that teacher currently teaches.
pub async fn teacher_timetable(store: &dyn SchoolStore, teacher_id: u64) -> Result<Vec<TimetableView>, ApiError> {
    let teacher = find_teacher(store, teacher_id).await?;

    // subject id -> its current teacher
    let mut owners: HashMap<u64, Option<u64>> = HashMap::new();
    let mut entries = Vec::new();
    for entry in store.list_timetable(Scope::School(teacher.school_id)).await? {
        if !owners.contains_key(&entry.subject_id) {
            let owner = store.find_subject(entry.subject_id).await?.and_then(|s| s.teacher_id);
            owners.insert(entry.subject_id, owner);
        }
        if owners.get(&entry.subject_id).copied().flatten() == Some(teacher.id) {
            entries.push(entry);
        }
    }
    denormalize(store, entries, true).await
}

pub async fn student_timetable(store: &dyn SchoolStore, student_id: u64) -> Result<Vec<TimetableView>, ApiError> {
    let student = find_student(store, student_id).await?;
    class_timetable(store, student.sclass_id).await
}

pub async fn find_entry(store: &dyn SchoolStore, entry_id: u64) -> Result<TimetableEntry, ApiError> {
    store
        .find_timetable_entry(entry_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Timetable entry not found"))
}

pub async fn update_entry(
    store: &dyn SchoolStore,
    entry_id: u64,
    patch: TimetablePatch,
) -> Result<TimetableEntry, ApiError> {
    if let Some(period) = patch.period_number {
        validate_slot(period)?;
    }

    store
        .update_timetable_entry(entry_id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Timetable entry not found"))
}

pub async fn delete_entry(store: &dyn SchoolStore, entry_id: u64) -> Result<(), ApiError> {
    if !store.delete_timetable_entry(entry_id).await? {
        return Err(ApiError::not_found("Timetable entry not found"));
    }
    Ok(())
}
