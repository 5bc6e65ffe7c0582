use chrono::Utc;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth;
use crate::db;
use crate::perm::Role;

// Fixed logical keys for the six persisted collections, plus the simulated
// session cookie.
pub const USERS_KEY: &str = "users";
pub const STUDENTS_KEY: &str = "students";
pub const SCORES_KEY: &str = "scores";
pub const SESSION_KEY: &str = "session";
pub const SETTINGS_KEY: &str = "settings";
pub const LOGS_KEY: &str = "logs";
pub const CURRENT_USER_KEY: &str = "current_user";

#[derive(Debug, Clone, Serialize)]
pub struct StoreError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl StoreError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

fn io_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::new("db_query_failed", e.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    M,
    F,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_class: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assigned_classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assigned_subjects: Vec<String>,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub reg_number: String,
    pub full_name: String,
    pub current_class: String,
    pub gender: Gender,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub id: String,
    pub student_id: String,
    pub subject: String,
    pub term: u8,
    pub session: String,
    pub ca1: u32,
    pub ca2: u32,
    pub exam: u32,
    pub teacher_id: String,
    pub updated_at: String,
}

impl ScoreRecord {
    pub fn total(&self) -> u32 {
        self.ca1 + self.ca2 + self.exam
    }
}

/// Fields a score submission carries; identity and bookkeeping fields are
/// assigned by the store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDraft {
    pub student_id: String,
    pub subject: String,
    pub term: u8,
    pub session: String,
    pub ca1: u32,
    pub ca2: u32,
    pub exam: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicSession {
    pub year: String,
    pub current_term: u8,
    pub is_term_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolSettings {
    pub school_name: String,
    pub address: String,
    pub logo_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: String,
    pub actor_id: String,
    pub actor_name: String,
    pub action: String,
    pub details: String,
}

/// Partial assignment update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentUpdate {
    pub assigned_class: Option<String>,
    pub assigned_classes: Option<Vec<String>>,
    pub assigned_subjects: Option<Vec<String>>,
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn load_list<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Vec<T>, StoreError> {
    match db::kv_get_json(conn, key).map_err(io_err)? {
        Some(v) => serde_json::from_value(v).map_err(io_err),
        None => Ok(Vec::new()),
    }
}

fn save_list<T: Serialize>(conn: &Connection, key: &str, items: &[T]) -> Result<(), StoreError> {
    let value = serde_json::to_value(items).map_err(io_err)?;
    db::kv_set_json(conn, key, &value).map_err(|e| StoreError::new("db_update_failed", e.to_string()))
}

fn load_singleton<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<T, StoreError> {
    let v = db::kv_get_json(conn, key)
        .map_err(io_err)?
        .ok_or_else(|| StoreError::new("not_initialized", format!("missing collection: {key}")))?;
    serde_json::from_value(v).map_err(io_err)
}

fn save_singleton<T: Serialize>(conn: &Connection, key: &str, item: &T) -> Result<(), StoreError> {
    let value = serde_json::to_value(item).map_err(io_err)?;
    db::kv_set_json(conn, key, &value).map_err(|e| StoreError::new("db_update_failed", e.to_string()))
}

// ---------------------------------------------------------------------------
// Seeding

fn seed_users() -> Result<Vec<User>, StoreError> {
    let seed_hash = auth::hash_password("123456")?;
    let make = |id: &str, email: &str, name: &str, role: Role| User {
        id: id.to_string(),
        email: email.to_string(),
        full_name: name.to_string(),
        role,
        is_active: true,
        assigned_class: None,
        assigned_classes: Vec::new(),
        assigned_subjects: Vec::new(),
        password_hash: seed_hash.clone(),
    };

    let mut users = vec![
        make(
            "u1",
            "commandant@cdssdaura.edu.ng",
            "Lt. Col. Commandant",
            Role::Commandant,
        ),
        make(
            "u2",
            "admin@cdssdaura.edu.ng",
            "Capt. Admin Officer",
            Role::AdminOfficer,
        ),
        make(
            "u3",
            "exam@cdssdaura.edu.ng",
            "Mr. Exam Officer",
            Role::ExamOfficer,
        ),
        make(
            "u4",
            "teacher@cdssdaura.edu.ng",
            "Mallam Teacher",
            Role::SubjectTeacher,
        ),
        make(
            "u5",
            "form@cdssdaura.edu.ng",
            "Mrs. Form Master",
            Role::FormMaster,
        ),
        make(
            "u6",
            "vpacademics@cdssdaura.edu.ng",
            "Mr. VP Academics",
            Role::VpAcademics,
        ),
        make(
            "u7",
            "vpadmin@cdssdaura.edu.ng",
            "Mrs. VP Admin",
            Role::VpAdmin,
        ),
    ];
    users[3].assigned_subjects = vec!["Mathematics".to_string()];
    users[3].assigned_classes = vec!["JSS1 A".to_string(), "SSS1 A".to_string()];
    users[4].assigned_class = Some("JSS1 A".to_string());
    Ok(users)
}

fn seed_students() -> Vec<Student> {
    (0..30)
        .map(|i| Student {
            id: format!("s{}", i + 1),
            reg_number: format!("CDSS/25/{}", 1000 + i),
            full_name: format!("Student Name {}", i + 1),
            current_class: "JSS1 A".to_string(),
            gender: if i % 2 == 0 { Gender::M } else { Gender::F },
        })
        .collect()
}

/// Seeds any missing collection on first run; existing data is left alone.
pub fn init(conn: &Connection) -> Result<(), StoreError> {
    if !db::kv_has(conn, USERS_KEY).map_err(io_err)? {
        save_list(conn, USERS_KEY, &seed_users()?)?;
    }
    if !db::kv_has(conn, STUDENTS_KEY).map_err(io_err)? {
        save_list(conn, STUDENTS_KEY, &seed_students())?;
    }
    if !db::kv_has(conn, SESSION_KEY).map_err(io_err)? {
        save_singleton(
            conn,
            SESSION_KEY,
            &AcademicSession {
                year: "2025/2026".to_string(),
                current_term: 1,
                is_term_open: true,
            },
        )?;
    }
    if !db::kv_has(conn, SETTINGS_KEY).map_err(io_err)? {
        save_singleton(
            conn,
            SETTINGS_KEY,
            &SchoolSettings {
                school_name: "COMMAND DAY SECONDARY SCHOOL DAURA".to_string(),
                address: "KATSINA STATE, NIGERIA".to_string(),
                logo_url: String::new(),
            },
        )?;
    }
    if !db::kv_has(conn, SCORES_KEY).map_err(io_err)? {
        save_list::<ScoreRecord>(conn, SCORES_KEY, &[])?;
    }
    if !db::kv_has(conn, LOGS_KEY).map_err(io_err)? {
        save_list::<AuditEntry>(conn, LOGS_KEY, &[])?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Users

pub fn users(conn: &Connection) -> Result<Vec<User>, StoreError> {
    load_list(conn, USERS_KEY)
}

pub fn save_users(conn: &Connection, users: &[User]) -> Result<(), StoreError> {
    save_list(conn, USERS_KEY, users)
}

pub fn find_user(conn: &Connection, user_id: &str) -> Result<Option<User>, StoreError> {
    Ok(users(conn)?.into_iter().find(|u| u.id == user_id))
}

pub fn update_user_status(
    conn: &Connection,
    actor_id: &str,
    user_id: &str,
    is_active: bool,
) -> Result<User, StoreError> {
    let mut all = users(conn)?;
    let Some(idx) = all.iter().position(|u| u.id == user_id) else {
        return Err(StoreError::new("not_found", "user not found"));
    };
    all[idx].is_active = is_active;
    let updated = all[idx].clone();
    save_users(conn, &all)?;
    log(
        conn,
        actor_id,
        "UPDATE_USER",
        &format!("Changed status of {} to {}", updated.email, is_active),
    )?;
    Ok(updated)
}

pub fn update_user_assignments(
    conn: &Connection,
    actor_id: &str,
    user_id: &str,
    update: &AssignmentUpdate,
) -> Result<User, StoreError> {
    let mut all = users(conn)?;
    let Some(idx) = all.iter().position(|u| u.id == user_id) else {
        return Err(StoreError::new("not_found", "user not found"));
    };
    if let Some(class) = &update.assigned_class {
        all[idx].assigned_class = if class.is_empty() {
            None
        } else {
            Some(class.clone())
        };
    }
    if let Some(classes) = &update.assigned_classes {
        all[idx].assigned_classes = classes.clone();
    }
    if let Some(subjects) = &update.assigned_subjects {
        all[idx].assigned_subjects = subjects.clone();
    }
    let updated = all[idx].clone();
    save_users(conn, &all)?;
    log(
        conn,
        actor_id,
        "UPDATE_ASSIGNMENTS",
        &format!("Updated assignments for {}", updated.email),
    )?;
    Ok(updated)
}

pub fn delete_user(conn: &Connection, actor_id: &str, user_id: &str) -> Result<(), StoreError> {
    let mut all = users(conn)?;
    let target = all.iter().find(|u| u.id == user_id).cloned();
    all.retain(|u| u.id != user_id);
    save_users(conn, &all)?;
    if let Some(target) = target {
        log(
            conn,
            actor_id,
            "DELETE_USER",
            &format!("Permanently deleted user {}", target.email),
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Students

pub fn students(conn: &Connection, class_filter: Option<&str>) -> Result<Vec<Student>, StoreError> {
    let all: Vec<Student> = load_list(conn, STUDENTS_KEY)?;
    match class_filter {
        Some(class) => Ok(all
            .into_iter()
            .filter(|s| s.current_class == class)
            .collect()),
        None => Ok(all),
    }
}

/// Registration numbers are the one uniqueness the store enforces; a
/// duplicate fails before anything is written.
pub fn add_student(conn: &Connection, actor_id: &str, student: Student) -> Result<(), StoreError> {
    let mut all = students(conn, None)?;
    if all.iter().any(|s| s.reg_number == student.reg_number) {
        return Err(StoreError::new(
            "duplicate_reg_number",
            format!(
                "Registration Number {} already exists.",
                student.reg_number
            ),
        ));
    }
    let details = format!(
        "Added student {} ({}) to {}",
        student.full_name, student.reg_number, student.current_class
    );
    all.push(student);
    save_list(conn, STUDENTS_KEY, &all)?;
    log(conn, actor_id, "ADD_STUDENT", &details)?;
    Ok(())
}

pub fn delete_student(conn: &Connection, actor_id: &str, student_id: &str) -> Result<(), StoreError> {
    let mut all = students(conn, None)?;
    let target = all.iter().find(|s| s.id == student_id).cloned();
    all.retain(|s| s.id != student_id);
    save_list(conn, STUDENTS_KEY, &all)?;
    if let Some(target) = target {
        log(
            conn,
            actor_id,
            "DELETE_STUDENT",
            &format!("Deleted student {} ({})", target.full_name, target.reg_number),
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Session and settings singletons

pub fn session(conn: &Connection) -> Result<AcademicSession, StoreError> {
    load_singleton(conn, SESSION_KEY)
}

pub fn update_session(
    conn: &Connection,
    actor_id: &str,
    session: &AcademicSession,
) -> Result<(), StoreError> {
    save_singleton(conn, SESSION_KEY, session)?;
    log(
        conn,
        actor_id,
        "UPDATE_SESSION",
        &format!(
            "Session updated: {}, Term {}, Open: {}",
            session.year, session.current_term, session.is_term_open
        ),
    )
}

pub fn settings(conn: &Connection) -> Result<SchoolSettings, StoreError> {
    load_singleton(conn, SETTINGS_KEY)
}

pub fn update_settings(
    conn: &Connection,
    actor_id: &str,
    settings: &SchoolSettings,
) -> Result<(), StoreError> {
    save_singleton(conn, SETTINGS_KEY, settings)?;
    log(conn, actor_id, "UPDATE_SETTINGS", "Updated school settings/logo")
}

// ---------------------------------------------------------------------------
// Scores

pub fn scores(conn: &Connection) -> Result<Vec<ScoreRecord>, StoreError> {
    load_list(conn, SCORES_KEY)
}

fn validate_draft(draft: &ScoreDraft) -> Result<(), StoreError> {
    if !(1..=3).contains(&draft.term) {
        return Err(StoreError::new("bad_params", "term must be 1, 2 or 3"));
    }
    if draft.ca1 > 15 || draft.ca2 > 15 {
        return Err(StoreError::new("bad_params", "CA scores must be 0-15"));
    }
    if draft.exam > 70 {
        return Err(StoreError::new("bad_params", "exam score must be 0-70"));
    }
    Ok(())
}

/// Upsert by (student, subject, term, session). A resubmission overwrites
/// every field of the existing record; there is no field-level merge.
pub fn save_score(
    conn: &Connection,
    teacher_id: &str,
    draft: &ScoreDraft,
) -> Result<ScoreRecord, StoreError> {
    let session = session(conn)?;
    if !session.is_term_open {
        return Err(StoreError::new("term_closed", "Term is currently closed."));
    }
    validate_draft(draft)?;

    let mut all = scores(conn)?;
    let existing = all.iter().position(|s| {
        s.student_id == draft.student_id
            && s.subject == draft.subject
            && s.term == draft.term
            && s.session == draft.session
    });

    let old_val = match existing {
        Some(idx) => {
            let s = &all[idx];
            format!("CA1:{}, CA2:{}, Ex:{}", s.ca1, s.ca2, s.exam)
        }
        None => "None".to_string(),
    };

    let record = ScoreRecord {
        id: existing
            .map(|idx| all[idx].id.clone())
            .unwrap_or_else(new_id),
        student_id: draft.student_id.clone(),
        subject: draft.subject.clone(),
        term: draft.term,
        session: draft.session.clone(),
        ca1: draft.ca1,
        ca2: draft.ca2,
        exam: draft.exam,
        teacher_id: teacher_id.to_string(),
        updated_at: now_iso(),
    };
    match existing {
        Some(idx) => all[idx] = record.clone(),
        None => all.push(record.clone()),
    }
    save_list(conn, SCORES_KEY, &all)?;

    let student_name = students(conn, None)?
        .into_iter()
        .find(|s| s.id == draft.student_id)
        .map(|s| s.full_name)
        .unwrap_or_else(|| "Unknown".to_string());
    log(
        conn,
        teacher_id,
        "SCORE_UPDATE",
        &format!(
            "Updated {} for {}. Old: [{}] -> New: [CA1:{}, CA2:{}, Ex:{}]",
            draft.subject, student_name, old_val, draft.ca1, draft.ca2, draft.exam
        ),
    )?;
    Ok(record)
}

// ---------------------------------------------------------------------------
// Audit log

/// Appends newest-first; the log is never pruned.
pub fn log(conn: &Connection, actor_id: &str, action: &str, details: &str) -> Result<(), StoreError> {
    let actor_name = users(conn)?
        .into_iter()
        .find(|u| u.id == actor_id)
        .map(|u| u.full_name)
        .unwrap_or_else(|| "Unknown".to_string());
    let mut entries: Vec<AuditEntry> = load_list(conn, LOGS_KEY)?;
    entries.insert(
        0,
        AuditEntry {
            id: new_id(),
            timestamp: now_iso(),
            actor_id: actor_id.to_string(),
            actor_name,
            action: action.to_string(),
            details: details.to_string(),
        },
    );
    save_list(conn, LOGS_KEY, &entries)
}

pub fn logs(conn: &Connection) -> Result<Vec<AuditEntry>, StoreError> {
    load_list(conn, LOGS_KEY)
}

// ---------------------------------------------------------------------------
// Simulated session cookie

pub fn set_current_user(conn: &Connection, user_id: &str) -> Result<(), StoreError> {
    db::kv_set_json(conn, CURRENT_USER_KEY, &json!(user_id))
        .map_err(|e| StoreError::new("db_update_failed", e.to_string()))
}

pub fn current_user_id(conn: &Connection) -> Result<Option<String>, StoreError> {
    let v = db::kv_get_json(conn, CURRENT_USER_KEY).map_err(io_err)?;
    Ok(v.and_then(|v| v.as_str().map(|s| s.to_string())))
}

pub fn clear_current_user(conn: &Connection) -> Result<(), StoreError> {
    db::kv_set_json(conn, CURRENT_USER_KEY, &serde_json::Value::Null)
        .map_err(|e| StoreError::new("db_update_failed", e.to_string()))
}
