use std::path::PathBuf;

use serde_json::json;

use super::{actor, db_conn, required_str};
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};
use crate::perm::{self, Role};
use crate::report::{self, ClassContext, ReportCardModel};
use crate::store::{self, AcademicSession, SchoolSettings, ScoreRecord, Student, User};

/// Supervisors print any class; a form master prints their own class only.
fn may_generate(actor: &User, class_name: &str) -> bool {
    perm::is_supervisor(actor.role)
        || (actor.role == Role::FormMaster && actor.assigned_class.as_deref() == Some(class_name))
}

struct ReportData {
    class_name: String,
    class_students: Vec<Student>,
    scores: Vec<ScoreRecord>,
    session: AcademicSession,
    settings: SchoolSettings,
}

fn gather(
    conn: &rusqlite::Connection,
    req: &Request,
    class_name: &str,
) -> Result<ReportData, serde_json::Value> {
    let class_students =
        store::students(conn, Some(class_name)).map_err(|e| store_err(&req.id, e))?;
    let scores = store::scores(conn).map_err(|e| store_err(&req.id, e))?;
    let session = store::session(conn).map_err(|e| store_err(&req.id, e))?;
    let settings = store::settings(conn).map_err(|e| store_err(&req.id, e))?;
    Ok(ReportData {
        class_name: class_name.to_string(),
        class_students,
        scores,
        session,
        settings,
    })
}

fn build_models(data: &ReportData, targets: &[Student]) -> Vec<ReportCardModel> {
    let class_scores = report::filter_class_scores(&data.scores, &data.session, &data.class_students);
    let ctx = ClassContext::new(&data.class_name, &data.class_students, &class_scores);
    targets
        .iter()
        .map(|s| ctx.model_for(s, &data.session))
        .collect()
}

fn handle_card_model(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let actor = match actor(conn, req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student = match store::students(conn, None) {
        Ok(students) => students.into_iter().find(|s| s.id == student_id),
        Err(e) => return store_err(&req.id, e),
    };
    let Some(student) = student else {
        return err(&req.id, "not_found", "student not found", None);
    };
    if !may_generate(&actor, &student.current_class) {
        return err(&req.id, "not_allowed", "not permitted to print this class", None);
    }

    let data = match gather(conn, req, &student.current_class) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let models = build_models(&data, std::slice::from_ref(&student));
    match serde_json::to_value(&models[0]) {
        Ok(v) => ok(&req.id, json!({ "model": v })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_generate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let actor = match actor(conn, req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    let class_name = match required_str(req, "class") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let out_dir = match required_str(req, "outDir") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    if !may_generate(&actor, &class_name) {
        return err(&req.id, "not_allowed", "not permitted to print this class", None);
    }

    let data = match gather(conn, req, &class_name) {
        Ok(d) => d,
        Err(e) => return e,
    };

    let (targets, filename) = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(student_id) => {
            let Some(student) = data
                .class_students
                .iter()
                .find(|s| s.id == student_id)
                .cloned()
            else {
                return err(&req.id, "not_found", "student not found in this class", None);
            };
            let filename = report::single_filename(&student.reg_number);
            (vec![student], filename)
        }
        None => {
            if data.class_students.is_empty() {
                return err(
                    &req.id,
                    "not_found",
                    "No students found in this class to print.",
                    None,
                );
            }
            (
                data.class_students.clone(),
                report::batch_filename(&class_name),
            )
        }
    };

    let models = build_models(&data, &targets);
    match report::generate(&models, &data.settings, &out_dir, &filename) {
        Ok(path) => {
            tracing::info!(pages = models.len(), path = %path.display(), "report written");
            ok(
                &req.id,
                json!({
                    "path": path.to_string_lossy(),
                    "pages": models.len(),
                }),
            )
        }
        Err(e) => store_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.cardModel" => Some(handle_card_model(state, req)),
        "reports.generate" => Some(handle_generate(state, req)),
        _ => None,
    }
}
