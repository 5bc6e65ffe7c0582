use serde_json::json;

use super::{actor, db_conn};
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};
use crate::perm;
use crate::store::{self, ScoreDraft};

/// Classes the acting user may open in the score grid.
fn handle_classes(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let actor = match actor(conn, req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "classes": perm::allowed_classes(&actor) }))
}

/// Filtered read; visibility is open, edit authority is checked on save.
fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let subject = req.params.get("subject").and_then(|v| v.as_str());
    let term = req.params.get("term").and_then(|v| v.as_u64());
    let session = req.params.get("session").and_then(|v| v.as_str());
    let class = req.params.get("class").and_then(|v| v.as_str());

    let class_ids: Option<Vec<String>> = match class {
        Some(class) => match store::students(conn, Some(class)) {
            Ok(students) => Some(students.into_iter().map(|s| s.id).collect()),
            Err(e) => return store_err(&req.id, e),
        },
        None => None,
    };

    let scores = match store::scores(conn) {
        Ok(s) => s,
        Err(e) => return store_err(&req.id, e),
    };
    let filtered: Vec<_> = scores
        .into_iter()
        .filter(|s| subject.map(|v| s.subject == v).unwrap_or(true))
        .filter(|s| term.map(|v| s.term as u64 == v).unwrap_or(true))
        .filter(|s| session.map(|v| s.session == v).unwrap_or(true))
        .filter(|s| {
            class_ids
                .as_ref()
                .map(|ids| ids.contains(&s.student_id))
                .unwrap_or(true)
        })
        .collect();

    match serde_json::to_value(&filtered) {
        Ok(v) => ok(&req.id, json!({ "scores": v })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

/// Checks run in order: term gate, actor assignment, field ranges. The
/// range check lives in the store with the upsert itself.
fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let actor = match actor(conn, req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    let draft: ScoreDraft = match req.params.get("record") {
        Some(v) => match serde_json::from_value(v.clone()) {
            Ok(d) => d,
            Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
        },
        None => return err(&req.id, "bad_params", "missing record", None),
    };

    let session = match store::session(conn) {
        Ok(s) => s,
        Err(e) => return store_err(&req.id, e),
    };
    if !session.is_term_open {
        return err(&req.id, "term_closed", "Term is currently closed.", None);
    }

    let student = match store::students(conn, None) {
        Ok(students) => students.into_iter().find(|s| s.id == draft.student_id),
        Err(e) => return store_err(&req.id, e),
    };
    let Some(student) = student else {
        return err(&req.id, "not_found", "student not found", None);
    };
    if !perm::can_edit_scores(&actor, &student.current_class, &draft.subject) {
        return err(
            &req.id,
            "not_assigned",
            "not assigned to this class and subject",
            None,
        );
    }

    match store::save_score(conn, &actor.id, &draft) {
        Ok(record) => match serde_json::to_value(&record) {
            Ok(v) => ok(&req.id, json!({ "score": v })),
            Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
        },
        Err(e) => store_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "scores.classes" => Some(handle_classes(state, req)),
        "scores.list" => Some(handle_list(state, req)),
        "scores.save" => Some(handle_save(state, req)),
        _ => None,
    }
}
