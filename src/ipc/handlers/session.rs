use serde_json::json;

use super::{actor, db_conn, required_str};
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};
use crate::perm;
use crate::store::{self, AcademicSession};

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match store::session(conn) {
        Ok(s) => match serde_json::to_value(&s) {
            Ok(v) => ok(&req.id, json!({ "session": v })),
            Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
        },
        Err(e) => store_err(&req.id, e),
    }
}

/// The only path that opens or closes a term, and it also moves the active
/// year/term.
fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let actor = match actor(conn, req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    if !perm::can_manage_session(actor.role) {
        return err(&req.id, "not_allowed", "not permitted to manage the session", None);
    }
    let year = match required_str(req, "year") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let current_term = match req.params.get("currentTerm").and_then(|v| v.as_u64()) {
        Some(t @ 1..=3) => t as u8,
        _ => return err(&req.id, "bad_params", "currentTerm must be 1, 2 or 3", None),
    };
    let Some(is_term_open) = req.params.get("isTermOpen").and_then(|v| v.as_bool()) else {
        return err(&req.id, "bad_params", "missing isTermOpen", None);
    };

    let session = AcademicSession {
        year,
        current_term,
        is_term_open,
    };
    match store::update_session(conn, &actor.id, &session) {
        Ok(()) => match serde_json::to_value(&session) {
            Ok(v) => ok(&req.id, json!({ "session": v })),
            Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
        },
        Err(e) => store_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.get" => Some(handle_get(state, req)),
        "session.update" => Some(handle_update(state, req)),
        _ => None,
    }
}
