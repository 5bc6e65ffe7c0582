use serde_json::json;

use super::{actor, db_conn};
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};
use crate::perm;
use crate::store;

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let actor = match actor(conn, req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    if !perm::can_view_logs(actor.role) {
        return err(&req.id, "not_allowed", "not permitted to view logs", None);
    }
    match store::logs(conn) {
        Ok(entries) => match serde_json::to_value(&entries) {
            Ok(v) => ok(&req.id, json!({ "logs": v })),
            Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
        },
        Err(e) => store_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "logs.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
