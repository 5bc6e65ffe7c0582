use serde_json::json;

use super::{actor, db_conn, required_str};
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};
use crate::perm;
use crate::store::{self, SchoolSettings};

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match store::settings(conn) {
        Ok(s) => match serde_json::to_value(&s) {
            Ok(v) => ok(&req.id, json!({ "settings": v })),
            Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
        },
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let actor = match actor(conn, req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    if !perm::can_manage_branding(actor.role) {
        return err(&req.id, "not_allowed", "not permitted to manage settings", None);
    }
    let school_name = match required_str(req, "schoolName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let address = match required_str(req, "address") {
        Ok(v) => v,
        Err(e) => return e,
    };
    // Empty string clears the logo.
    let logo_url = req
        .params
        .get("logoUrl")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let settings = SchoolSettings {
        school_name,
        address,
        logo_url,
    };
    match store::update_settings(conn, &actor.id, &settings) {
        Ok(()) => match serde_json::to_value(&settings) {
            Ok(v) => ok(&req.id, json!({ "settings": v })),
            Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
        },
        Err(e) => store_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_get(state, req)),
        "settings.update" => Some(handle_update(state, req)),
        _ => None,
    }
}
