use serde_json::json;

use super::{actor, db_conn, required_str, user_json};
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};
use crate::perm;
use crate::store::{self, AssignmentUpdate};

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let actor = match actor(conn, req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    if !perm::can_manage_users(actor.role) {
        return err(&req.id, "not_allowed", "not permitted to manage users", None);
    }
    match store::users(conn) {
        Ok(users) => ok(
            &req.id,
            json!({ "users": users.iter().map(user_json).collect::<Vec<_>>() }),
        ),
        Err(e) => store_err(&req.id, e),
    }
}

/// Activation follows the approval matrix; deactivation is destructive and
/// takes the stricter predicate.
fn handle_set_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let actor = match actor(conn, req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(is_active) = req.params.get("isActive").and_then(|v| v.as_bool()) else {
        return err(&req.id, "bad_params", "missing isActive", None);
    };

    let target = match store::find_user(conn, &user_id) {
        Ok(Some(u)) => u,
        Ok(None) => return err(&req.id, "not_found", "user not found", None),
        Err(e) => return store_err(&req.id, e),
    };
    let allowed = if is_active {
        perm::can_approve_target(actor.role, target.role)
    } else {
        perm::can_delete_users(actor.role)
    };
    if !allowed {
        return err(&req.id, "not_allowed", "not permitted to change this account", None);
    }

    match store::update_user_status(conn, &actor.id, &user_id, is_active) {
        Ok(updated) => ok(&req.id, json!({ "user": user_json(&updated) })),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_set_assignments(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let actor = match actor(conn, req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    if !perm::can_assign_subjects(actor.role) {
        return err(&req.id, "not_allowed", "not permitted to assign subjects", None);
    }
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let update: AssignmentUpdate = match serde_json::from_value(req.params.clone()) {
        Ok(u) => u,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let target = match store::find_user(conn, &user_id) {
        Ok(Some(u)) => u,
        Ok(None) => return err(&req.id, "not_found", "user not found", None),
        Err(e) => return store_err(&req.id, e),
    };
    if !perm::is_teaching_role(target.role) {
        return err(&req.id, "not_allowed", "role holds no assignments", None);
    }

    match store::update_user_assignments(conn, &actor.id, &user_id, &update) {
        Ok(updated) => ok(&req.id, json!({ "user": user_json(&updated) })),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let actor = match actor(conn, req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    if !perm::can_delete_users(actor.role) {
        return err(&req.id, "not_allowed", "not permitted to delete users", None);
    }
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store::delete_user(conn, &actor.id, &user_id) {
        Ok(()) => ok(&req.id, json!({ "deleted": user_id })),
        Err(e) => store_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.list" => Some(handle_list(state, req)),
        "users.setStatus" => Some(handle_set_status(state, req)),
        "users.setAssignments" => Some(handle_set_assignments(state, req)),
        "users.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
