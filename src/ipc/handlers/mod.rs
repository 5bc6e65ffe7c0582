pub mod auth;
pub mod core;
pub mod logs;
pub mod reports;
pub mod scores;
pub mod session;
pub mod settings;
pub mod students;
pub mod users;

use rusqlite::Connection;
use serde_json::json;

use crate::ipc::error::{err, store_err};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, User};

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {key}"), None))
}

fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// The acting user: explicit `params.actorId`, otherwise the stored login.
fn actor(conn: &Connection, req: &Request) -> Result<User, serde_json::Value> {
    let explicit = req
        .params
        .get("actorId")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let id = match explicit {
        Some(id) => Some(id),
        None => store::current_user_id(conn).map_err(|e| store_err(&req.id, e))?,
    };
    let Some(id) = id else {
        return Err(err(
            &req.id,
            "not_authenticated",
            "login first or pass actorId",
            None,
        ));
    };
    match store::find_user(conn, &id) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(err(&req.id, "not_authenticated", "unknown actor", None)),
        Err(e) => Err(store_err(&req.id, e)),
    }
}

/// Wire form of a user; the password hash never crosses the boundary.
fn user_json(u: &User) -> serde_json::Value {
    json!({
        "id": u.id,
        "email": u.email,
        "fullName": u.full_name,
        "role": u.role,
        "isActive": u.is_active,
        "assignedClass": u.assigned_class,
        "assignedClasses": u.assigned_classes,
        "assignedSubjects": u.assigned_subjects,
    })
}
