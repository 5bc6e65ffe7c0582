use serde_json::json;

use super::{db_conn, required_str, user_json};
use crate::auth;
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};
use crate::perm::Role;

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match auth::login(conn, &email, &password) {
        Ok(user) => {
            tracing::info!(user = %user.email, role = user.role.as_str(), "login");
            ok(&req.id, json!({ "user": user_json(&user) }))
        }
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let full_name = match required_str(req, "fullName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match required_str(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let role: Role = match req
        .params
        .get("role")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
    {
        Ok(Some(r)) => r,
        Ok(None) => return err(&req.id, "bad_params", "missing role", None),
        Err(_) => return err(&req.id, "bad_params", "unknown role", None),
    };

    match auth::register(conn, &email, &full_name, role, &password) {
        Ok(user) => {
            tracing::info!(user = %user.email, "registered, pending approval");
            ok(&req.id, json!({ "user": user_json(&user) }))
        }
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_request_password_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match auth::request_password_reset(conn, &email) {
        Ok(()) => ok(&req.id, json!({ "accepted": true })),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_current_user(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match auth::current_user(conn) {
        Ok(user) => ok(
            &req.id,
            json!({ "user": user.as_ref().map(user_json) }),
        ),
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match auth::logout(conn) {
        Ok(()) => ok(&req.id, json!({})),
        Err(e) => store_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.register" => Some(handle_register(state, req)),
        "auth.requestPasswordReset" => Some(handle_request_password_reset(state, req)),
        "auth.currentUser" => Some(handle_current_user(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        _ => None,
    }
}
