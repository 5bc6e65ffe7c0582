use serde_json::json;

use super::{actor, db_conn, required_str};
use crate::curriculum;
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};
use crate::perm;
use crate::store::{self, Gender, Student};

/// Splits `PREFIX/YY/NNNN` into its prefix, numeric tail, and tail width.
fn split_reg(reg: &str) -> Option<(&str, u32, usize)> {
    let (prefix, tail) = reg.rsplit_once('/')?;
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((prefix, tail.parse().ok()?, tail.len()))
}

fn format_reg(prefix: &str, n: u32, width: usize) -> String {
    format!("{prefix}/{n:0width$}")
}

fn next_reg(reg: &str) -> Option<String> {
    let (prefix, n, width) = split_reg(reg)?;
    Some(format_reg(prefix, n + 1, width))
}

fn parse_gender(req: &Request) -> Result<Gender, serde_json::Value> {
    match req.params.get("gender").and_then(|v| v.as_str()) {
        Some("M") => Ok(Gender::M),
        Some("F") => Ok(Gender::F),
        _ => Err(err(&req.id, "bad_params", "gender must be M or F", None)),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class = req.params.get("class").and_then(|v| v.as_str());
    match store::students(conn, class) {
        Ok(students) => match serde_json::to_value(&students) {
            Ok(v) => ok(&req.id, json!({ "students": v })),
            Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
        },
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let actor = match actor(conn, req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    if !perm::can_manage_students(actor.role) {
        return err(&req.id, "not_allowed", "not permitted to manage students", None);
    }
    let full_name = match required_str(req, "fullName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let reg_number = match required_str(req, "regNumber") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let current_class = match required_str(req, "currentClass") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if !curriculum::is_valid_class(&current_class) {
        return err(&req.id, "bad_params", "unknown class", None);
    }
    let gender = match parse_gender(req) {
        Ok(g) => g,
        Err(e) => return e,
    };

    let student = Student {
        id: store::new_id(),
        reg_number: reg_number.clone(),
        full_name: full_name.to_uppercase(),
        current_class,
        gender,
    };
    match store::add_student(conn, &actor.id, student.clone()) {
        Ok(()) => ok(
            &req.id,
            json!({ "student": student, "nextRegNumber": next_reg(&reg_number) }),
        ),
        Err(e) => store_err(&req.id, e),
    }
}

/// Adds names in input order with consecutive registration numbers. A
/// duplicate mid-batch stops the run; students added before it stay.
fn handle_bulk_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let actor = match actor(conn, req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    if !perm::can_manage_students(actor.role) {
        return err(&req.id, "not_allowed", "not permitted to manage students", None);
    }
    let start_reg = match required_str(req, "startRegNumber") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let current_class = match required_str(req, "currentClass") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if !curriculum::is_valid_class(&current_class) {
        return err(&req.id, "bad_params", "unknown class", None);
    }
    let Some((prefix, start, width)) = split_reg(&start_reg) else {
        return err(
            &req.id,
            "bad_params",
            "startRegNumber must end in a numeric tail (PREFIX/YY/NNNN)",
            None,
        );
    };
    let names: Vec<String> = match req.params.get("names") {
        Some(v) => match serde_json::from_value(v.clone()) {
            Ok(n) => n,
            Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
        },
        None => return err(&req.id, "bad_params", "missing names", None),
    };
    let names: Vec<&str> = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return err(&req.id, "bad_params", "names is empty", None);
    }

    let mut added = 0u32;
    for (i, name) in names.iter().enumerate() {
        let reg = format_reg(prefix, start + i as u32, width);
        let student = Student {
            id: store::new_id(),
            reg_number: reg,
            full_name: name.to_uppercase(),
            current_class: current_class.clone(),
            gender: Gender::M,
        };
        if let Err(e) = store::add_student(conn, &actor.id, student) {
            return err(&req.id, &e.code, e.message, Some(json!({ "added": added })));
        }
        added += 1;
    }

    ok(
        &req.id,
        json!({
            "count": added,
            "nextRegNumber": format_reg(prefix, start + added, width),
        }),
    )
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
    if !perm::can_manage_students(actor.role) {
        return err(&req.id, "not_allowed", "not permitted to manage students", None);
    }
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store::delete_student(conn, &actor.id, &student_id) {
        Ok(()) => ok(&req.id, json!({ "deleted": student_id })),
        Err(e) => store_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.create" => Some(handle_create(state, req)),
        "students.bulkCreate" => Some(handle_bulk_create(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reg_numbers_split_and_advance() {
        assert_eq!(split_reg("CDSS/25/1050"), Some(("CDSS/25", 1050, 4)));
        assert_eq!(next_reg("CDSS/25/1052").as_deref(), Some("CDSS/25/1053"));
        assert_eq!(next_reg("CDSS/25/0009").as_deref(), Some("CDSS/25/0010"));
        assert_eq!(split_reg("no-slash"), None);
        assert_eq!(split_reg("CDSS/25/10a0"), None);
        assert_eq!(split_reg("CDSS/25/"), None);
    }
}
