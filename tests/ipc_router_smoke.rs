mod common;

use common::{expect_err, expect_ok, request, select_workspace, spawn_sidecar, temp_dir};
use serde_json::json;

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("schoolportal-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(&mut stdin, &mut reader, "1", "health", json!({}));
    let result = expect_ok(&resp, "health");
    assert!(result.get("version").and_then(|v| v.as_str()).is_some());
    assert!(result.get("workspacePath").map(|v| v.is_null()).unwrap_or(false));

    // Data methods refuse to run before a workspace is selected.
    let resp = request(&mut stdin, &mut reader, "2", "students.list", json!({}));
    expect_err(&resp, "no_workspace", "students.list");

    select_workspace(&mut stdin, &mut reader, &workspace);

    // First run seeds the portal.
    let resp = request(&mut stdin, &mut reader, "3", "students.list", json!({}));
    let result = expect_ok(&resp, "students.list");
    let students = result["students"].as_array().expect("students array");
    assert_eq!(students.len(), 30);
    assert_eq!(students[0]["regNumber"], "CDSS/25/1000");
    assert_eq!(students[0]["gender"], "M");
    assert_eq!(students[1]["gender"], "F");

    let resp = request(
        &mut stdin,
        &mut reader,
        "4",
        "auth.login",
        json!({ "email": "commandant@cdssdaura.edu.ng", "password": "123456" }),
    );
    let result = expect_ok(&resp, "auth.login");
    assert_eq!(result["user"]["role"], "COMMANDANT");
    assert!(result["user"].get("passwordHash").is_none());

    let resp = request(&mut stdin, &mut reader, "5", "auth.currentUser", json!({}));
    let result = expect_ok(&resp, "auth.currentUser");
    assert_eq!(result["user"]["id"], "u1");

    let resp = request(&mut stdin, &mut reader, "6", "users.list", json!({}));
    let result = expect_ok(&resp, "users.list");
    assert_eq!(result["users"].as_array().expect("users").len(), 7);

    let resp = request(&mut stdin, &mut reader, "7", "session.get", json!({}));
    let result = expect_ok(&resp, "session.get");
    assert_eq!(result["session"]["year"], "2025/2026");
    assert_eq!(result["session"]["currentTerm"], 1);
    assert_eq!(result["session"]["isTermOpen"], true);

    let resp = request(&mut stdin, &mut reader, "8", "settings.get", json!({}));
    let result = expect_ok(&resp, "settings.get");
    assert_eq!(
        result["settings"]["schoolName"],
        "COMMAND DAY SECONDARY SCHOOL DAURA"
    );

    let resp = request(&mut stdin, &mut reader, "9", "scores.list", json!({}));
    let result = expect_ok(&resp, "scores.list");
    assert_eq!(result["scores"].as_array().expect("scores").len(), 0);

    let resp = request(&mut stdin, &mut reader, "10", "logs.list", json!({}));
    let result = expect_ok(&resp, "logs.list");
    assert_eq!(result["logs"].as_array().expect("logs").len(), 0);

    let resp = request(&mut stdin, &mut reader, "11", "no.such.method", json!({}));
    expect_err(&resp, "not_implemented", "no.such.method");

    let resp = request(&mut stdin, &mut reader, "12", "auth.logout", json!({}));
    expect_ok(&resp, "auth.logout");
    let resp = request(&mut stdin, &mut reader, "13", "auth.currentUser", json!({}));
    let result = expect_ok(&resp, "auth.currentUser");
    assert!(result["user"].is_null());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn login_failures_and_registration_approval() {
    let workspace = temp_dir("schoolportal-auth");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "auth.login",
        json!({ "email": "nobody@cdssdaura.edu.ng", "password": "123456" }),
    );
    let error = expect_err(&resp, "invalid_credentials", "auth.login unknown email");
    assert_eq!(error["message"], "Invalid credentials");

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "auth.login",
        json!({ "email": "commandant@cdssdaura.edu.ng", "password": "wrong" }),
    );
    expect_err(&resp, "invalid_credentials", "auth.login wrong password");

    // Email matching ignores case.
    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "auth.login",
        json!({ "email": "COMMANDANT@CDSSDAURA.EDU.NG", "password": "123456" }),
    );
    expect_ok(&resp, "auth.login case-insensitive");

    let resp = request(
        &mut stdin,
        &mut reader,
        "4",
        "auth.register",
        json!({
            "email": "newteacher@cdssdaura.edu.ng",
            "fullName": "New Teacher",
            "role": "SUBJECT_TEACHER",
            "password": "secret99"
        }),
    );
    let result = expect_ok(&resp, "auth.register");
    let new_id = result["user"]["id"].as_str().expect("new user id").to_string();
    assert_eq!(result["user"]["isActive"], false);

    let resp = request(
        &mut stdin,
        &mut reader,
        "5",
        "auth.register",
        json!({
            "email": "NewTeacher@cdssdaura.edu.ng",
            "fullName": "Duplicate",
            "role": "SUBJECT_TEACHER",
            "password": "x"
        }),
    );
    let error = expect_err(&resp, "email_exists", "auth.register duplicate");
    assert_eq!(error["message"], "Email already exists");

    let resp = request(
        &mut stdin,
        &mut reader,
        "6",
        "auth.login",
        json!({ "email": "newteacher@cdssdaura.edu.ng", "password": "secret99" }),
    );
    let error = expect_err(&resp, "pending_approval", "auth.login pending");
    assert_eq!(error["message"], "Account pending approval.");

    // VP Academics can approve a teaching-role account.
    let resp = request(
        &mut stdin,
        &mut reader,
        "7",
        "users.setStatus",
        json!({ "actorId": "u6", "userId": new_id, "isActive": true }),
    );
    expect_ok(&resp, "users.setStatus approve");

    let resp = request(
        &mut stdin,
        &mut reader,
        "8",
        "auth.login",
        json!({ "email": "newteacher@cdssdaura.edu.ng", "password": "secret99" }),
    );
    expect_ok(&resp, "auth.login after approval");

    // VP Academics holds no destructive authority.
    let resp = request(
        &mut stdin,
        &mut reader,
        "9",
        "users.setStatus",
        json!({ "actorId": "u6", "userId": new_id, "isActive": false }),
    );
    expect_err(&resp, "not_allowed", "users.setStatus deactivate as VP");

    let resp = request(
        &mut stdin,
        &mut reader,
        "10",
        "users.delete",
        json!({ "actorId": "u2", "userId": new_id }),
    );
    expect_ok(&resp, "users.delete");

    // A reset request never discloses whether the account exists.
    let resp = request(
        &mut stdin,
        &mut reader,
        "11",
        "auth.requestPasswordReset",
        json!({ "email": "ghost@cdssdaura.edu.ng" }),
    );
    let result = expect_ok(&resp, "auth.requestPasswordReset");
    assert_eq!(result["accepted"], true);

    drop(stdin);
    let _ = child.wait();
}
