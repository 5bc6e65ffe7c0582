mod common;

use common::{expect_err, expect_ok, request, select_workspace, spawn_sidecar, temp_dir};
use serde_json::json;

#[test]
fn roster_growth_and_duplicate_protection() {
    let workspace = temp_dir("schoolportal-roster");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    // Admin officer manages the roster.
    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "students.bulkCreate",
        json!({
            "actorId": "u2",
            "names": ["Abubakar Sani", "  Musa Ibrahim  ", "Fatima Bello"],
            "startRegNumber": "CDSS/25/1050",
            "currentClass": "JSS2 A"
        }),
    );
    let result = expect_ok(&resp, "students.bulkCreate");
    assert_eq!(result["count"], 3);
    assert_eq!(result["nextRegNumber"], "CDSS/25/1053");

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "students.list",
        json!({ "class": "JSS2 A" }),
    );
    let result = expect_ok(&resp, "students.list");
    let students = result["students"].as_array().expect("students");
    assert_eq!(students.len(), 3);
    assert_eq!(students[0]["fullName"], "ABUBAKAR SANI");
    assert_eq!(students[1]["fullName"], "MUSA IBRAHIM");
    assert_eq!(students[1]["regNumber"], "CDSS/25/1051");
    assert_eq!(students[2]["gender"], "M");

    // Re-running the same batch collides on the first number; nothing more
    // is added.
    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "students.bulkCreate",
        json!({
            "actorId": "u2",
            "names": ["Someone Else"],
            "startRegNumber": "CDSS/25/1050",
            "currentClass": "JSS2 A"
        }),
    );
    let error = expect_err(&resp, "duplicate_reg_number", "students.bulkCreate duplicate");
    assert_eq!(
        error["message"],
        "Registration Number CDSS/25/1050 already exists."
    );
    assert_eq!(error["details"]["added"], 0);

    let resp = request(
        &mut stdin,
        &mut reader,
        "4",
        "students.bulkCreate",
        json!({
            "actorId": "u2",
            "names": ["Anyone"],
            "startRegNumber": "CDSS/25/10XY",
            "currentClass": "JSS2 A"
        }),
    );
    expect_err(&resp, "bad_params", "students.bulkCreate malformed start");

    let resp = request(
        &mut stdin,
        &mut reader,
        "5",
        "students.create",
        json!({
            "actorId": "u2",
            "fullName": "Single Add",
            "regNumber": "CDSS/25/1053",
            "currentClass": "JSS2 A",
            "gender": "F"
        }),
    );
    let result = expect_ok(&resp, "students.create");
    assert_eq!(result["student"]["fullName"], "SINGLE ADD");
    assert_eq!(result["nextRegNumber"], "CDSS/25/1054");

    let resp = request(
        &mut stdin,
        &mut reader,
        "6",
        "students.create",
        json!({
            "actorId": "u2",
            "fullName": "Clash",
            "regNumber": "CDSS/25/1053",
            "currentClass": "JSS2 A",
            "gender": "M"
        }),
    );
    expect_err(&resp, "duplicate_reg_number", "students.create duplicate");

    // Subject teachers hold no roster authority.
    let resp = request(
        &mut stdin,
        &mut reader,
        "7",
        "students.delete",
        json!({ "actorId": "u4", "studentId": "s1" }),
    );
    expect_err(&resp, "not_allowed", "students.delete as teacher");

    let resp = request(
        &mut stdin,
        &mut reader,
        "8",
        "students.delete",
        json!({ "actorId": "u2", "studentId": "s30" }),
    );
    expect_ok(&resp, "students.delete");

    let resp = request(
        &mut stdin,
        &mut reader,
        "9",
        "students.list",
        json!({ "class": "JSS1 A" }),
    );
    let result = expect_ok(&resp, "students.list after delete");
    assert_eq!(result["students"].as_array().expect("students").len(), 29);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn report_cards_render_per_class() {
    let workspace = temp_dir("schoolportal-reports");
    let out_dir = workspace.join("out");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    // A couple of Mathematics scores so the model carries real figures.
    for (i, (student, ca1, ca2, exam)) in
        [("s1", 10, 12, 50), ("s2", 5, 5, 30)].iter().enumerate()
    {
        let resp = request(
            &mut stdin,
            &mut reader,
            &format!("seed{i}"),
            "scores.save",
            json!({ "actorId": "u4", "record": {
                "studentId": student, "subject": "Mathematics",
                "term": 1, "session": "2025/2026",
                "ca1": ca1, "ca2": ca2, "exam": exam
            }}),
        );
        expect_ok(&resp, "scores.save seed");
    }

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "reports.cardModel",
        json!({ "actorId": "u3", "studentId": "s1" }),
    );
    let result = expect_ok(&resp, "reports.cardModel");
    let model = &result["model"];
    assert_eq!(model["noInClass"], 30);
    assert_eq!(model["position"], 1);
    assert_eq!(model["overallTotal"], 72);
    assert_eq!(model["subjectsTaken"], 1);
    assert_eq!(model["average"], "72.0");
    let rows = model["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 14);
    let maths = rows
        .iter()
        .find(|r| r["subject"] == "Mathematics")
        .expect("maths row");
    assert_eq!(maths["score"]["grade"], "A");
    assert_eq!(maths["score"]["remark"], "EXCELLENT");
    assert_eq!(maths["high"], 72);
    assert_eq!(maths["low"], 40);
    let blank = rows
        .iter()
        .find(|r| r["subject"] == "Basic Science")
        .expect("blank row");
    assert!(blank.get("score").is_none() || blank["score"].is_null());

    // Form masters print their own class only.
    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "reports.generate",
        json!({
            "actorId": "u5",
            "class": "SSS1 A",
            "outDir": out_dir.to_string_lossy()
        }),
    );
    expect_err(&resp, "not_allowed", "reports.generate wrong class");

    // Subject teachers cannot print at all.
    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "reports.generate",
        json!({
            "actorId": "u4",
            "class": "JSS1 A",
            "outDir": out_dir.to_string_lossy()
        }),
    );
    expect_err(&resp, "not_allowed", "reports.generate as teacher");

    let resp = request(
        &mut stdin,
        &mut reader,
        "4",
        "reports.generate",
        json!({
            "actorId": "u5",
            "class": "JSS1 A",
            "studentId": "s1",
            "outDir": out_dir.to_string_lossy()
        }),
    );
    let result = expect_ok(&resp, "reports.generate single");
    assert_eq!(result["pages"], 1);
    let path = result["path"].as_str().expect("path");
    assert!(path.ends_with("CDSS_Report_CDSS-25-1000.pdf"));
    let bytes = std::fs::read(path).expect("read pdf");
    assert!(bytes.starts_with(b"%PDF"));

    let resp = request(
        &mut stdin,
        &mut reader,
        "5",
        "reports.generate",
        json!({
            "actorId": "u1",
            "class": "JSS1 A",
            "outDir": out_dir.to_string_lossy()
        }),
    );
    let result = expect_ok(&resp, "reports.generate batch");
    assert_eq!(result["pages"], 30);
    let path = result["path"].as_str().expect("path");
    assert!(path.ends_with("Report_Cards_JSS1_A.pdf"));
    assert!(std::fs::read(path).expect("read pdf").starts_with(b"%PDF"));

    // An empty class has nothing to print.
    let resp = request(
        &mut stdin,
        &mut reader,
        "6",
        "reports.generate",
        json!({
            "actorId": "u1",
            "class": "SSS3 C",
            "outDir": out_dir.to_string_lossy()
        }),
    );
    let error = expect_err(&resp, "not_found", "reports.generate empty class");
    assert_eq!(error["message"], "No students found in this class to print.");

    drop(stdin);
    let _ = child.wait();
}
