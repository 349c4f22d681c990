use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_campusd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn campusd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn create_institute(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    name: &str,
) -> String {
    let created = request_ok(
        stdin,
        reader,
        id,
        "institutes.create",
        json!({ "name": name }),
    );
    created
        .get("instituteId")
        .and_then(|v| v.as_str())
        .expect("instituteId")
        .to_string()
}

#[test]
fn institute_list_carries_dependent_counts() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(&mut stdin, &mut reader, "open", "workspace.open", json!({}));

    let sunrise = create_institute(&mut stdin, &mut reader, "i1", "Sunrise Public School");
    let greenfield = create_institute(&mut stdin, &mut reader, "i2", "Greenfield Academy");

    for (i, name) in ["Rajesh Kumar", "Priya Sharma"].iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{}", i),
            "students.create",
            json!({ "instituteId": sunrise, "name": name, "className": "10th A" }),
        );
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "s9",
        "students.create",
        json!({ "instituteId": greenfield, "name": "Kavya Nair", "className": "8th A" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "b1",
        "branches.create",
        json!({ "instituteId": sunrise, "name": "Main Campus" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "st1",
        "staff.create",
        json!({ "instituteId": sunrise, "name": "Meena Iyer", "role": "Teacher" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "t1",
        "tickets.create",
        json!({ "instituteId": sunrise, "subject": "Fee receipt not generated" }),
    );

    let listed = request_ok(&mut stdin, &mut reader, "list", "institutes.list", json!({}));
    let rows = listed
        .get("institutes")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    assert_eq!(rows.len(), 2);

    let sunrise_row = rows
        .iter()
        .find(|r| r.get("id").and_then(|v| v.as_str()) == Some(sunrise.as_str()))
        .expect("sunrise row");
    assert_eq!(
        sunrise_row.get("studentCount").and_then(|v| v.as_u64()),
        Some(2)
    );
    assert_eq!(
        sunrise_row.get("staffCount").and_then(|v| v.as_u64()),
        Some(1)
    );
    assert_eq!(
        sunrise_row.get("branchCount").and_then(|v| v.as_u64()),
        Some(1)
    );
    assert_eq!(
        sunrise_row.get("openTickets").and_then(|v| v.as_u64()),
        Some(1)
    );

    let greenfield_row = rows
        .iter()
        .find(|r| r.get("id").and_then(|v| v.as_str()) == Some(greenfield.as_str()))
        .expect("greenfield row");
    assert_eq!(
        greenfield_row.get("studentCount").and_then(|v| v.as_u64()),
        Some(1)
    );
}

#[test]
fn deleting_an_institute_cascades_without_touching_other_tenants() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(&mut stdin, &mut reader, "open", "workspace.open", json!({}));

    let sunrise = create_institute(&mut stdin, &mut reader, "i1", "Sunrise Public School");
    let greenfield = create_institute(&mut stdin, &mut reader, "i2", "Greenfield Academy");

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "s1",
        "students.create",
        json!({ "instituteId": sunrise, "name": "Rajesh Kumar", "className": "10th A" }),
    );
    let student_id = student
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "p1",
        "payments.record",
        json!({ "instituteId": sunrise, "studentId": student_id, "amount": "₹15,000" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "t1",
        "tickets.create",
        json!({ "instituteId": sunrise, "subject": "Fee receipt not generated" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "s2",
        "students.create",
        json!({ "instituteId": greenfield, "name": "Kavya Nair", "className": "8th A" }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "del",
        "institutes.delete",
        json!({ "instituteId": sunrise }),
    );

    // All sunrise records are gone.
    let students = request_ok(
        &mut stdin,
        &mut reader,
        "l1",
        "students.list",
        json!({ "instituteId": sunrise }),
    );
    assert_eq!(
        students
            .get("students")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(0)
    );
    let payments = request_ok(
        &mut stdin,
        &mut reader,
        "l2",
        "payments.summary",
        json!({ "instituteId": sunrise }),
    );
    assert_eq!(payments.get("total").and_then(|v| v.as_f64()), Some(0.0));
    let tickets = request_ok(
        &mut stdin,
        &mut reader,
        "l3",
        "tickets.summary",
        json!({ "instituteId": sunrise }),
    );
    assert_eq!(tickets.get("total").and_then(|v| v.as_f64()), Some(0.0));

    // The other tenant is untouched.
    let other = request_ok(
        &mut stdin,
        &mut reader,
        "l4",
        "students.list",
        json!({ "instituteId": greenfield }),
    );
    assert_eq!(
        other
            .get("students")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1)
    );
}

#[test]
fn update_patches_institute_fields() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(&mut stdin, &mut reader, "open", "workspace.open", json!({}));

    let id = create_institute(&mut stdin, &mut reader, "i1", "Sunrise Public School");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "upd",
        "institutes.update",
        json!({
            "instituteId": id,
            "patch": { "city": "Jaipur", "plan": "Pro", "status": "Inactive" }
        }),
    );

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "list",
        "institutes.list",
        json!({ "filters": { "plan": "Pro" } }),
    );
    let rows = listed
        .get("institutes")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("city").and_then(|v| v.as_str()),
        Some("Jaipur")
    );
    assert_eq!(
        rows[0].get("status").and_then(|v| v.as_str()),
        Some("Inactive")
    );
}
