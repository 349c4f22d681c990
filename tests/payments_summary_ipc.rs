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

fn request(
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
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        id,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn display_formatted_amounts_sum_into_collected_total() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(&mut stdin, &mut reader, "open", "workspace.open", json!({}));

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "inst",
        "institutes.create",
        json!({ "name": "Sunrise Public School" }),
    );
    let institute_id = created
        .get("instituteId")
        .and_then(|v| v.as_str())
        .expect("instituteId")
        .to_string();

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "stu",
        "students.create",
        json!({ "instituteId": institute_id, "name": "Rajesh Kumar", "className": "10th A" }),
    );
    let student_id = student
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();

    // Display-formatted amounts, exactly as the fee screens hand them over.
    for (i, amount) in ["₹15,000", "₹22,000", "₹0"].iter().enumerate() {
        let recorded = request_ok(
            &mut stdin,
            &mut reader,
            &format!("pay{}", i),
            "payments.record",
            json!({
                "instituteId": institute_id,
                "studentId": student_id,
                "amount": amount
            }),
        );
        assert!(recorded.get("amount").and_then(|v| v.as_f64()).is_some());
    }

    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "sum",
        "payments.summary",
        json!({ "instituteId": institute_id }),
    );
    assert_eq!(
        summary.get("totalCollected").and_then(|v| v.as_f64()),
        Some(37000.0)
    );
    assert_eq!(summary.get("paidCount").and_then(|v| v.as_f64()), Some(3.0));
    assert_eq!(
        summary.get("paidRate").and_then(|v| v.as_f64()),
        Some(100.0)
    );
}

#[test]
fn rates_over_empty_collections_are_zero_not_nan() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(&mut stdin, &mut reader, "open", "workspace.open", json!({}));

    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "sum",
        "payments.summary",
        json!({}),
    );
    assert_eq!(summary.get("total").and_then(|v| v.as_f64()), Some(0.0));
    assert_eq!(summary.get("paidRate").and_then(|v| v.as_f64()), Some(0.0));
    assert_eq!(
        summary.get("totalCollected").and_then(|v| v.as_f64()),
        Some(0.0)
    );
}

#[test]
fn pending_amounts_are_kept_out_of_collected() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(&mut stdin, &mut reader, "open", "workspace.open", json!({}));

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "inst",
        "institutes.create",
        json!({ "name": "Greenfield Academy" }),
    );
    let institute_id = created
        .get("instituteId")
        .and_then(|v| v.as_str())
        .expect("instituteId")
        .to_string();
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "stu",
        "students.create",
        json!({ "instituteId": institute_id, "name": "Kavya Nair", "className": "8th A" }),
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
        json!({
            "instituteId": institute_id,
            "studentId": student_id,
            "amount": 19000,
            "status": "Paid"
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "p2",
        "payments.record",
        json!({
            "instituteId": institute_id,
            "studentId": student_id,
            "amount": "₹19,000",
            "status": "Pending"
        }),
    );

    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "sum",
        "payments.summary",
        json!({ "instituteId": institute_id }),
    );
    assert_eq!(
        summary.get("totalCollected").and_then(|v| v.as_f64()),
        Some(19000.0)
    );
    assert_eq!(
        summary.get("totalPending").and_then(|v| v.as_f64()),
        Some(19000.0)
    );
    assert_eq!(summary.get("paidRate").and_then(|v| v.as_f64()), Some(50.0));
}

#[test]
fn payment_validation_rejects_bad_dates_and_missing_amounts() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(&mut stdin, &mut reader, "open", "workspace.open", json!({}));

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "inst",
        "institutes.create",
        json!({ "name": "Sunrise Public School" }),
    );
    let institute_id = created
        .get("instituteId")
        .and_then(|v| v.as_str())
        .expect("instituteId")
        .to_string();
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "stu",
        "students.create",
        json!({ "instituteId": institute_id, "name": "Amit Verma", "className": "9th B" }),
    );
    let student_id = student
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();

    let bad_date = request(
        &mut stdin,
        &mut reader,
        "bad1",
        "payments.record",
        json!({
            "instituteId": institute_id,
            "studentId": student_id,
            "amount": 100,
            "paidOn": "2024-13-40"
        }),
    );
    assert_eq!(
        bad_date
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("bad_params")
    );

    let no_amount = request(
        &mut stdin,
        &mut reader,
        "bad2",
        "payments.record",
        json!({ "instituteId": institute_id, "studentId": student_id }),
    );
    assert_eq!(
        no_amount
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("bad_params")
    );

    // A malformed display amount is not an error; it falls back to zero.
    let zeroed = request_ok(
        &mut stdin,
        &mut reader,
        "p3",
        "payments.record",
        json!({
            "instituteId": institute_id,
            "studentId": student_id,
            "amount": "N/A"
        }),
    );
    assert_eq!(zeroed.get("amount").and_then(|v| v.as_f64()), Some(0.0));
}
