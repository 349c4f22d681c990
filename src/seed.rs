use crate::currency::parse_currency;
use crate::model::{Branch, Institute, Payment, StaffMember, Student, Ticket};
use crate::store::Workspace;
use serde::Deserialize;

const DEMO_JSON: &str = include_str!("../fixtures/demo.json");

/// Payment rows in the fixture carry display-formatted amounts, the same way
/// the console's screens hand them over. They are normalized to numbers here,
/// at the boundary, before anything aggregates them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixturePayment {
    id: String,
    institute_id: String,
    student_id: String,
    student_name: String,
    receipt_no: String,
    amount: String,
    method: String,
    status: String,
    paid_on: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DemoData {
    institutes: Vec<Institute>,
    branches: Vec<Branch>,
    students: Vec<Student>,
    staff: Vec<StaffMember>,
    payments: Vec<FixturePayment>,
    tickets: Vec<Ticket>,
}

/// Builds a workspace pre-loaded with the demo dataset.
pub fn demo_workspace() -> anyhow::Result<Workspace> {
    let data: DemoData = serde_json::from_str(DEMO_JSON)?;

    let mut ws = Workspace::new();
    for row in data.institutes {
        ws.institutes.add(row);
    }
    for row in data.branches {
        ws.branches.add(row);
    }
    for row in data.students {
        ws.students.add(row);
    }
    for row in data.staff {
        ws.staff.add(row);
    }
    for row in data.payments {
        ws.payments.add(Payment {
            id: row.id,
            institute_id: row.institute_id,
            student_id: row.student_id,
            student_name: row.student_name,
            receipt_no: row.receipt_no,
            amount: parse_currency(&row.amount),
            method: row.method,
            status: row.status,
            paid_on: row.paid_on,
        });
    }
    for row in data.tickets {
        ws.tickets.add(row);
    }

    Ok(ws)
}
