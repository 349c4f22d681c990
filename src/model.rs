use crate::filter::{FieldAccessor, FieldLookup};
use crate::store::StoredRecord;
use serde::{Deserialize, Serialize};

/// Filter keys are the names the console's dropdowns use ("class", "status"),
/// not necessarily the struct field names. A key a record type does not map
/// is treated as non-matching by the filter pass.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institute {
    pub id: String,
    pub name: String,
    pub code: String,
    pub city: String,
    pub status: String,
    pub plan: String,
}

impl StoredRecord for Institute {
    fn id(&self) -> &str {
        &self.id
    }
}

impl FieldLookup for Institute {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "city" => Some(&self.city),
            "status" => Some(&self.status),
            "plan" => Some(&self.plan),
            _ => None,
        }
    }
}

pub const INSTITUTE_SEARCH_FIELDS: &[FieldAccessor<Institute>] =
    &[|i| &i.name, |i| &i.code, |i| &i.city];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: String,
    pub institute_id: String,
    pub name: String,
    pub city: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl StoredRecord for Branch {
    fn id(&self) -> &str {
        &self.id
    }
}

impl FieldLookup for Branch {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "instituteId" => Some(&self.institute_id),
            "city" => Some(&self.city),
            _ => None,
        }
    }
}

pub const BRANCH_SEARCH_FIELDS: &[FieldAccessor<Branch>] = &[|b| &b.name, |b| &b.city];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub institute_id: String,
    pub name: String,
    pub student_no: String,
    pub class_name: String,
    pub section: String,
    pub status: String,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub admitted_on: String,
    pub fee_total: f64,
    pub fee_paid: f64,
}

impl StoredRecord for Student {
    fn id(&self) -> &str {
        &self.id
    }
}

impl FieldLookup for Student {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "instituteId" => Some(&self.institute_id),
            "class" => Some(&self.class_name),
            "section" => Some(&self.section),
            "status" => Some(&self.status),
            _ => None,
        }
    }
}

pub const STUDENT_SEARCH_FIELDS: &[FieldAccessor<Student>] = &[
    |s| &s.name,
    |s| &s.student_no,
    |s| &s.class_name,
    |s| s.guardian_name.as_deref().unwrap_or(""),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub id: String,
    pub institute_id: String,
    pub name: String,
    pub role: String,
    pub department: String,
    pub status: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub joined_on: String,
}

impl StoredRecord for StaffMember {
    fn id(&self) -> &str {
        &self.id
    }
}

impl FieldLookup for StaffMember {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "instituteId" => Some(&self.institute_id),
            "role" => Some(&self.role),
            "department" => Some(&self.department),
            "status" => Some(&self.status),
            _ => None,
        }
    }
}

pub const STAFF_SEARCH_FIELDS: &[FieldAccessor<StaffMember>] =
    &[|s| &s.name, |s| &s.role, |s| &s.department];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub institute_id: String,
    pub student_id: String,
    pub student_name: String,
    pub receipt_no: String,
    pub amount: f64,
    pub method: String,
    pub status: String,
    pub paid_on: String,
}

impl StoredRecord for Payment {
    fn id(&self) -> &str {
        &self.id
    }
}

impl FieldLookup for Payment {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "instituteId" => Some(&self.institute_id),
            "studentId" => Some(&self.student_id),
            "method" => Some(&self.method),
            "status" => Some(&self.status),
            _ => None,
        }
    }
}

pub const PAYMENT_SEARCH_FIELDS: &[FieldAccessor<Payment>] =
    &[|p| &p.student_name, |p| &p.receipt_no];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub institute_id: String,
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub category: String,
    pub raised_by: String,
    pub opened_on: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl StoredRecord for Ticket {
    fn id(&self) -> &str {
        &self.id
    }
}

impl FieldLookup for Ticket {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "instituteId" => Some(&self.institute_id),
            "status" => Some(&self.status),
            "priority" => Some(&self.priority),
            "category" => Some(&self.category),
            _ => None,
        }
    }
}

pub const TICKET_SEARCH_FIELDS: &[FieldAccessor<Ticket>] = &[
    |t| &t.subject,
    |t| t.description.as_deref().unwrap_or(""),
    |t| &t.raised_by,
];

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> Student {
        Student {
            id: "s1".into(),
            institute_id: "i1".into(),
            name: "Rajesh Kumar".into(),
            student_no: "STU-001".into(),
            class_name: "10th A".into(),
            section: "A".into(),
            status: "Active".into(),
            guardian_name: Some("Suresh Kumar".into()),
            phone: None,
            email: None,
            admitted_on: "2023-04-01".into(),
            fee_total: 45000.0,
            fee_paid: 30000.0,
        }
    }

    #[test]
    fn student_filter_keys_map_to_console_dropdowns() {
        let s = student();
        assert_eq!(s.field("class"), Some("10th A"));
        assert_eq!(s.field("status"), Some("Active"));
        assert_eq!(s.field("instituteId"), Some("i1"));
        // Struct field name is not a filter key.
        assert_eq!(s.field("className"), None);
        assert_eq!(s.field("feeTotal"), None);
    }

    #[test]
    fn student_search_fields_cover_guardian_name() {
        let s = student();
        let values: Vec<&str> = STUDENT_SEARCH_FIELDS.iter().map(|f| f(&s)).collect();
        assert!(values.contains(&"Suresh Kumar"));
        assert!(values.contains(&"STU-001"));
    }

    #[test]
    fn wire_format_is_camel_case() {
        let v = serde_json::to_value(student()).expect("serialize student");
        assert!(v.get("className").is_some());
        assert!(v.get("feeTotal").is_some());
        assert!(v.get("class_name").is_none());
    }
}
