use serde::{Deserialize, Serialize};

use super::audit::Audit;
use super::department::Department;
use super::UNASSIGNED_ID;

/// Properties an employee page may be sorted by, as `(json name, column)`.
pub const SORTABLE: &[(&str, &str)] = &[
    ("id", "id"),
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("departmentId", "department_id"),
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
];

/// An employee row. `department_id` is the only stored side of the
/// department relationship.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub department_id: Option<i64>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Employee {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            id: UNASSIGNED_ID,
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            department_id: None,
            audit: Audit::now(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id != UNASSIGNED_ID
    }

    pub fn rename(&mut self, first_name: &str, last_name: &str) {
        self.first_name = first_name.to_owned();
        self.last_name = last_name.to_owned();
    }

    /// Points this employee at `department`. The department's employee list
    /// picks the change up the next time it is read.
    pub fn attach(&mut self, department: &Department) {
        self.department_id = Some(department.id);
    }

    pub fn detach(&mut self) {
        self.department_id = None;
    }

    pub fn belongs_to(&self, department_id: i64) -> bool {
        self.department_id == Some(department_id)
    }
}
