use serde::{Deserialize, Serialize};

use super::audit::Audit;
use super::employee::Employee;
use super::UNASSIGNED_ID;

/// Properties a department page may be sorted by, as `(json name, column)`.
pub const SORTABLE: &[(&str, &str)] = &[
    ("id", "id"),
    ("name", "name"),
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
];

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: i64,
    pub name: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Department {
    pub fn new(name: &str) -> Self {
        Self {
            id: UNASSIGNED_ID,
            name: name.to_owned(),
            audit: Audit::now(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id != UNASSIGNED_ID
    }

    /// Changes the name only; the id is never touched after creation.
    pub fn rename(&mut self, name: &str) {
        self.name = name.to_owned();
    }
}

/// A department together with the employees currently pointing at it.
///
/// The employee list is never stored on the department side. It is read
/// from the employee table every time one of these is built.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentWithEmployees {
    #[serde(flatten)]
    pub department: Department,
    pub employees: Vec<Employee>,
}

impl DepartmentWithEmployees {
    pub fn new(department: Department, employees: Vec<Employee>) -> Self {
        Self {
            department,
            employees,
        }
    }

    pub fn id(&self) -> i64 {
        self.department.id
    }
}
