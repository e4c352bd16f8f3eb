//! In-process store. Sessions run one at a time against a private copy of
//! the tables, which replaces the shared tables on commit.
//!
//! In test builds the store also keeps a journal of the operations each
//! session performed and can be told to fail a chosen operation.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::{Error, Session, Store};
use crate::models::department::Department;
use crate::models::employee::Employee;
use crate::models::page::{Direction, PageRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    DepartmentFindAll,
    DepartmentFindPage,
    DepartmentFindById,
    DepartmentExists,
    DepartmentSave,
    DepartmentDelete,
    EmployeeFindAll,
    EmployeeFindPage,
    EmployeeFindById,
    EmployeeFindByDepartments,
    EmployeeSave,
    EmployeeDelete,
    EmployeeDetachAll,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    departments: BTreeMap<i64, Department>,
    employees: BTreeMap<i64, Employee>,
    last_department_id: i64,
    last_employee_id: i64,
}

#[derive(Debug, Default)]
struct Journal {
    #[cfg(test)]
    ops: Vec<Op>,
    fail_on: Option<Op>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<AsyncMutex<Tables>>,
    journal: Arc<Mutex<Journal>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next occurrence of `op` fail with a backend error.
    #[cfg(test)]
    pub fn fail_on(&self, op: Op) {
        self.journal.lock().fail_on = Some(op);
    }

    /// Operations performed so far, in order.
    #[cfg(test)]
    pub fn operations(&self) -> Vec<Op> {
        self.journal.lock().ops.clone()
    }

    #[cfg(test)]
    pub fn clear_operations(&self) {
        self.journal.lock().ops.clear();
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemorySession;

    async fn begin(&self) -> Result<MemorySession, Error> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemorySession {
            guard,
            working,
            journal: self.journal.clone(),
        })
    }
}

pub struct MemorySession {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    journal: Arc<Mutex<Journal>>,
}

impl MemorySession {
    fn record(&self, op: Op) -> Result<(), Error> {
        let mut journal = self.journal.lock();
        #[cfg(test)]
        journal.ops.push(op);
        if journal.fail_on == Some(op) {
            journal.fail_on = None;
            return Err(Error::Backend(format!("injected failure on {:?}", op)));
        }
        Ok(())
    }
}

fn department_cmp(a: &Department, b: &Department, column: &str) -> Ordering {
    match column {
        "name" => a.name.cmp(&b.name),
        "created_at" => a.audit.created_at.cmp(&b.audit.created_at),
        "updated_at" => a.audit.updated_at.cmp(&b.audit.updated_at),
        _ => a.id.cmp(&b.id),
    }
}

fn employee_cmp(a: &Employee, b: &Employee, column: &str) -> Ordering {
    match column {
        "first_name" => a.first_name.cmp(&b.first_name),
        "last_name" => a.last_name.cmp(&b.last_name),
        // NULLS LAST on ascending order, as Postgres does
        "department_id" => match (a.department_id, b.department_id) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        "created_at" => a.audit.created_at.cmp(&b.audit.created_at),
        "updated_at" => a.audit.updated_at.cmp(&b.audit.updated_at),
        _ => a.id.cmp(&b.id),
    }
}

fn paginate<T: Clone>(
    rows: impl Iterator<Item = T>,
    request: &PageRequest,
    cmp: fn(&T, &T, &str) -> Ordering,
) -> (Vec<T>, i64) {
    let mut rows: Vec<T> = rows.collect();
    rows.sort_by(|a, b| {
        for sort in &request.sort {
            let ordering = match sort.direction {
                Direction::Asc => cmp(a, b, sort.column),
                Direction::Desc => cmp(a, b, sort.column).reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        cmp(a, b, "id")
    });
    let total = rows.len() as i64;
    let page = rows
        .into_iter()
        .skip(request.offset() as usize)
        .take(request.limit() as usize)
        .collect();
    (page, total)
}

#[async_trait]
impl Session for MemorySession {
    async fn department_find_all(&mut self) -> Result<Vec<Department>, Error> {
        self.record(Op::DepartmentFindAll)?;
        Ok(self.working.departments.values().cloned().collect())
    }

    async fn department_find_page(
        &mut self,
        request: &PageRequest,
    ) -> Result<(Vec<Department>, i64), Error> {
        self.record(Op::DepartmentFindPage)?;
        Ok(paginate(
            self.working.departments.values().cloned(),
            request,
            department_cmp,
        ))
    }

    async fn department_find_by_id(&mut self, id: i64) -> Result<Option<Department>, Error> {
        self.record(Op::DepartmentFindById)?;
        Ok(self.working.departments.get(&id).cloned())
    }

    async fn department_exists(&mut self, id: i64) -> Result<bool, Error> {
        self.record(Op::DepartmentExists)?;
        Ok(self.working.departments.contains_key(&id))
    }

    async fn department_save(&mut self, department: &Department) -> Result<Department, Error> {
        self.record(Op::DepartmentSave)?;
        let tables = &mut self.working;

        let name_taken = tables
            .departments
            .values()
            .any(|other| other.id != department.id && other.name == department.name);
        if name_taken {
            return Err(Error::UniqueViolation("department_name_key".to_owned()));
        }

        let mut saved = department.clone();
        if department.is_persisted() {
            if !tables.departments.contains_key(&department.id) {
                return Err(Error::RowNotFound);
            }
            saved.audit.touch();
        } else {
            tables.last_department_id += 1;
            saved.id = tables.last_department_id;
        }
        tables.departments.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn department_delete(&mut self, id: i64) -> Result<(), Error> {
        self.record(Op::DepartmentDelete)?;
        let tables = &mut self.working;

        if tables.employees.values().any(|e| e.belongs_to(id)) {
            return Err(Error::ForeignKeyViolation(
                "employee_department_id_fkey".to_owned(),
            ));
        }
        tables
            .departments
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::RowNotFound)
    }

    async fn employee_find_all(&mut self) -> Result<Vec<Employee>, Error> {
        self.record(Op::EmployeeFindAll)?;
        Ok(self.working.employees.values().cloned().collect())
    }

    async fn employee_find_page(
        &mut self,
        request: &PageRequest,
    ) -> Result<(Vec<Employee>, i64), Error> {
        self.record(Op::EmployeeFindPage)?;
        Ok(paginate(
            self.working.employees.values().cloned(),
            request,
            employee_cmp,
        ))
    }

    async fn employee_find_by_id(&mut self, id: i64) -> Result<Option<Employee>, Error> {
        self.record(Op::EmployeeFindById)?;
        Ok(self.working.employees.get(&id).cloned())
    }

    async fn employee_find_by_departments(
        &mut self,
        department_ids: &[i64],
    ) -> Result<Vec<Employee>, Error> {
        self.record(Op::EmployeeFindByDepartments)?;
        Ok(self
            .working
            .employees
            .values()
            .filter(|e| department_ids.iter().any(|id| e.belongs_to(*id)))
            .cloned()
            .collect())
    }

    async fn employee_save(&mut self, employee: &Employee) -> Result<Employee, Error> {
        self.record(Op::EmployeeSave)?;
        let tables = &mut self.working;

        if let Some(department_id) = employee.department_id {
            if !tables.departments.contains_key(&department_id) {
                return Err(Error::ForeignKeyViolation(
                    "employee_department_id_fkey".to_owned(),
                ));
            }
        }

        let mut saved = employee.clone();
        if employee.is_persisted() {
            if !tables.employees.contains_key(&employee.id) {
                return Err(Error::RowNotFound);
            }
            saved.audit.touch();
        } else {
            tables.last_employee_id += 1;
            saved.id = tables.last_employee_id;
        }
        tables.employees.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn employee_delete(&mut self, id: i64) -> Result<(), Error> {
        self.record(Op::EmployeeDelete)?;
        self.working
            .employees
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::RowNotFound)
    }

    async fn employee_detach_all_by_department(
        &mut self,
        department_id: i64,
    ) -> Result<u64, Error> {
        self.record(Op::EmployeeDetachAll)?;
        let mut detached = 0;
        for employee in self.working.employees.values_mut() {
            if employee.belongs_to(department_id) {
                employee.detach();
                employee.audit.touch();
                detached += 1;
            }
        }
        Ok(detached)
    }

    async fn commit(self) -> Result<(), Error> {
        self.record(Op::Commit)?;
        let MemorySession {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        Ok(())
    }
}
