use std::collections::HashMap;

use log::{debug, info, warn};

use crate::db::{self, Session, Store};
use crate::errors::{department_name_taken, department_not_found, AppError};
use crate::models::department::{Department, DepartmentWithEmployees};
use crate::models::employee::Employee;
use crate::models::page::{Page, PageRequest};

/// Owns the department side of the department/employee relationship.
///
/// A department never stores its employees. Every value returned from here
/// carries the employee list as read from the employee table in the same
/// session, so the two sides cannot disagree.
#[derive(Clone)]
pub struct DepartmentService<S: Store> {
    store: S,
}

impl<S: Store> DepartmentService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn list_all(&self) -> Result<Vec<DepartmentWithEmployees>, AppError> {
        let mut tx = self.store.begin().await?;
        let departments = tx.department_find_all().await?;
        let departments = with_employees(&mut tx, departments).await?;
        tx.commit().await?;

        debug!("listed {} departments", departments.len());
        Ok(departments)
    }

    pub async fn list_page(
        &self,
        request: &PageRequest,
    ) -> Result<Page<DepartmentWithEmployees>, AppError> {
        let mut tx = self.store.begin().await?;
        let (departments, total) = tx.department_find_page(request).await?;
        let departments = with_employees(&mut tx, departments).await?;
        tx.commit().await?;

        debug!(
            "listed department page {} ({} of {})",
            request.page,
            departments.len(),
            total
        );
        Ok(Page::new(departments, request, total))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<DepartmentWithEmployees, AppError> {
        let mut tx = self.store.begin().await?;
        let department = self.resolve(&mut tx, id).await?;
        let employees = tx.employee_find_by_departments(&[id]).await?;
        tx.commit().await?;

        Ok(DepartmentWithEmployees::new(department, employees))
    }

    /// Looks a department up inside an open session, failing with
    /// `NotFound` when it does not exist. The employee side resolves its
    /// department references through here.
    pub(crate) async fn resolve(&self, tx: &mut S::Tx, id: i64) -> Result<Department, AppError> {
        tx.department_find_by_id(id)
            .await?
            .ok_or_else(|| department_not_found(id))
    }

    pub async fn create(&self, name: &str) -> Result<DepartmentWithEmployees, AppError> {
        let mut tx = self.store.begin().await?;
        let department = tx
            .department_save(&Department::new(name))
            .await
            .map_err(department_name_taken(name))?;
        tx.commit().await?;

        let created = DepartmentWithEmployees::new(department, Vec::new());
        info!("created department {} ({})", created.id(), created.department.name);
        Ok(created)
    }

    pub async fn update(&self, id: i64, name: &str) -> Result<DepartmentWithEmployees, AppError> {
        let mut tx = self.store.begin().await?;
        let mut department = self.resolve(&mut tx, id).await?;
        department.rename(name);
        let department = tx
            .department_save(&department)
            .await
            .map_err(department_name_taken(name))?;
        let employees = tx.employee_find_by_departments(&[id]).await?;
        tx.commit().await?;

        info!("renamed department {} to {}", department.id, department.name);
        Ok(DepartmentWithEmployees::new(department, employees))
    }

    /// Deletes a department after detaching every employee that points at
    /// it. Both steps commit together or not at all.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;
        if !tx.department_exists(id).await? {
            return Err(department_not_found(id));
        }

        match detach_and_remove(&mut tx, id).await {
            Ok(detached) => {
                tx.commit().await?;
                info!("deleted department {}, detached {} employees", id, detached);
                Ok(())
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("rollback of department {} delete failed: {}", id, rollback_err);
                }
                Err(err.into())
            }
        }
    }
}

async fn detach_and_remove<T: Session>(tx: &mut T, id: i64) -> Result<u64, db::Error> {
    let detached = tx.employee_detach_all_by_department(id).await?;
    tx.department_delete(id).await?;
    Ok(detached)
}

async fn with_employees<T: Session>(
    tx: &mut T,
    departments: Vec<Department>,
) -> Result<Vec<DepartmentWithEmployees>, db::Error> {
    let ids: Vec<i64> = departments.iter().map(|d| d.id).collect();
    let mut by_department: HashMap<i64, Vec<Employee>> = HashMap::new();
    for employee in tx.employee_find_by_departments(&ids).await? {
        if let Some(department_id) = employee.department_id {
            by_department.entry(department_id).or_default().push(employee);
        }
    }

    Ok(departments
        .into_iter()
        .map(|department| {
            let employees = by_department.remove(&department.id).unwrap_or_default();
            DepartmentWithEmployees::new(department, employees)
        })
        .collect())
}
