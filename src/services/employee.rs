use log::{debug, info};

use super::department::DepartmentService;
use crate::db::{Session, Store};
use crate::errors::{employee_not_found, AppError};
use crate::models::employee::Employee;
use crate::models::page::{Page, PageRequest};

/// Owns the employee side of the relationship, which is the only side that
/// is stored. Department references are always resolved through
/// [`DepartmentService`] before they are written.
#[derive(Clone)]
pub struct EmployeeService<S: Store> {
    store: S,
    departments: DepartmentService<S>,
}

impl<S: Store> EmployeeService<S> {
    pub fn new(store: S) -> Self {
        Self {
            departments: DepartmentService::new(store.clone()),
            store,
        }
    }

    pub async fn list_all(&self) -> Result<Vec<Employee>, AppError> {
        let mut tx = self.store.begin().await?;
        let employees = tx.employee_find_all().await?;
        tx.commit().await?;

        debug!("listed {} employees", employees.len());
        Ok(employees)
    }

    pub async fn list_page(&self, request: &PageRequest) -> Result<Page<Employee>, AppError> {
        let mut tx = self.store.begin().await?;
        let (employees, total) = tx.employee_find_page(request).await?;
        tx.commit().await?;

        debug!(
            "listed employee page {} ({} of {})",
            request.page,
            employees.len(),
            total
        );
        Ok(Page::new(employees, request, total))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Employee, AppError> {
        let mut tx = self.store.begin().await?;
        let employee = resolve(&mut tx, id).await?;
        tx.commit().await?;
        Ok(employee)
    }

    pub async fn create(
        &self,
        department_id: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<Employee, AppError> {
        let mut tx = self.store.begin().await?;
        let department = self.departments.resolve(&mut tx, department_id).await?;

        let mut employee = Employee::new(first_name, last_name);
        employee.attach(&department);
        let employee = tx.employee_save(&employee).await?;
        tx.commit().await?;

        info!(
            "created employee {} in department {}",
            employee.id, department.id
        );
        Ok(employee)
    }

    /// Replaces the names and department of an employee. A missing employee
    /// is reported before the department is even looked up.
    pub async fn update(
        &self,
        id: i64,
        first_name: &str,
        last_name: &str,
        department_id: i64,
    ) -> Result<Employee, AppError> {
        let mut tx = self.store.begin().await?;
        let mut employee = resolve(&mut tx, id).await?;
        let department = self.departments.resolve(&mut tx, department_id).await?;

        employee.rename(first_name, last_name);
        employee.attach(&department);
        let employee = tx.employee_save(&employee).await?;
        tx.commit().await?;

        info!("updated employee {} (department {})", employee.id, department.id);
        Ok(employee)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;
        resolve(&mut tx, id).await?;
        tx.employee_delete(id).await?;
        tx.commit().await?;

        info!("deleted employee {}", id);
        Ok(())
    }
}

async fn resolve<T: Session>(tx: &mut T, id: i64) -> Result<Employee, AppError> {
    tx.employee_find_by_id(id)
        .await?
        .ok_or_else(|| employee_not_found(id))
}
