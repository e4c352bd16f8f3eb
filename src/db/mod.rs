//! Persistence contract used by the department and employee services.
//!
//! A [`Store`] hands out [`Session`]s. A session is one unit of work: its
//! writes become visible together on [`Session::commit`] and disappear on
//! [`Session::rollback`] or when the session is dropped uncommitted.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::department::Department;
use crate::models::employee::Employee;
use crate::models::page::PageRequest;

pub use memory::MemoryStore;
pub use postgres::PgStore;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
    #[error("row not found")]
    RowNotFound,
    #[error("sqlx error :: {0}")]
    Sqlx(sqlx::Error),
    #[error("migration error :: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("store error :: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return Error::RowNotFound;
        }
        if let Some(db_err) = err.as_database_error() {
            let constraint = db_err
                .constraint()
                .unwrap_or_else(|| db_err.message())
                .to_owned();
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => return Error::UniqueViolation(constraint),
                Some(FOREIGN_KEY_VIOLATION) => return Error::ForeignKeyViolation(constraint),
                _ => {}
            }
        }
        Error::Sqlx(err)
    }
}

#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Tx: Session;

    async fn begin(&self) -> Result<Self::Tx, Error>;
}

#[async_trait]
pub trait Session: Send {
    async fn department_find_all(&mut self) -> Result<Vec<Department>, Error>;

    /// Returns the requested page and the total number of departments.
    async fn department_find_page(
        &mut self,
        request: &PageRequest,
    ) -> Result<(Vec<Department>, i64), Error>;

    async fn department_find_by_id(&mut self, id: i64) -> Result<Option<Department>, Error>;

    async fn department_exists(&mut self, id: i64) -> Result<bool, Error>;

    /// Inserts an unassigned department or updates a persisted one, and
    /// returns the row as stored.
    async fn department_save(&mut self, department: &Department) -> Result<Department, Error>;

    async fn department_delete(&mut self, id: i64) -> Result<(), Error>;

    async fn employee_find_all(&mut self) -> Result<Vec<Employee>, Error>;

    async fn employee_find_page(
        &mut self,
        request: &PageRequest,
    ) -> Result<(Vec<Employee>, i64), Error>;

    async fn employee_find_by_id(&mut self, id: i64) -> Result<Option<Employee>, Error>;

    /// Employees whose department reference is one of `department_ids`,
    /// ordered by id.
    async fn employee_find_by_departments(
        &mut self,
        department_ids: &[i64],
    ) -> Result<Vec<Employee>, Error>;

    async fn employee_save(&mut self, employee: &Employee) -> Result<Employee, Error>;

    async fn employee_delete(&mut self, id: i64) -> Result<(), Error>;

    /// Clears the department reference of every employee pointing at
    /// `department_id` and returns how many were changed.
    async fn employee_detach_all_by_department(&mut self, department_id: i64)
        -> Result<u64, Error>;

    async fn commit(self) -> Result<(), Error>;

    async fn rollback(self) -> Result<(), Error>;
}
